//! Read-only inspection of a registry: structural checks, residuals and flow topology.
pub mod integrity;
pub mod telemetry;
pub mod topology;

pub use integrity::{IntegrityChecker, IntegrityError, IntegrityErrorType};
pub use telemetry::{OperatorResidual, ResidualReport};
