//! The circuit graph: commands, path tracing and the reversal transform.
pub mod circuit;
pub mod error;
pub mod reversal;
pub mod trace;

pub use circuit::{CircuitGraph, OperatorHandle, PendingReversal};
pub use error::{GraphError, GraphResult};
pub use trace::ReversalCandidate;
