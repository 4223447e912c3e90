//! Core engine of a complex-number circuit editor.
//!
//! Numbers hold complex values, operators relate three numbers through a
//! forward formula, and wires copy values between numbers once per tick.
//! Any chain behind a driven number can be reversed so that a free input is
//! solved from the output instead; reversed operators are evaluated by a
//! direction-only relaxation search rather than closed-form inverses.

pub mod analysis;
pub mod compute;
pub mod config;
pub mod display;
pub mod graph;
pub mod solver;
pub mod store;

pub use compute::TickReport;
pub use config::{ConfigError, EngineConfig};
pub use graph::{CircuitGraph, GraphError, GraphResult, OperatorHandle, ReversalCandidate};
pub use store::{EntityId, NumberRole, OperatorKind, OperatorMode, Position, Snapshot, Value};
