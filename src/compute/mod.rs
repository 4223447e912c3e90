//! Per-tick evaluation of wires and operators.
pub mod engine;
pub mod kernel;

pub use engine::{Engine, TickReport};
