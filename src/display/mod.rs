//! Human-readable renderings for logs and debugging.
pub mod trace;

pub use trace::{format_candidates, format_path};
