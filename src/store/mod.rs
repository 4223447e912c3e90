//! Entity storage: values, node types, the arena and its snapshot form.
pub mod registry;
pub mod snapshot;
pub mod types;
pub mod value;

pub use registry::{Registry, WireList};
pub use snapshot::{NumberRecord, OperatorRecord, Snapshot, WireRecord};
pub use types::*;
pub use value::Value;
