pub mod authz;
pub mod compiler;
pub mod processor;
pub mod resources;
pub mod snapshot;

pub use authz::{AuthzEngine, Decision};
pub use processor::Processor;
pub use snapshot::{Snapshot, SnapshotBuilder};
