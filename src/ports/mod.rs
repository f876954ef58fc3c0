pub mod config_provider;
pub mod snapshot_sink;

pub use config_provider::{ChangeEvent, ChangeKind, ConfigProvider};
pub use snapshot_sink::{PublishError, SnapshotSink};
