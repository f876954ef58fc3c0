use async_trait::async_trait;

use crate::core::snapshot::Snapshot;

/// Publish error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum PublishError {
    #[error("Discovery store rejected snapshot for node '{node_id}': {reason}")]
    Rejected { node_id: String, reason: String },
}

/// Trait for the discovery store a validated snapshot is published to.
///
/// Publication must be atomic from a subscriber's perspective: a reader of
/// the store observes either the prior snapshot or the new one, never a torn
/// mixture. A failed publish must surface as an error, never be swallowed —
/// stale configuration is safer than signaling a publish that did not occur.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    /// Store `snapshot` as the current bundle for `node_id`.
    async fn set_snapshot(&self, node_id: &str, snapshot: Snapshot) -> Result<(), PublishError>;
}
