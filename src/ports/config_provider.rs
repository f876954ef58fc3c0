use std::path::PathBuf;

use async_trait::async_trait;
use eyre::Result;
use tokio::sync::mpsc;

use crate::config::models::ProxyConfig;

/// What happened to a watched path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Create,
    Modify,
    Remove,
}

/// One change notification from the watcher.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub path: PathBuf,
}

/// Trait for configuration providers that can load and watch for configuration changes.
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Load the current declarative document.
    async fn load_config(&self) -> Result<ProxyConfig>;

    /// Return a channel of change events for the watched document.
    /// The receiver decides whether an event warrants a reload.
    fn watch(&self) -> mpsc::Receiver<ChangeEvent>;
}
