//! The reload pipeline: document in, published snapshot out.
//!
//! A [`Processor`] owns the snapshot version counter, the last published
//! snapshot, and the publish policy. It is a single-writer structure: exactly
//! one task drives it, consuming change events serially, so reloads never run
//! concurrently with each other. Serving paths read from the discovery store
//! and the authz engine, both of which swap state atomically, and never touch
//! the processor itself.
use std::{path::PathBuf, sync::Arc, time::Duration};

use tokio::sync::mpsc;

use crate::{
    config::models::ProxyConfig,
    core::{
        authz::AuthzEngine,
        compiler::{self, CompileError},
        snapshot::{Snapshot, SnapshotBuilder, SnapshotError},
    },
    metrics as fulcrum_metrics,
    ports::{
        config_provider::{ChangeEvent, ChangeKind, ConfigProvider},
        snapshot_sink::{PublishError, SnapshotSink},
    },
};

/// Reload cycle error types. Any of these aborts the cycle; the prior
/// snapshot and authorization config stay in force.
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    #[error(transparent)]
    Compile(#[from] CompileError),

    #[error(transparent)]
    Snapshot(#[from] SnapshotError),

    #[error("Publish failed after {attempts} attempts: {source}")]
    Publish {
        attempts: u32,
        source: PublishError,
    },
}

/// How publish failures are handled: bounded retry with exponential backoff,
/// then the cycle aborts keeping last-known-good. Decided once, here, rather
/// than scattered through the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct PublishRetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for PublishRetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(100),
        }
    }
}

/// Drives compile → build → publish for one logical node.
pub struct Processor {
    node_id: String,
    sink: Arc<dyn SnapshotSink>,
    authz: Arc<AuthzEngine>,
    retry: PublishRetryPolicy,
    /// Version of the last successfully published snapshot. Starts at 0, so
    /// the first published snapshot is version 1. Deterministic on purpose.
    version: u64,
    last_snapshot: Option<Snapshot>,
}

impl Processor {
    pub fn new(node_id: impl Into<String>, sink: Arc<dyn SnapshotSink>, authz: Arc<AuthzEngine>) -> Self {
        Self {
            node_id: node_id.into(),
            sink,
            authz,
            retry: PublishRetryPolicy::default(),
            version: 0,
            last_snapshot: None,
        }
    }

    pub fn with_retry_policy(mut self, retry: PublishRetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Version of the last successfully published snapshot.
    pub fn current_version(&self) -> u64 {
        self.version
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// Run one full reload cycle for an already-parsed, validated document.
    ///
    /// On success the new version is committed and returned and the
    /// authorization engine is swapped to the document's authorization
    /// section. On any failure nothing is committed: the version does not
    /// advance and the previously published snapshot remains in force.
    pub async fn process(&mut self, config: &ProxyConfig) -> Result<u64, ProcessError> {
        let descriptors = compiler::compile(config)?;
        let snapshot = SnapshotBuilder::build(descriptors, self.version)?;
        let new_version = snapshot.version();

        self.publish(snapshot.clone()).await?;

        self.version = new_version;
        self.last_snapshot = Some(snapshot);
        fulcrum_metrics::record_snapshot_version(&self.node_id, new_version);

        if let Some(authorization) = &config.authorization {
            self.authz.reload(authorization.clone());
        }

        tracing::info!(
            node_id = %self.node_id,
            version = new_version,
            "Snapshot published"
        );
        Ok(new_version)
    }

    async fn publish(&self, snapshot: Snapshot) -> Result<(), ProcessError> {
        let mut delay = self.retry.base_delay;
        let mut last_error = None;

        for attempt in 1..=self.retry.max_attempts {
            match self.sink.set_snapshot(&self.node_id, snapshot.clone()).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        node_id = %self.node_id,
                        attempt,
                        error = %e,
                        "Publish attempt failed"
                    );
                    fulcrum_metrics::record_publish_retry(&self.node_id);
                    last_error = Some(e);
                    if attempt < self.retry.max_attempts {
                        tokio::time::sleep(delay).await;
                        delay *= 2;
                    }
                }
            }
        }

        Err(ProcessError::Publish {
            attempts: self.retry.max_attempts,
            source: last_error.expect("at least one publish attempt"),
        })
    }

    /// Consume change events serially until the channel closes.
    ///
    /// `Remove` events never trigger a reload and never clear state; events
    /// for paths other than the watched document are skipped. A failed
    /// reload of any kind logs and keeps serving last-known-good.
    pub async fn run(
        mut self,
        provider: Arc<dyn ConfigProvider>,
        mut events: mpsc::Receiver<ChangeEvent>,
        target: PathBuf,
    ) {
        tracing::info!(target = %target.display(), "Reload task started");

        while let Some(event) = events.recv().await {
            match event.kind {
                ChangeKind::Remove => {
                    tracing::debug!(path = %event.path.display(), "Ignoring remove event");
                    continue;
                }
                ChangeKind::Create | ChangeKind::Modify => {}
            }
            if event.path != target {
                tracing::debug!(path = %event.path.display(), "Skipping event for unwatched path");
                continue;
            }

            match provider.load_config().await {
                Ok(config) => match self.process(&config).await {
                    Ok(version) => {
                        fulcrum_metrics::record_reload(true);
                        tracing::info!(version, "Reload complete");
                    }
                    Err(e) => {
                        fulcrum_metrics::record_reload(false);
                        tracing::error!(
                            error = %e,
                            "Reload failed; keeping last-known-good configuration"
                        );
                    }
                },
                Err(e) => {
                    fulcrum_metrics::record_reload(false);
                    tracing::error!(
                        error = %e,
                        "Failed to load document; keeping last-known-good configuration"
                    );
                }
            }
        }

        tracing::info!("Reload task shutting down");
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use async_trait::async_trait;

    use crate::config::models::{
        ClusterSpec, DiscoveryKind, EndpointSpec, ListenerSpec, ProxyConfig, RouteSpec,
    };

    use super::*;

    struct FlakySink {
        fail_first: u32,
        calls: AtomicU32,
    }

    #[async_trait]
    impl SnapshotSink for FlakySink {
        async fn set_snapshot(&self, node_id: &str, _snapshot: Snapshot) -> Result<(), PublishError> {
            let call = self.calls.fetch_add(1, Ordering::SeqCst);
            if call < self.fail_first {
                Err(PublishError::Rejected {
                    node_id: node_id.to_string(),
                    reason: "store unavailable".to_string(),
                })
            } else {
                Ok(())
            }
        }
    }

    fn sample_config() -> ProxyConfig {
        ProxyConfig::builder()
            .listener(ListenerSpec {
                name: "ingress".to_string(),
                address: "0.0.0.0".to_string(),
                port: 10000,
                routes: vec!["api".to_string()],
                cert_file: None,
                key_file: None,
            })
            .route(RouteSpec {
                name: "api".to_string(),
                prefix: "/".to_string(),
                cluster_header: None,
                cluster: Some("svc-a".to_string()),
                host_rewrite: None,
            })
            .cluster(ClusterSpec {
                name: "svc-a".to_string(),
                use_tls: false,
                discovery_kind: DiscoveryKind::Static,
                endpoints: vec![EndpointSpec {
                    host: "10.0.0.1".to_string(),
                    port: 8080,
                }],
            })
            .build()
    }

    fn fast_retry() -> PublishRetryPolicy {
        PublishRetryPolicy {
            max_attempts: 3,
            base_delay: Duration::from_millis(1),
        }
    }

    #[tokio::test]
    async fn test_publish_retries_then_succeeds() {
        let sink = Arc::new(FlakySink {
            fail_first: 2,
            calls: AtomicU32::new(0),
        });
        let mut processor = Processor::new("node-1", sink.clone(), Arc::new(AuthzEngine::new()))
            .with_retry_policy(fast_retry());

        let version = processor.process(&sample_config()).await.unwrap();
        assert_eq!(version, 1);
        assert_eq!(sink.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhausted_retries_keep_version() {
        let sink = Arc::new(FlakySink {
            fail_first: u32::MAX,
            calls: AtomicU32::new(0),
        });
        let mut processor = Processor::new("node-1", sink, Arc::new(AuthzEngine::new()))
            .with_retry_policy(fast_retry());

        let err = processor.process(&sample_config()).await.unwrap_err();
        assert!(matches!(err, ProcessError::Publish { attempts: 3, .. }));
        assert_eq!(processor.current_version(), 0);
        assert!(processor.last_snapshot().is_none());
    }

    #[tokio::test]
    async fn test_versions_strictly_increase() {
        let sink = Arc::new(FlakySink {
            fail_first: 0,
            calls: AtomicU32::new(0),
        });
        let mut processor = Processor::new("node-1", sink, Arc::new(AuthzEngine::new()));

        let config = sample_config();
        let mut versions = Vec::new();
        for _ in 0..5 {
            versions.push(processor.process(&config).await.unwrap());
        }
        assert_eq!(versions, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_invalid_config_does_not_advance_version() {
        let sink = Arc::new(FlakySink {
            fail_first: 0,
            calls: AtomicU32::new(0),
        });
        let mut processor = Processor::new("node-1", sink, Arc::new(AuthzEngine::new()));

        let config = sample_config();
        processor.process(&config).await.unwrap();

        // Point the route at a cluster that is not in the descriptor set.
        let mut broken = config.clone();
        broken.routes[0].cluster = Some("ghost".to_string());
        let err = processor.process(&broken).await.unwrap_err();
        assert!(matches!(err, ProcessError::Snapshot(_)));
        assert_eq!(processor.current_version(), 1);

        // A subsequent good reload picks up where the last good one left off.
        assert_eq!(processor.process(&config).await.unwrap(), 2);
    }
}
