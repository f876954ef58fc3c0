//! In-memory discovery store.
//!
//! Stands in for the external snapshot cache of a full discovery stack: it
//! keeps the current snapshot per logical node and hands out whole `Arc`s,
//! so a reader always observes one complete bundle. Replacement is a single
//! pointer store; there is no field-by-field mutation to tear.
use std::sync::Arc;

use async_trait::async_trait;
use scc::{HashMap, hash_map::Entry};

use crate::{
    core::snapshot::Snapshot,
    ports::snapshot_sink::{PublishError, SnapshotSink},
};

/// Node-keyed snapshot storage shared between the reload pipeline (writer)
/// and the discovery read surface (readers).
#[derive(Default)]
pub struct DiscoveryStore {
    snapshots: HashMap<String, Arc<Snapshot>>,
}

impl DiscoveryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot for a node, if one has been published.
    pub async fn snapshot(&self, node_id: &str) -> Option<Arc<Snapshot>> {
        self.snapshots
            .get_async(node_id)
            .await
            .map(|entry| entry.get().clone())
    }

    /// Number of nodes with a published snapshot.
    pub fn node_count(&self) -> usize {
        self.snapshots.len()
    }
}

#[async_trait]
impl SnapshotSink for DiscoveryStore {
    async fn set_snapshot(&self, node_id: &str, snapshot: Snapshot) -> Result<(), PublishError> {
        // The builder already validated this bundle; re-check at the store
        // boundary so no caller can publish a torn or dangling snapshot.
        if let Err(e) = snapshot.consistent() {
            return Err(PublishError::Rejected {
                node_id: node_id.to_string(),
                reason: e.to_string(),
            });
        }

        let snapshot = Arc::new(snapshot);
        match self.snapshots.entry_async(node_id.to_string()).await {
            Entry::Occupied(mut occupied) => {
                *occupied.get_mut() = snapshot;
            }
            Entry::Vacant(vacant) => {
                vacant.insert_entry(snapshot);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        config::models::DiscoveryKind,
        core::{
            resources::{
                CONNECT_TIMEOUT_SECS, ClusterResource, EndpointSetResource, LbPolicy,
                ResourceDescriptor, SocketAddress,
            },
            snapshot::SnapshotBuilder,
        },
    };

    use super::*;

    fn snapshot(version: u64) -> Snapshot {
        let descriptors = vec![
            ResourceDescriptor::Cluster(ClusterResource {
                name: "svc-a".to_string(),
                discovery_kind: DiscoveryKind::Static,
                connect_timeout_secs: CONNECT_TIMEOUT_SECS,
                lb_policy: LbPolicy::RoundRobin,
                upstream_tls: false,
                endpoint_set: "svc-a".to_string(),
            }),
            ResourceDescriptor::EndpointSet(EndpointSetResource {
                cluster: "svc-a".to_string(),
                endpoints: vec![SocketAddress {
                    address: "10.0.0.1".to_string(),
                    port: 8080,
                }],
            }),
        ];
        SnapshotBuilder::build(descriptors, version - 1).unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get_snapshot() {
        let store = DiscoveryStore::new();
        assert!(store.snapshot("node-1").await.is_none());

        store.set_snapshot("node-1", snapshot(1)).await.unwrap();
        let stored = store.snapshot("node-1").await.unwrap();
        assert_eq!(stored.version(), 1);

        store.set_snapshot("node-1", snapshot(2)).await.unwrap();
        assert_eq!(store.snapshot("node-1").await.unwrap().version(), 2);
        assert_eq!(store.node_count(), 1);
    }

    #[tokio::test]
    async fn test_nodes_are_independent() {
        let store = DiscoveryStore::new();
        store.set_snapshot("node-1", snapshot(1)).await.unwrap();
        store.set_snapshot("node-2", snapshot(5)).await.unwrap();

        assert_eq!(store.snapshot("node-1").await.unwrap().version(), 1);
        assert_eq!(store.snapshot("node-2").await.unwrap().version(), 5);
    }

    #[tokio::test]
    async fn test_inconsistent_snapshot_rejected() {
        let store = DiscoveryStore::new();

        // A cluster without its endpoint set cannot pass the store boundary.
        // The builder refuses to produce such a snapshot, so smuggle one in
        // through deserialization.
        let torn: Snapshot = serde_json::from_value(serde_json::json!({
            "version": "1",
            "listeners": [],
            "route_tables": [],
            "clusters": [{
                "name": "svc-a",
                "discovery_kind": "static",
                "connect_timeout_secs": CONNECT_TIMEOUT_SECS,
                "lb_policy": "round_robin",
                "upstream_tls": false,
                "endpoint_set": "svc-a",
            }],
            "endpoint_sets": [],
        }))
        .unwrap();

        let err = store.set_snapshot("node-1", torn).await.unwrap_err();
        assert!(matches!(err, PublishError::Rejected { .. }));
        assert!(store.snapshot("node-1").await.is_none());
    }
}
