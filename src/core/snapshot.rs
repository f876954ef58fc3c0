//! Versioned, immutable snapshots of compiled resources.
//!
//! A snapshot is the unit of publication: one atomic bundle of everything a
//! node needs. The builder enforces cross-resource referential integrity
//! before a snapshot can exist at all, so a subscriber can never observe a
//! route pointing at a cluster that is not in the same bundle.
use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::core::resources::{
    ClusterResource, EndpointSetResource, ListenerResource, ResourceDescriptor, RouteDestination,
    RouteTableResource,
};

/// Snapshot construction error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum SnapshotError {
    #[error("Duplicate {kind} resource '{name}' in descriptor set")]
    DuplicateResource { kind: String, name: String },

    #[error("Route '{route}' targets cluster '{cluster}' which is not in the snapshot")]
    DanglingClusterReference { route: String, cluster: String },

    #[error("Cluster '{cluster}' has no endpoint set in the snapshot")]
    MissingEndpointSet { cluster: String },

    #[error("Endpoint set '{cluster}' has no owning cluster in the snapshot")]
    OrphanEndpointSet { cluster: String },

    #[error("Listener '{listener}' consults route table '{table}' which is not in the snapshot")]
    MissingRouteTable { listener: String, table: String },
}

/// One atomic, versioned bundle of compiled resources for a node.
///
/// Immutable once built: reloads replace the whole value. The version is a
/// monotonically increasing integer serialized as a string on the wire,
/// wrapping to 0 only at the representable ceiling.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Snapshot {
    #[serde(with = "version_string")]
    version: u64,
    pub listeners: Vec<ListenerResource>,
    pub route_tables: Vec<RouteTableResource>,
    pub clusters: Vec<ClusterResource>,
    pub endpoint_sets: Vec<EndpointSetResource>,
}

impl Snapshot {
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Check cross-resource referential integrity.
    ///
    /// Every literal cluster destination must name a cluster in this bundle,
    /// clusters and endpoint sets must pair up one-to-one, and every listener
    /// must find its route table here.
    pub fn consistent(&self) -> Result<(), SnapshotError> {
        let cluster_names: HashSet<&str> =
            self.clusters.iter().map(|c| c.name.as_str()).collect();
        let endpoint_set_names: HashSet<&str> = self
            .endpoint_sets
            .iter()
            .map(|e| e.cluster.as_str())
            .collect();
        let route_table_names: HashSet<&str> =
            self.route_tables.iter().map(|r| r.name.as_str()).collect();

        for table in &self.route_tables {
            for rule in &table.rules {
                if let RouteDestination::Cluster { name } = &rule.destination {
                    if !cluster_names.contains(name.as_str()) {
                        return Err(SnapshotError::DanglingClusterReference {
                            route: rule.name.clone(),
                            cluster: name.clone(),
                        });
                    }
                }
            }
        }

        for cluster in &self.clusters {
            if !endpoint_set_names.contains(cluster.endpoint_set.as_str()) {
                return Err(SnapshotError::MissingEndpointSet {
                    cluster: cluster.name.clone(),
                });
            }
        }
        for endpoint_set in &self.endpoint_sets {
            if !cluster_names.contains(endpoint_set.cluster.as_str()) {
                return Err(SnapshotError::OrphanEndpointSet {
                    cluster: endpoint_set.cluster.clone(),
                });
            }
        }

        for listener in &self.listeners {
            if !route_table_names.contains(listener.route_table.as_str()) {
                return Err(SnapshotError::MissingRouteTable {
                    listener: listener.name.clone(),
                    table: listener.route_table.clone(),
                });
            }
        }

        Ok(())
    }
}

/// Assembles descriptor sets into validated snapshots.
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// Build a snapshot at `prior_version + 1` (wrapping to 0 at the
    /// ceiling) from a compiled descriptor set.
    ///
    /// Deterministic: resources are sorted by name, so the same descriptor
    /// set always yields a byte-identical snapshot modulo the version field.
    /// On any integrity violation the error is returned and no snapshot
    /// exists; the caller keeps whatever it published last.
    pub fn build(
        descriptors: Vec<ResourceDescriptor>,
        prior_version: u64,
    ) -> Result<Snapshot, SnapshotError> {
        let mut listeners = Vec::new();
        let mut route_tables = Vec::new();
        let mut clusters = Vec::new();
        let mut endpoint_sets = Vec::new();

        let mut seen: HashSet<(&'static str, String)> = HashSet::new();
        for descriptor in descriptors {
            if !seen.insert((descriptor.kind(), descriptor.name().to_string())) {
                return Err(SnapshotError::DuplicateResource {
                    kind: descriptor.kind().to_string(),
                    name: descriptor.name().to_string(),
                });
            }
            match descriptor {
                ResourceDescriptor::Listener(l) => listeners.push(l),
                ResourceDescriptor::RouteTable(r) => route_tables.push(r),
                ResourceDescriptor::Cluster(c) => clusters.push(c),
                ResourceDescriptor::EndpointSet(e) => endpoint_sets.push(e),
            }
        }

        listeners.sort_by(|a, b| a.name.cmp(&b.name));
        route_tables.sort_by(|a, b| a.name.cmp(&b.name));
        clusters.sort_by(|a, b| a.name.cmp(&b.name));
        endpoint_sets.sort_by(|a, b| a.cluster.cmp(&b.cluster));

        let snapshot = Snapshot {
            version: next_version(prior_version),
            listeners,
            route_tables,
            clusters,
            endpoint_sets,
        };
        snapshot.consistent()?;

        Ok(snapshot)
    }
}

/// Successor of a snapshot version: strictly increasing, wrapping to 0 only
/// at the representable ceiling.
pub fn next_version(prior: u64) -> u64 {
    prior.wrapping_add(1)
}

/// Serialize the version integer as a string on the wire.
mod version_string {
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(version: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&version.to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use crate::{config::models::DiscoveryKind, core::resources::*};

    use super::*;

    fn cluster_pair(name: &str) -> Vec<ResourceDescriptor> {
        vec![
            ResourceDescriptor::Cluster(ClusterResource {
                name: name.to_string(),
                discovery_kind: DiscoveryKind::Static,
                connect_timeout_secs: CONNECT_TIMEOUT_SECS,
                lb_policy: LbPolicy::RoundRobin,
                upstream_tls: false,
                endpoint_set: name.to_string(),
            }),
            ResourceDescriptor::EndpointSet(EndpointSetResource {
                cluster: name.to_string(),
                endpoints: vec![SocketAddress {
                    address: "10.0.0.1".to_string(),
                    port: 8080,
                }],
            }),
        ]
    }

    fn route_table_to(cluster: &str) -> ResourceDescriptor {
        ResourceDescriptor::RouteTable(RouteTableResource {
            name: ROUTE_TABLE_NAME.to_string(),
            virtual_host: "local_service".to_string(),
            domains: vec!["*".to_string()],
            rules: vec![RouteRule {
                name: "api".to_string(),
                prefix: "/".to_string(),
                destination: RouteDestination::Cluster {
                    name: cluster.to_string(),
                },
                host_rewrite: None,
            }],
        })
    }

    #[test]
    fn test_build_increments_version() {
        let snapshot = SnapshotBuilder::build(cluster_pair("svc-a"), 41).unwrap();
        assert_eq!(snapshot.version(), 42);
    }

    #[test]
    fn test_version_wraps_at_ceiling() {
        let snapshot = SnapshotBuilder::build(cluster_pair("svc-a"), u64::MAX).unwrap();
        assert_eq!(snapshot.version(), 0);
    }

    #[test]
    fn test_dangling_cluster_reference_rejected() {
        let mut descriptors = cluster_pair("svc-a");
        descriptors.push(route_table_to("svc-b"));

        let err = SnapshotBuilder::build(descriptors, 0).unwrap_err();
        assert!(matches!(err, SnapshotError::DanglingClusterReference { .. }));
    }

    #[test]
    fn test_duplicate_resource_names_rejected() {
        let mut descriptors = cluster_pair("svc-a");
        descriptors.extend(cluster_pair("svc-a"));

        let err = SnapshotBuilder::build(descriptors, 0).unwrap_err();
        assert!(matches!(err, SnapshotError::DuplicateResource { .. }));
    }

    #[test]
    fn test_build_is_deterministic_modulo_version() {
        let mut descriptors = cluster_pair("svc-b");
        descriptors.extend(cluster_pair("svc-a"));
        descriptors.push(route_table_to("svc-a"));

        let first = SnapshotBuilder::build(descriptors.clone(), 0).unwrap();
        let second = SnapshotBuilder::build(descriptors, 7).unwrap();

        // Same content, sorted identically; only the version differs.
        assert_eq!(first.clusters, second.clusters);
        assert_eq!(first.endpoint_sets, second.endpoint_sets);
        assert_eq!(first.route_tables, second.route_tables);
        assert_eq!(first.clusters[0].name, "svc-a");
        assert_ne!(first.version(), second.version());
    }

    #[test]
    fn test_version_serialized_as_string() {
        let snapshot = SnapshotBuilder::build(cluster_pair("svc-a"), 6).unwrap();
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["version"], serde_json::json!("7"));
    }
}
