//! Wire-ready resource descriptors served to data-plane proxies.
//!
//! These are the compiled artifacts of the pipeline: plain serde structs that
//! mirror the proxy's configuration surface (listeners, route tables,
//! clusters, endpoint sets). The compiler produces them, the snapshot builder
//! bundles them, and the discovery surface serializes them as-is.
use serde::{Deserialize, Serialize};

use crate::config::models::DiscoveryKind;

/// Fixed logical name under which the compiled route table is published.
/// Every listener's route stage points at this name.
pub const ROUTE_TABLE_NAME: &str = "fulcrum-routes";

/// Access log sink attached to every compiled listener.
pub const ACCESS_LOG_PATH: &str = "/dev/stdout";

/// Cluster name the data plane uses to reach the authorization service.
pub const AUTHZ_CLUSTER_NAME: &str = "ext-auth";

/// Upstream connect timeout stamped on every compiled cluster.
pub const CONNECT_TIMEOUT_SECS: u64 = 5;

/// A resolved socket address on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SocketAddress {
    pub address: String,
    pub port: u16,
}

/// Load-balancing policy for compiled clusters.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LbPolicy {
    RoundRobin,
}

/// A compiled upstream cluster.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ClusterResource {
    pub name: String,
    pub discovery_kind: DiscoveryKind,
    pub connect_timeout_secs: u64,
    pub lb_policy: LbPolicy,
    /// Attach an upstream TLS transport socket.
    pub upstream_tls: bool,
    /// Name of the endpoint set carrying this cluster's load assignment.
    pub endpoint_set: String,
}

/// The load assignment for one cluster: its member endpoints, bundled
/// statically from the document (no dynamic endpoint discovery).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EndpointSetResource {
    pub cluster: String,
    pub endpoints: Vec<SocketAddress>,
}

/// Where a routing rule sends matched traffic.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RouteDestination {
    /// Pinned to a literal cluster name.
    Cluster { name: String },
    /// Chosen per-request from the value of a request header.
    ClusterHeader { header: String },
}

/// One compiled routing rule.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteRule {
    pub name: String,
    pub prefix: String,
    pub destination: RouteDestination,
    #[serde(default)]
    pub host_rewrite: Option<String>,
}

/// The route table shared by all listeners, published under
/// [`ROUTE_TABLE_NAME`].
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RouteTableResource {
    pub name: String,
    pub virtual_host: String,
    pub domains: Vec<String>,
    pub rules: Vec<RouteRule>,
}

/// HTTP filter stages compiled into a listener, applied in order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FilterStage {
    /// Call out to the authorization service before routing.
    ExternalAuthorization {
        service_cluster: String,
        /// Re-evaluate route selection after the check response, so that
        /// headers appended by the authorization service can steer routing.
        clear_route_cache: bool,
    },
    /// Terminal stage handing the request to the route table.
    Router,
}

/// Downstream TLS termination material (paths only, passed through).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DownstreamTls {
    pub cert_file: String,
    pub key_file: String,
}

/// A compiled network listener.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ListenerResource {
    pub name: String,
    pub address: SocketAddress,
    /// Logical name of the route table this listener consults.
    pub route_table: String,
    pub access_log_path: String,
    pub filters: Vec<FilterStage>,
    /// Protocol upgrades the listener accepts.
    pub upgrades: Vec<String>,
    /// TLS termination; `None` means clear text.
    #[serde(default)]
    pub tls: Option<DownstreamTls>,
}

/// Tagged union over the four compiled resource kinds, each wrapping a wire
/// resource plus its logical name.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResourceDescriptor {
    Listener(ListenerResource),
    RouteTable(RouteTableResource),
    Cluster(ClusterResource),
    EndpointSet(EndpointSetResource),
}

impl ResourceDescriptor {
    /// Logical name of the wrapped resource.
    pub fn name(&self) -> &str {
        match self {
            ResourceDescriptor::Listener(l) => &l.name,
            ResourceDescriptor::RouteTable(r) => &r.name,
            ResourceDescriptor::Cluster(c) => &c.name,
            ResourceDescriptor::EndpointSet(e) => &e.cluster,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ResourceDescriptor::Listener(_) => "listener",
            ResourceDescriptor::RouteTable(_) => "route_table",
            ResourceDescriptor::Cluster(_) => "cluster",
            ResourceDescriptor::EndpointSet(_) => "endpoint_set",
        }
    }
}
