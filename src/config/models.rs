//! Configuration data structures for Fulcrum.
//!
//! These types map directly to the declarative document (TOML, also JSON / YAML).
//! They are intentionally serde‑friendly and carry no behavior: the document is
//! re-parsed wholesale on every reload and never mutated incrementally.
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root of the declarative document: the full desired state of one proxy fleet.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct ProxyConfig {
    /// Document name, used for logging only.
    #[serde(default)]
    pub name: String,
    /// Network listeners to materialize on the data plane.
    #[serde(default)]
    pub listeners: Vec<ListenerSpec>,
    /// Named routing rules referenced by listeners.
    #[serde(default)]
    pub routes: Vec<RouteSpec>,
    /// Upstream clusters and their endpoints.
    #[serde(default)]
    pub clusters: Vec<ClusterSpec>,
    /// External-authorization section, consumed by the decision engine.
    #[serde(default)]
    pub authorization: Option<AuthorizationConfig>,
}

impl ProxyConfig {
    /// Create a new proxy configuration builder
    pub fn builder() -> ProxyConfigBuilder {
        ProxyConfigBuilder::default()
    }
}

/// A network listener: bind address, the routes it serves, optional TLS
/// termination material (paths are passed through, never read here).
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ListenerSpec {
    /// Unique listener name.
    pub name: String,
    /// Bind address (e.g. "0.0.0.0").
    pub address: String,
    /// Bind port.
    pub port: u16,
    /// Names of routes served by this listener. Must be non-empty.
    #[serde(default)]
    pub routes: Vec<String>,
    /// Path to PEM encoded certificate for TLS termination.
    #[serde(default)]
    pub cert_file: Option<String>,
    /// Path to PEM encoded private key for TLS termination.
    #[serde(default)]
    pub key_file: Option<String>,
}

/// A routing rule. Exactly one of `cluster_header` / `cluster` must be set:
/// the destination is either chosen by a request header or pinned to a
/// literal cluster name.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RouteSpec {
    /// Unique route name.
    pub name: String,
    /// Path prefix to match.
    pub prefix: String,
    /// Header whose value selects the destination cluster.
    #[serde(default)]
    pub cluster_header: Option<String>,
    /// Literal destination cluster name.
    #[serde(default)]
    pub cluster: Option<String>,
    /// Rewrite the host/authority header to this literal value.
    #[serde(default)]
    pub host_rewrite: Option<String>,
}

/// How the data plane resolves a cluster's endpoints. An unrecognized tag in
/// the document fails deserialization; there is no fallback kind.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DiscoveryKind {
    Static,
    StrictDns,
    LogicalDns,
}

impl std::fmt::Display for DiscoveryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiscoveryKind::Static => write!(f, "static"),
            DiscoveryKind::StrictDns => write!(f, "strict_dns"),
            DiscoveryKind::LogicalDns => write!(f, "logical_dns"),
        }
    }
}

/// An upstream cluster: resolution strategy plus its member endpoints.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ClusterSpec {
    /// Unique cluster name.
    pub name: String,
    /// Whether upstream connections use TLS.
    #[serde(default)]
    pub use_tls: bool,
    /// Endpoint resolution strategy.
    pub discovery_kind: DiscoveryKind,
    /// Member endpoints, bundled statically into the load assignment.
    #[serde(default)]
    pub endpoints: Vec<EndpointSpec>,
}

/// A single upstream endpoint, owned by exactly one cluster.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct EndpointSpec {
    pub host: String,
    pub port: u16,
}

/// External-authorization configuration: per-cluster token requirements and
/// header-rewrite directives. Swapped atomically on reload, never patched.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AuthorizationConfig {
    /// Owning document name, used for logging only.
    #[serde(default)]
    pub owner: String,
    /// Per-cluster authorization routes.
    #[serde(default)]
    pub routes: Vec<AuthzRoute>,
}

impl AuthorizationConfig {
    /// Find the authorization route for a destination cluster, if configured.
    pub fn route_for_cluster(&self, cluster: &str) -> Option<&AuthzRoute> {
        self.routes.iter().find(|r| r.cluster == cluster)
    }
}

/// One authorization rule, keyed by destination cluster.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AuthzRoute {
    /// Destination cluster this rule applies to.
    pub cluster: String,
    /// Inbound bearer token required for access (exact, case-sensitive).
    pub required_token: String,
    /// Replacement bearer token forwarded upstream. Credential translation:
    /// the inbound token never travels past the edge when this is set.
    #[serde(default)]
    pub outgoing_token: Option<String>,
    /// Authority-rewrite directive forwarded on allow.
    #[serde(default)]
    pub host_rewrite: Option<String>,
    /// Extra headers forwarded verbatim on allow. BTreeMap keeps directive
    /// order deterministic across reloads.
    #[serde(default)]
    pub additional_headers: BTreeMap<String, String>,
}

/// Builder for ProxyConfig to allow for cleaner configuration creation
#[derive(Default)]
pub struct ProxyConfigBuilder {
    name: String,
    listeners: Vec<ListenerSpec>,
    routes: Vec<RouteSpec>,
    clusters: Vec<ClusterSpec>,
    authorization: Option<AuthorizationConfig>,
}

impl ProxyConfigBuilder {
    /// Set the document name
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Add a listener
    pub fn listener(mut self, listener: ListenerSpec) -> Self {
        self.listeners.push(listener);
        self
    }

    /// Add a route
    pub fn route(mut self, route: RouteSpec) -> Self {
        self.routes.push(route);
        self
    }

    /// Add a cluster
    pub fn cluster(mut self, cluster: ClusterSpec) -> Self {
        self.clusters.push(cluster);
        self
    }

    /// Set the authorization section
    pub fn authorization(mut self, authorization: AuthorizationConfig) -> Self {
        self.authorization = Some(authorization);
        self
    }

    /// Build the final ProxyConfig
    pub fn build(self) -> ProxyConfig {
        ProxyConfig {
            name: self.name,
            listeners: self.listeners,
            routes: self.routes,
            clusters: self.clusters,
            authorization: self.authorization,
        }
    }
}
