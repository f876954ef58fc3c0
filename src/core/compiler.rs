//! Resource compiler: declarative document in, wire resources out.
//!
//! `compile` is a pure transformation with no side effects, safe to retry.
//! Validation has already run by the time a document reaches this point, but
//! the compiler still refuses dangling route references rather than emitting
//! a descriptor set the snapshot builder would reject with less context.
use std::collections::HashMap;

use crate::{
    config::models::{ListenerSpec, ProxyConfig, RouteSpec},
    core::resources::{
        ACCESS_LOG_PATH, AUTHZ_CLUSTER_NAME, CONNECT_TIMEOUT_SECS, ClusterResource, DownstreamTls,
        EndpointSetResource, FilterStage, LbPolicy, ListenerResource, ROUTE_TABLE_NAME,
        ResourceDescriptor, RouteDestination, RouteRule, RouteTableResource, SocketAddress,
    },
};

/// Compilation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum CompileError {
    #[error("Listener '{listener}' references undefined route '{route}'")]
    UnknownRoute { listener: String, route: String },

    #[error("Listener '{listener}' has no routes")]
    EmptyListener { listener: String },

    #[error("Route '{route}' has no destination")]
    MissingDestination { route: String },
}

/// Compile a validated document into the full descriptor set.
///
/// Output order is deterministic for a given document: clusters (each
/// followed by its endpoint set) in document order, then the shared route
/// table, then listeners in document order.
pub fn compile(config: &ProxyConfig) -> Result<Vec<ResourceDescriptor>, CompileError> {
    let routes_by_name: HashMap<&str, &RouteSpec> =
        config.routes.iter().map(|r| (r.name.as_str(), r)).collect();

    let mut descriptors = Vec::new();

    for cluster in &config.clusters {
        descriptors.push(ResourceDescriptor::Cluster(ClusterResource {
            name: cluster.name.clone(),
            discovery_kind: cluster.discovery_kind,
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            lb_policy: LbPolicy::RoundRobin,
            upstream_tls: cluster.use_tls,
            endpoint_set: cluster.name.clone(),
        }));
        descriptors.push(ResourceDescriptor::EndpointSet(EndpointSetResource {
            cluster: cluster.name.clone(),
            endpoints: cluster
                .endpoints
                .iter()
                .map(|e| SocketAddress {
                    address: e.host.clone(),
                    port: e.port,
                })
                .collect(),
        }));
    }

    if !config.routes.is_empty() {
        descriptors.push(ResourceDescriptor::RouteTable(compile_route_table(
            &config.routes,
        )?));
    }

    for listener in &config.listeners {
        descriptors.push(ResourceDescriptor::Listener(compile_listener(
            listener,
            &routes_by_name,
        )?));
    }

    Ok(descriptors)
}

/// Build the shared route table from every defined route, in document order.
fn compile_route_table(routes: &[RouteSpec]) -> Result<RouteTableResource, CompileError> {
    let mut rules = Vec::with_capacity(routes.len());

    for route in routes {
        let destination = match (&route.cluster_header, &route.cluster) {
            (Some(header), _) => RouteDestination::ClusterHeader {
                header: header.clone(),
            },
            (None, Some(cluster)) => RouteDestination::Cluster {
                name: cluster.clone(),
            },
            (None, None) => {
                return Err(CompileError::MissingDestination {
                    route: route.name.clone(),
                });
            }
        };

        rules.push(RouteRule {
            name: route.name.clone(),
            prefix: route.prefix.clone(),
            destination,
            host_rewrite: route.host_rewrite.clone(),
        });
    }

    Ok(RouteTableResource {
        name: ROUTE_TABLE_NAME.to_string(),
        virtual_host: "local_service".to_string(),
        domains: vec!["*".to_string()],
        rules,
    })
}

fn compile_listener(
    listener: &ListenerSpec,
    routes_by_name: &HashMap<&str, &RouteSpec>,
) -> Result<ListenerResource, CompileError> {
    if listener.routes.is_empty() {
        return Err(CompileError::EmptyListener {
            listener: listener.name.clone(),
        });
    }
    for route_name in &listener.routes {
        if !routes_by_name.contains_key(route_name.as_str()) {
            return Err(CompileError::UnknownRoute {
                listener: listener.name.clone(),
                route: route_name.clone(),
            });
        }
    }

    // TLS termination only when both halves of the pair are present.
    let tls = match (&listener.cert_file, &listener.key_file) {
        (Some(cert_file), Some(key_file)) if !cert_file.is_empty() && !key_file.is_empty() => {
            Some(DownstreamTls {
                cert_file: cert_file.clone(),
                key_file: key_file.clone(),
            })
        }
        _ => None,
    };

    Ok(ListenerResource {
        name: listener.name.clone(),
        address: SocketAddress {
            address: listener.address.clone(),
            port: listener.port,
        },
        route_table: ROUTE_TABLE_NAME.to_string(),
        access_log_path: ACCESS_LOG_PATH.to_string(),
        filters: vec![
            FilterStage::ExternalAuthorization {
                service_cluster: AUTHZ_CLUSTER_NAME.to_string(),
                clear_route_cache: true,
            },
            FilterStage::Router,
        ],
        upgrades: vec!["websocket".to_string(), "spdy/3.1".to_string()],
        tls,
    })
}
