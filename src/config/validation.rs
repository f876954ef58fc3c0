use std::collections::HashSet;
use std::net::IpAddr;

use eyre::Result;

use crate::config::models::{
    AuthorizationConfig, ClusterSpec, ListenerSpec, ProxyConfig, RouteSpec,
};

/// Validation result type alias
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validation error types
#[derive(Debug, thiserror::Error, Clone)]
pub enum ValidationError {
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Duplicate {kind} name '{name}': names must be unique within their kind")]
    DuplicateName { kind: String, name: String },

    #[error("Unknown reference in '{field}': {message}")]
    UnknownReference { field: String, message: String },

    #[error("Validation failed: {message}")]
    ValidationFailed { message: String },
}

/// Proxy configuration validator.
///
/// Semantic validation on top of what serde already enforces: uniqueness of
/// names within a kind, referential integrity between listeners, routes and
/// clusters, and the exactly-one-destination rule for routes. Collects every
/// error rather than stopping at the first.
pub struct ProxyConfigValidator;

impl ProxyConfigValidator {
    /// Validate the entire proxy configuration
    pub fn validate(config: &ProxyConfig) -> ValidationResult<()> {
        let mut errors = Vec::new();

        Self::check_unique_names(config, &mut errors);

        let route_names: HashSet<&str> = config.routes.iter().map(|r| r.name.as_str()).collect();
        let cluster_names: HashSet<&str> =
            config.clusters.iter().map(|c| c.name.as_str()).collect();

        for listener in &config.listeners {
            Self::validate_listener(listener, &route_names, &mut errors);
        }
        for route in &config.routes {
            Self::validate_route(route, &cluster_names, &mut errors);
        }
        for cluster in &config.clusters {
            Self::validate_cluster(cluster, &mut errors);
        }
        if let Some(authorization) = &config.authorization {
            Self::validate_authorization(authorization, &mut errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::ValidationFailed {
                message: Self::format_multiple_errors(errors),
            })
        }
    }

    /// Duplicate names within a kind are an error, never a silent overwrite.
    fn check_unique_names(config: &ProxyConfig, errors: &mut Vec<ValidationError>) {
        let kinds: [(&str, Vec<&str>); 3] = [
            (
                "listener",
                config.listeners.iter().map(|l| l.name.as_str()).collect(),
            ),
            (
                "route",
                config.routes.iter().map(|r| r.name.as_str()).collect(),
            ),
            (
                "cluster",
                config.clusters.iter().map(|c| c.name.as_str()).collect(),
            ),
        ];

        for (kind, names) in kinds {
            let mut seen = HashSet::new();
            for name in names {
                if !seen.insert(name) {
                    errors.push(ValidationError::DuplicateName {
                        kind: kind.to_string(),
                        name: name.to_string(),
                    });
                }
            }
        }
    }

    fn validate_listener(
        listener: &ListenerSpec,
        route_names: &HashSet<&str>,
        errors: &mut Vec<ValidationError>,
    ) {
        if listener.name.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "listener name".to_string(),
            });
        }

        if listener.address.parse::<IpAddr>().is_err() {
            errors.push(ValidationError::InvalidField {
                field: format!("listener '{}' address", listener.name),
                message: format!("'{}' is not a valid IP address", listener.address),
            });
        }
        if listener.port == 0 {
            errors.push(ValidationError::InvalidField {
                field: format!("listener '{}' port", listener.name),
                message: "port must be non-zero".to_string(),
            });
        }

        // A listener with zero routes serves nothing; reject it.
        if listener.routes.is_empty() {
            errors.push(ValidationError::InvalidField {
                field: format!("listener '{}' routes", listener.name),
                message: "listeners must reference at least one route".to_string(),
            });
        }
        for route_name in &listener.routes {
            if !route_names.contains(route_name.as_str()) {
                errors.push(ValidationError::UnknownReference {
                    field: format!("listener '{}' routes", listener.name),
                    message: format!("route '{route_name}' is not defined"),
                });
            }
        }

        // TLS material comes in pairs.
        if listener.cert_file.is_some() != listener.key_file.is_some() {
            errors.push(ValidationError::InvalidField {
                field: format!("listener '{}' tls", listener.name),
                message: "cert_file and key_file must both be set or both be absent".to_string(),
            });
        }
    }

    fn validate_route(
        route: &RouteSpec,
        cluster_names: &HashSet<&str>,
        errors: &mut Vec<ValidationError>,
    ) {
        if route.name.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "route name".to_string(),
            });
        }
        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::InvalidField {
                field: format!("route '{}' prefix", route.name),
                message: "route prefixes must start with '/'".to_string(),
            });
        }

        match (&route.cluster_header, &route.cluster) {
            (Some(_), Some(_)) => errors.push(ValidationError::InvalidField {
                field: format!("route '{}'", route.name),
                message: "cluster_header and cluster are mutually exclusive".to_string(),
            }),
            (None, None) => errors.push(ValidationError::InvalidField {
                field: format!("route '{}'", route.name),
                message: "one of cluster_header or cluster is required".to_string(),
            }),
            (None, Some(cluster)) => {
                if !cluster_names.contains(cluster.as_str()) {
                    errors.push(ValidationError::UnknownReference {
                        field: format!("route '{}' cluster", route.name),
                        message: format!("cluster '{cluster}' is not defined"),
                    });
                }
            }
            (Some(header), None) => {
                if header.is_empty() {
                    errors.push(ValidationError::InvalidField {
                        field: format!("route '{}' cluster_header", route.name),
                        message: "header name must not be empty".to_string(),
                    });
                }
            }
        }
    }

    fn validate_cluster(cluster: &ClusterSpec, errors: &mut Vec<ValidationError>) {
        if cluster.name.is_empty() {
            errors.push(ValidationError::MissingField {
                field: "cluster name".to_string(),
            });
        }
        if cluster.endpoints.is_empty() {
            errors.push(ValidationError::InvalidField {
                field: format!("cluster '{}' endpoints", cluster.name),
                message: "clusters must have at least one endpoint".to_string(),
            });
        }
        for (i, endpoint) in cluster.endpoints.iter().enumerate() {
            if endpoint.host.is_empty() {
                errors.push(ValidationError::InvalidField {
                    field: format!("cluster '{}' endpoint {}", cluster.name, i + 1),
                    message: "endpoint host must not be empty".to_string(),
                });
            }
            if endpoint.port == 0 {
                errors.push(ValidationError::InvalidField {
                    field: format!("cluster '{}' endpoint {}", cluster.name, i + 1),
                    message: "endpoint port must be non-zero".to_string(),
                });
            }
        }
    }

    fn validate_authorization(
        authorization: &AuthorizationConfig,
        errors: &mut Vec<ValidationError>,
    ) {
        let mut seen = HashSet::new();
        for route in &authorization.routes {
            if route.cluster.is_empty() {
                errors.push(ValidationError::MissingField {
                    field: "authorization route cluster".to_string(),
                });
                continue;
            }
            if !seen.insert(route.cluster.as_str()) {
                errors.push(ValidationError::DuplicateName {
                    kind: "authorization route".to_string(),
                    name: route.cluster.clone(),
                });
            }
            if route.required_token.is_empty() {
                errors.push(ValidationError::MissingField {
                    field: format!("authorization route '{}' required_token", route.cluster),
                });
            }
        }
    }

    /// Format multiple validation errors into a single message
    fn format_multiple_errors(errors: Vec<ValidationError>) -> String {
        errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}
