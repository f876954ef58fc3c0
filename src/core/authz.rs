//! Authorization decision engine.
//!
//! Holds the latest [`AuthorizationConfig`] behind an atomic pointer swap and
//! evaluates check requests against it. `check` is a pure function of the
//! loaded state plus the request: it performs no I/O and is safe to call from
//! any number of concurrent tasks while a reload swaps the config underneath.
//! A call observes exactly one config in its entirety, never a mixture.
//!
//! The engine starts unconfigured and fails closed: every check is denied
//! until the first successful reload. There is no transition back to the
//! unconfigured state.
use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::config::models::AuthorizationConfig;

/// Outcome of an authorization check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Allowed, with header directives to apply to the forwarded request,
    /// in order.
    Allow { headers: Vec<(String, String)> },
    /// Denied. Not an error: this is the expected outcome for unknown
    /// routes and wrong tokens.
    Deny,
}

impl Decision {
    pub fn is_allow(&self) -> bool {
        matches!(self, Decision::Allow { .. })
    }
}

/// The decision engine. Cheap to share via `Arc`; reloads swap the whole
/// config atomically.
#[derive(Default)]
pub struct AuthzEngine {
    config: ArcSwapOption<AuthorizationConfig>,
}

impl AuthzEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the live configuration wholesale.
    pub fn reload(&self, config: AuthorizationConfig) {
        tracing::info!(
            owner = %config.owner,
            routes = config.routes.len(),
            "Authorization config swapped"
        );
        self.config.store(Some(Arc::new(config)));
    }

    pub fn is_configured(&self) -> bool {
        self.config.load().is_some()
    }

    /// Evaluate a check request: inbound bearer token plus routing hint.
    ///
    /// Denies when unconfigured, when no authorization route matches the
    /// hint, or when the token does not match exactly (case-sensitive, no
    /// normalization). Otherwise allows with the route's header directives.
    pub fn check(&self, token: &str, route_hint: &str) -> Decision {
        let guard = self.config.load();
        let Some(config) = guard.as_ref() else {
            // Fail closed: no config means no access.
            return Decision::Deny;
        };

        let Some(route) = config.route_for_cluster(route_hint) else {
            tracing::debug!(route_hint, "No authorization route for hint");
            return Decision::Deny;
        };

        if route.required_token != token {
            tracing::debug!(route_hint, "Bearer token mismatch");
            return Decision::Deny;
        }

        let mut headers = vec![("x-route".to_string(), route_hint.to_string())];
        if let Some(host) = &route.host_rewrite {
            headers.push(("host".to_string(), host.clone()));
        }
        if let Some(outgoing) = &route.outgoing_token {
            // Credential translation: the upstream sees the outgoing token,
            // never the inbound one.
            headers.push(("authorization".to_string(), format!("Bearer {outgoing}")));
        }
        for (key, value) in &route.additional_headers {
            headers.push((key.clone(), value.clone()));
        }

        Decision::Allow { headers }
    }
}
