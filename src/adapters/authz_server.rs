//! HTTP surface of the authorization decision engine.
//!
//! The data plane forwards the inbound request's headers here before routing.
//! The handler extracts the bearer token from `authorization` and the routing
//! hint from `x-route`, asks the engine, and answers `200 OK` carrying the
//! directive headers on allow or `403 Forbidden` with an empty body on deny.
//! A deny is the expected outcome for bad credentials, not an error.
use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, StatusCode, header::AUTHORIZATION},
    response::Response,
    routing::any,
};
use tower_http::trace::TraceLayer;

use crate::{
    core::authz::{AuthzEngine, Decision},
    metrics as fulcrum_metrics,
};

/// Header the data plane uses to convey the routing hint.
pub const ROUTE_HINT_HEADER: &str = "x-route";

/// Build the check router. Any method on any path is a check request, since
/// the data plane mirrors the original request to this service.
pub fn router(engine: Arc<AuthzEngine>) -> Router {
    Router::new()
        .route("/", any(check))
        .route("/{*path}", any(check))
        .layer(TraceLayer::new_for_http())
        .with_state(engine)
}

async fn check(State(engine): State<Arc<AuthzEngine>>, headers: HeaderMap) -> Response {
    let token = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.strip_prefix("Bearer ").unwrap_or(v))
        .unwrap_or("");
    let route_hint = headers
        .get(ROUTE_HINT_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    match engine.check(token, route_hint) {
        Decision::Allow { headers } => {
            fulcrum_metrics::record_authz_check("allow");
            tracing::debug!(route_hint, "Check allowed");

            let mut response = Response::builder().status(StatusCode::OK);
            for (key, value) in headers {
                match (
                    HeaderName::from_bytes(key.as_bytes()),
                    HeaderValue::from_str(&value),
                ) {
                    (Ok(name), Ok(value)) => {
                        response = response.header(name, value);
                    }
                    _ => {
                        tracing::error!(header = %key, "Skipping invalid directive header");
                    }
                }
            }
            response
                .body(Body::empty())
                .unwrap_or_else(|_| Response::new(Body::empty()))
        }
        Decision::Deny => {
            fulcrum_metrics::record_authz_check("deny");
            tracing::debug!(route_hint, "Check denied");

            Response::builder()
                .status(StatusCode::FORBIDDEN)
                .body(Body::empty())
                .unwrap_or_else(|_| Response::new(Body::empty()))
        }
    }
}
