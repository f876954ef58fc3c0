//! End-to-end tests of the authorization check surface, including reload
//! isolation under concurrent checks.
use std::{collections::BTreeMap, sync::Arc};

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use fulcrum::{
    adapters::authz_server::{self, ROUTE_HINT_HEADER},
    config::models::{AuthorizationConfig, AuthzRoute},
    core::{AuthzEngine, Decision},
};
use tower::ServiceExt;

fn authz_config(required: &str, outgoing: &str) -> AuthorizationConfig {
    AuthorizationConfig {
        owner: "edge".to_string(),
        routes: vec![AuthzRoute {
            cluster: "svc-a".to_string(),
            required_token: required.to_string(),
            outgoing_token: Some(outgoing.to_string()),
            host_rewrite: Some("svc-a.example.com".to_string()),
            additional_headers: BTreeMap::from([("x-tenant".to_string(), "blue".to_string())]),
        }],
    }
}

fn check_request(token: Option<&str>, hint: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri("/anything").method("POST");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    if let Some(hint) = hint {
        builder = builder.header(ROUTE_HINT_HEADER, hint);
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test(flavor = "multi_thread")]
async fn allow_rewrites_credentials_and_host() {
    let engine = Arc::new(AuthzEngine::new());
    engine.reload(authz_config("abc", "xyz"));
    let app = authz_server::router(engine);

    let response = app
        .oneshot(check_request(Some("abc"), Some("svc-a")))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-route"], "svc-a");
    assert_eq!(headers["host"], "svc-a.example.com");
    // The upstream must see the translated credential, never the inbound one.
    assert_eq!(headers["authorization"], "Bearer xyz");
    assert_eq!(headers["x-tenant"], "blue");
}

#[tokio::test(flavor = "multi_thread")]
async fn deny_paths_return_forbidden_without_directives() {
    let engine = Arc::new(AuthzEngine::new());
    engine.reload(authz_config("abc", "xyz"));
    let app = authz_server::router(engine);

    for request in [
        check_request(Some("wrong"), Some("svc-a")),
        check_request(Some("abc"), Some("svc-z")),
        check_request(Some("abc"), None),
        check_request(None, Some("svc-a")),
        check_request(None, None),
    ] {
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert!(response.headers().get("x-route").is_none());
        assert!(response.headers().get("authorization").is_none());
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn engine_fails_closed_before_first_reload() {
    let app = authz_server::router(Arc::new(AuthzEngine::new()));

    let response = app
        .oneshot(check_request(Some("abc"), Some("svc-a")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_authorization_header_is_treated_as_token() {
    let engine = Arc::new(AuthzEngine::new());
    engine.reload(authz_config("abc", "xyz"));
    let app = authz_server::router(engine);

    // No "Bearer " prefix: the raw value is compared and fails.
    let request = Request::builder()
        .uri("/")
        .header("authorization", "abc")
        .header(ROUTE_HINT_HEADER, "svc-a")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

/// Checks racing a reload must each observe one config in its entirety:
/// an allow for the old token always carries the old outgoing credential,
/// an allow for the new token always the new one. A cross pairing would
/// mean a check saw a half-swapped config.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_checks_never_observe_torn_config() {
    let engine = Arc::new(AuthzEngine::new());
    engine.reload(authz_config("old", "old-up"));

    let reloader = {
        let engine = engine.clone();
        tokio::spawn(async move {
            for i in 0..200 {
                if i % 2 == 0 {
                    engine.reload(authz_config("new", "new-up"));
                } else {
                    engine.reload(authz_config("old", "old-up"));
                }
                tokio::task::yield_now().await;
            }
        })
    };

    let mut checkers = Vec::new();
    for token in ["old", "new"] {
        let engine = engine.clone();
        checkers.push(tokio::spawn(async move {
            let expected = format!("Bearer {token}-up");
            for _ in 0..500 {
                if let Decision::Allow { headers } = engine.check(token, "svc-a") {
                    let outgoing = headers
                        .iter()
                        .find(|(k, _)| k == "authorization")
                        .map(|(_, v)| v.clone());
                    assert_eq!(outgoing.as_deref(), Some(expected.as_str()));
                }
                tokio::task::yield_now().await;
            }
        }));
    }

    reloader.await.unwrap();
    for checker in checkers {
        checker.await.unwrap();
    }
}
