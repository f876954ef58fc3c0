//! Read surface of the discovery store.
//!
//! The streaming discovery protocol itself is out of scope; this thin
//! wrapper lets subscribers (and operators) fetch the current bundle for a
//! node as JSON. Each response is one whole snapshot, serialized from a
//! single `Arc`, so a reader can never observe a torn bundle.
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use tower_http::trace::TraceLayer;

use crate::adapters::discovery_store::DiscoveryStore;

pub fn router(store: Arc<DiscoveryStore>) -> Router {
    Router::new()
        .route("/v1/discovery/{node_id}", get(get_snapshot))
        .layer(TraceLayer::new_for_http())
        .with_state(store)
}

async fn get_snapshot(
    Path(node_id): Path<String>,
    State(store): State<Arc<DiscoveryStore>>,
) -> Response {
    match store.snapshot(&node_id).await {
        Some(snapshot) => Json(snapshot.as_ref().clone()).into_response(),
        None => (
            StatusCode::NOT_FOUND,
            format!("no snapshot published for node '{node_id}'"),
        )
            .into_response(),
    }
}
