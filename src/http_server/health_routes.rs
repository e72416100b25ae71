//! Health HTTP Route
//!
//! Liveness plus whether the store directory is reachable. Not behind auth.

use std::sync::Arc;

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use serde::Serialize;

use super::state::FilesState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    /// "ready", or "empty" when no file was ever stored
    pub store: String,
}

/// Health check route
pub fn health_routes(state: Arc<FilesState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

async fn health_handler(State(state): State<Arc<FilesState>>) -> impl IntoResponse {
    let store = if tokio::fs::metadata(state.storage.store().root()).await.is_ok() {
        "ready"
    } else {
        "empty"
    };

    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        store: store.to_string(),
    };

    (StatusCode::OK, Json(response))
}
