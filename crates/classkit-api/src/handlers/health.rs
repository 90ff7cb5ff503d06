//! Health check handlers.

use axum::{Json, extract::State, http::StatusCode};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::state::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Ready once the registry store answers.
pub async fn ready(State(state): State<Arc<AppState>>) -> StatusCode {
    match state.registry.stats().await {
        Ok(_) => StatusCode::OK,
        Err(e) => {
            warn!(error = %e, "Registry store not ready");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
