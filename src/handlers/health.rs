use axum::{extract::State, Json};
use crate::{models::{HealthResponse, ReadyResponse}, AppState};
use std::sync::Arc;
use tracing::debug;

/// Root banner
pub async fn root() -> &'static str {
    "Backend is running!!"
}

/// Health check endpoint
pub async fn health_check(State(app_state): State<Arc<AppState>>) -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        service: app_state.service_name.clone(),
        version: 1,
    })
}

/// Readiness check endpoint
pub async fn ready_check() -> Json<ReadyResponse> {
    debug!("Readiness check requested");
    // The relay keeps everything in memory, so it is ready as soon as it serves requests.
    Json(ReadyResponse {
        status: "ok".to_string(),
        message: "Service is ready".to_string(),
    })
}
