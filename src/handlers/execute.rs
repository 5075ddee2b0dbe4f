use crate::{models::{ErrorResponse, RunRequest, RunResponse}, clients::execution_client::ExecutionError, AppState};
use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{error, info};

/// Run code on the external execution service.
///
/// Failures go back to the caller only; room state is never touched.
pub async fn run_code(
    State(app_state): State<Arc<AppState>>,
    Json(request): Json<RunRequest>,
) -> Result<(StatusCode, Json<RunResponse>), (StatusCode, Json<ErrorResponse>)> {

    let client = match &app_state.execution {
        Some(client) => client,
        None => {
            let e = ExecutionError::NotConfigured;
            error!("Run requested but {}", e);
            return Err(ErrorResponse::with_status(e.status_code(), e.to_string()));
        }
    };

    match client.run(&request).await {
        Ok(output) => {
            info!("Run finished: {} bytes stdout, {} bytes stderr", output.stdout.len(), output.stderr.len());
            Ok((StatusCode::OK, Json(output)))
        }
        Err(e) => {
            error!("Run failed: {}", e);
            Err(ErrorResponse::with_status(e.status_code(), e.to_string()))
        }
    }
}
