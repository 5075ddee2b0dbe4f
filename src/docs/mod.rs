use utoipa::OpenApi;
use crate::models::*;

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
#[allow(dead_code)]
pub async fn health_check_doc() {}

/// Readiness check endpoint
#[utoipa::path(
    get,
    path = "/api/ready",
    responses(
        (status = 200, description = "Service is ready", body = ReadyResponse)
    )
)]
#[allow(dead_code)]
pub async fn ready_check_doc() {}

/// Room registry and host statistics
#[utoipa::path(
    get,
    path = "/api/v1/diagnostics",
    responses(
        (status = 200, description = "Current diagnostics", body = DiagnosticsResponse)
    )
)]
#[allow(dead_code)]
pub async fn diagnostics_doc() {}

/// Run code on the remote execution service
#[utoipa::path(
    post,
    path = "/api/v1/run",
    request_body = RunRequest,
    responses(
        (status = 200, description = "Program output", body = RunResponse),
        (status = 502, description = "Execution service failed", body = ErrorResponse),
        (status = 503, description = "No execution service configured", body = ErrorResponse),
        (status = 504, description = "Execution service timed out", body = ErrorResponse)
    )
)]
#[allow(dead_code)]
pub async fn run_code_doc() {}

#[derive(OpenApi)]
#[openapi(
    paths(
        health_check_doc,
        ready_check_doc,
        diagnostics_doc,
        run_code_doc,
    ),
    components(
        schemas(HealthResponse, ReadyResponse, DiagnosticsResponse, RunRequest, RunResponse, ErrorResponse, Language)
    ),
    tags(
        (name = "api", description = "API endpoints")
    )
)]
pub struct ApiDoc;
