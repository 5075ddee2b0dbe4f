use axum::http::StatusCode;
use reqwest::Client;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, error};

use crate::models::{RunRequest, RunResponse};

/// Failure talking to the external code runner. Reported to the requester only.
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("no execution service is configured")]
    NotConfigured,
    #[error("execution service unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("execution service answered with status {0}")]
    Status(u16),
}

impl ExecutionError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ExecutionError::NotConfigured => StatusCode::SERVICE_UNAVAILABLE,
            ExecutionError::Transport(e) if e.is_timeout() => StatusCode::GATEWAY_TIMEOUT,
            ExecutionError::Transport(_) | ExecutionError::Status(_) => StatusCode::BAD_GATEWAY,
        }
    }
}

/// HTTP client for the remote compile/run endpoint.
#[derive(Debug, Clone)]
pub struct ExecutionClient {
    client: Client,
    url: String,
}

impl ExecutionClient {
    pub fn new(url: String, timeout: Duration) -> Result<Self, ExecutionError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()?;

        Ok(Self { client, url })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Forward `{language, code}` and return the captured `{stdout, stderr}`.
    pub async fn run(&self, request: &RunRequest) -> Result<RunResponse, ExecutionError> {
        info!("Forwarding {} run ({} bytes) to {}", request.language, request.code.len(), self.url);
        let response = self.client.post(&self.url)
            .json(request)
            .send().await?;

        let status = response.status();
        if !status.is_success() {
            error!("Execution service returned {}", status);
            return Err(ExecutionError::Status(status.as_u16()));
        }
        Ok(response.json::<RunResponse>().await?)
    }
}
