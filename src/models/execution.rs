use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use crate::models::Language;

/// Code to hand to the remote execution service.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq)]
pub struct RunRequest {
    pub language: Language,
    pub code: String,
}

/// Output captured by the remote execution service.
#[derive(Serialize, Deserialize, ToSchema, Debug, Clone, PartialEq, Default)]
pub struct RunResponse {
    #[serde(default)]
    pub stdout: String,
    #[serde(default)]
    pub stderr: String,
}
