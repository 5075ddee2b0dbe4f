use axum::{http::StatusCode, Json};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Response for an error
#[derive(Serialize, Deserialize, ToSchema, Debug)]
pub struct ErrorResponse {
    pub code: u16,
    pub status: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn with_status(status: StatusCode, error: impl Into<String>) -> (StatusCode, Json<ErrorResponse>) {
        (status, Json(ErrorResponse {
            code: status.as_u16(),
            status: status.to_string(),
            error: error.into(),
        }))
    }
}

/// A malformed or out-of-sequence frame. Dropped and logged, never fatal to a room.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    #[error("invalid room key '{0}'")]
    InvalidRoom(String),
    #[error("invalid display name '{0}'")]
    InvalidName(String),
    #[error("connection has not joined a room")]
    NotJoined,
    #[error("connection is in room '{joined}', not '{requested}'")]
    WrongRoom { joined: String, requested: String },
    #[error("empty chat message")]
    EmptyChat,
    #[error("unknown language '{0}'")]
    UnknownLanguage(String),
}
