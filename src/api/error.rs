use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

/// Errors returned by the control surface
///
/// Bodies are plain text so that `curl` output reads like the success
/// messages.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("error: missing parameter `{0}`")]
    MissingParameter(&'static str),
    #[error("error: key must be 1 to 65535 bytes, got {0}")]
    InvalidKey(usize),
    #[error("error: no such partition `{0}`")]
    UnknownPartition(String),
    #[error("error: could not find key")]
    KeyNotFound,
    #[error("error: could not store key")]
    StoreFailed,
    #[error("error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingParameter(_)
            | ApiError::InvalidKey(_)
            | ApiError::UnknownPartition(_) => StatusCode::BAD_REQUEST,
            ApiError::KeyNotFound => StatusCode::NOT_FOUND,
            ApiError::StoreFailed | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            ApiError::MissingParameter(_) => "MISSING_PARAMETER",
            ApiError::InvalidKey(_) => "INVALID_KEY",
            ApiError::UnknownPartition(_) => "UNKNOWN_PARTITION",
            ApiError::KeyNotFound => "KEY_NOT_FOUND",
            ApiError::StoreFailed => "STORE_FAILED",
            ApiError::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        tracing::debug!(code = self.code(), error = %self, "Request failed");
        (self.status_code(), self.to_string()).into_response()
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(value: tokio::task::JoinError) -> Self {
        ApiError::Internal(value.to_string())
    }
}
