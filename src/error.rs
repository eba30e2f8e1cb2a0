/// Unified error types for the credential service
use crate::crypto::{keys::KeyLoadError, signer::SignError};
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the service
///
/// Bad tokens never end up here; they are reported as a verdict. These are
/// request-shape problems and infrastructure failures.
#[derive(Error, Debug)]
pub enum VcError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Static key material could not be loaded
    #[error("Key load error: {0}")]
    KeyLoad(#[from] KeyLoadError),

    /// Token could not be produced
    #[error("Signing error: {0}")]
    Signing(#[from] SignError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate token id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl IntoResponse for VcError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            VcError::Validation(_) => (
                StatusCode::BAD_REQUEST,
                "InvalidRequest",
                self.to_string(),
            ),
            VcError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            VcError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            VcError::Database(_) | VcError::Internal(_) | VcError::Io(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
            VcError::KeyLoad(_) | VcError::Signing(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "KeyUnavailable",
                "Issuer key material unavailable".to_string(),
            ),
        };

        if status.is_server_error() {
            tracing::error!("request failed: {}", self);
        }

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for service operations
pub type VcResult<T> = Result<T, VcError>;
