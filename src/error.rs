/// Unified error types for the DisTim server
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for the server
#[derive(Error, Debug)]
pub enum DistimError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Authentication errors (missing or invalid bearer token)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// Not found errors
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conflict errors (e.g., duplicate totem id)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Device storage errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Outbound HTTP errors (identity provider, story model)
    #[error("Upstream error: {0}")]
    Upstream(String),

    /// Rate limiting errors
    #[error("Rate limit exceeded")]
    RateLimitExceeded { retry_after: std::time::Duration },

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// JSON error response format
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

impl From<validator::ValidationErrors> for DistimError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DistimError::Validation(errors.to_string())
    }
}

/// Convert DistimError to HTTP response
impl IntoResponse for DistimError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            DistimError::Authentication(_) => (
                StatusCode::UNAUTHORIZED,
                "AuthenticationRequired",
                self.to_string(),
            ),
            DistimError::Validation(_) => {
                (StatusCode::BAD_REQUEST, "InvalidRequest", self.to_string())
            }
            DistimError::NotFound(_) => (StatusCode::NOT_FOUND, "NotFound", self.to_string()),
            DistimError::Conflict(_) => (StatusCode::CONFLICT, "Conflict", self.to_string()),
            DistimError::RateLimitExceeded { .. } => (
                StatusCode::TOO_MANY_REQUESTS,
                "RateLimitExceeded",
                "Rate limit exceeded".to_string(),
            ),
            DistimError::Upstream(_) => (
                StatusCode::BAD_GATEWAY,
                "UpstreamUnavailable",
                self.to_string(),
            ),
            DistimError::Database(_)
            | DistimError::Storage(_)
            | DistimError::Io(_)
            | DistimError::Internal(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "InternalServerError",
                "Internal server error".to_string(), // Don't leak details
            ),
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        }
        crate::metrics::record_error(error_code);

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for server operations
pub type DistimResult<T> = Result<T, DistimError>;
