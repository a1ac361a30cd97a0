use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

/// Contract-level failures surfaced to callers.
///
/// Every failure is recovered at the boundary where it occurs and converted
/// to a single user-facing message; raw causes are logged for diagnostics
/// only.
#[derive(Error, Debug)]
pub enum AppError {
    /// Audio input device access refused; fatal to the live session,
    /// the user must retry manually.
    #[error("microphone access refused: {0}")]
    PermissionDenied(String),

    /// Handshake or mid-session transport error; forces teardown, no
    /// automatic retry.
    #[error("connection failure: {0}")]
    ConnectionFailure(String),

    /// A model reply did not parse against the declared response shape.
    #[error("schema violation: {0}")]
    SchemaViolation(String),

    /// A well-formed reply that explicitly signals "no such record".
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            AppError::PermissionDenied(_) => StatusCode::FORBIDDEN,
            AppError::ConnectionFailure(_) => StatusCode::BAD_GATEWAY,
            // A malformed model reply is an upstream fault, not a client one
            AppError::SchemaViolation(_) => StatusCode::BAD_GATEWAY,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            AppError::PermissionDenied(_) => "permission_denied",
            AppError::ConnectionFailure(_) => "connection_failure",
            AppError::SchemaViolation(_) => "schema_violation",
            AppError::NotFound(_) => "not_found",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = json!({
            "error": {
                "type": self.kind(),
                "message": self.to_string(),
            }
        });
        (self.status(), Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
