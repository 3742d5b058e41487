//! Centralized API error handling
//!
//! A unified error type for every flow in the service, with HTTP status
//! mapping and the uniform JSON error envelope returned to clients.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

/// API error taxonomy with HTTP status code mapping
///
/// The first seven variants are "expected" outcomes that flows surface
/// deliberately. `Internal` is never returned to a caller directly: the
/// session service wraps it into a flow-specific `BadRequest` before it
/// reaches the boundary, and the envelope renderer treats any stray
/// `Internal` as an opaque 500.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{message}")]
    Validation {
        message: String,
        details: Option<serde_json::Value>,
    },

    #[error("{0}")]
    Authentication(String),

    #[error("{0}")]
    Authorization(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0}")]
    Conflict(String),

    #[error("{0}")]
    BadRequest(String),

    #[error("Too many requests, please try again later")]
    RateLimit,

    #[error("Internal server error")]
    Internal(String),
}

impl ApiError {
    /// Shorthand for a validation error without field details
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::Validation {
            message: message.into(),
            details: None,
        }
    }

    /// Get the machine-readable error code
    pub fn error_code(&self) -> &'static str {
        match self {
            ApiError::Validation { .. } => "VALIDATION_ERROR",
            ApiError::Authentication(_) => "AUTHENTICATION_ERROR",
            ApiError::Authorization(_) => "AUTHORIZATION_ERROR",
            ApiError::NotFound(_) => "NOT_FOUND_ERROR",
            ApiError::Conflict(_) => "CONFLICT_ERROR",
            ApiError::BadRequest(_) => "BAD_REQUEST_ERROR",
            ApiError::RateLimit => "RATE_LIMIT_ERROR",
            ApiError::Internal(_) => "INTERNAL_SERVER_ERROR",
        }
    }

    /// Get the HTTP status code
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication(_) => StatusCode::UNAUTHORIZED,
            ApiError::Authorization(_) => StatusCode::FORBIDDEN,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::RateLimit => StatusCode::TOO_MANY_REQUESTS,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error envelope returned for every failed request
#[derive(Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: ErrorBody,
}

/// Error details in the envelope
#[derive(Serialize)]
pub struct ErrorBody {
    pub message: String,
    pub code: String,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
    pub timestamp: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.error_code();

        // Raw internal detail is logged, never sent to the caller.
        let (message, details) = match self {
            ApiError::Internal(detail) => {
                tracing::error!(error = %detail, "Internal error reached the response boundary");
                ("Internal server error".to_string(), None)
            }
            ApiError::Validation { message, details } => (message, details),
            other => {
                tracing::debug!(error = %other, code = %code, "Request failed");
                (other.to_string(), None)
            }
        };

        let body = ErrorResponse {
            success: false,
            error: ErrorBody {
                message,
                code: code.to_string(),
                status_code: status.as_u16(),
                timestamp: Utc::now().to_rfc3339(),
                details,
            },
        };

        (status, Json(body)).into_response()
    }
}

// Conversions from collaborator error types

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::Validation {
            message: "Validation failed".to_string(),
            details: serde_json::to_value(err.field_errors()).ok(),
        }
    }
}

/// Result type alias using ApiError
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            ApiError::validation("bad input").error_code(),
            "VALIDATION_ERROR"
        );
        assert_eq!(
            ApiError::Authentication("nope".to_string()).error_code(),
            "AUTHENTICATION_ERROR"
        );
        assert_eq!(
            ApiError::Conflict("taken".to_string()).error_code(),
            "CONFLICT_ERROR"
        );
        assert_eq!(ApiError::RateLimit.error_code(), "RATE_LIMIT_ERROR");
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::validation("bad input").status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::Authentication("nope".to_string()).status_code(),
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            ApiError::Authorization("denied".to_string()).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            ApiError::NotFound("User".to_string()).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::Conflict("taken".to_string()).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(ApiError::RateLimit.status_code(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            ApiError::Internal("db down".to_string()).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_not_found_message() {
        assert_eq!(
            ApiError::NotFound("User".to_string()).to_string(),
            "User not found"
        );
    }
}
