//! Casting service error types.
//!
//! Every failure renders as the same JSON envelope:
//! `{"success": false, "error": <code>, "message": <fixed text>}`.
//! Messages are fixed per status so that internal details never reach
//! clients. Actual errors are logged server-side.

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Casting service error type.
///
/// Maps to HTTP status codes:
/// - BadRequest: 400
/// - Auth: 401 (the envelope `error` field carries the internal 400/401 code)
/// - Forbidden: 403
/// - NotFound: 404
/// - MethodNotAllowed: 405
/// - UnprocessableEntity: 422
/// - Database, ServiceUnavailable, Internal: 500
#[derive(Debug, Error)]
pub enum CastingError {
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Token verification or permission check failed.
    ///
    /// `status` is 400 for malformed claims and 401 for everything else.
    #[error("Authentication failed ({status}): {reason}")]
    Auth { status: u16, reason: String },

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Method not allowed")]
    MethodNotAllowed,

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    #[error("Internal server error")]
    Internal,
}

impl CastingError {
    /// Authentication failure reported with internal code 401.
    pub fn unauthorized(reason: impl Into<String>) -> Self {
        CastingError::Auth {
            status: 401,
            reason: reason.into(),
        }
    }

    /// Authentication failure for structurally invalid claims (internal code 400).
    pub fn invalid_claims(reason: impl Into<String>) -> Self {
        CastingError::Auth {
            status: 400,
            reason: reason.into(),
        }
    }

    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            CastingError::BadRequest(_) => 400,
            CastingError::Auth { .. } => 401,
            CastingError::Forbidden(_) => 403,
            CastingError::NotFound(_) => 404,
            CastingError::MethodNotAllowed => 405,
            CastingError::UnprocessableEntity(_) => 422,
            CastingError::Database(_)
            | CastingError::ServiceUnavailable(_)
            | CastingError::Internal => 500,
        }
    }

    /// Code placed in the envelope `error` field.
    fn envelope_code(&self) -> u16 {
        match self {
            CastingError::Auth { status, .. } => *status,
            other => other.status_code(),
        }
    }

    fn message(&self) -> &'static str {
        match self {
            CastingError::BadRequest(_) => "bad request",
            CastingError::Auth { .. } => "authentication failed",
            CastingError::Forbidden(_) => "permissions denied",
            CastingError::NotFound(_) => "resource not found",
            CastingError::MethodNotAllowed => "method not allowed",
            CastingError::UnprocessableEntity(_) => "unprocessable",
            CastingError::Database(_)
            | CastingError::ServiceUnavailable(_)
            | CastingError::Internal => "internal server error",
        }
    }
}

/// Uniform error envelope.
#[derive(Debug, Serialize)]
pub struct ErrorEnvelope {
    pub success: bool,
    pub error: u16,
    pub message: &'static str,
}

impl IntoResponse for CastingError {
    fn into_response(self) -> Response {
        match &self {
            CastingError::Database(err) => {
                // Log actual error server-side, return generic message to client
                tracing::error!(target: "casting.database", error = %err, "Database operation failed");
            }
            CastingError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "casting.availability", reason = %reason, "Service unavailable");
            }
            CastingError::Auth { status, reason } => {
                tracing::debug!(target: "casting.auth", status = *status, reason = %reason, "Authentication failed");
            }
            CastingError::BadRequest(reason)
            | CastingError::UnprocessableEntity(reason)
            | CastingError::NotFound(reason)
            | CastingError::Forbidden(reason) => {
                tracing::debug!(target: "casting.request", reason = %reason, "Request rejected");
            }
            CastingError::MethodNotAllowed | CastingError::Internal => {}
        }

        let status = StatusCode::from_u16(self.status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let envelope = ErrorEnvelope {
            success: false,
            error: self.envelope_code(),
            message: self.message(),
        };

        let mut response = (status, Json(envelope)).into_response();

        // Add WWW-Authenticate header for 401 responses
        if status == StatusCode::UNAUTHORIZED {
            response.headers_mut().insert(
                header::WWW_AUTHENTICATE,
                HeaderValue::from_static("Bearer realm=\"casting-agency-api\", error=\"invalid_token\""),
            );
        }

        response
    }
}

/// Convert sqlx errors to CastingError
impl From<sqlx::Error> for CastingError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                CastingError::ServiceUnavailable(err.to_string())
            }
            other => CastingError::Database(other.to_string()),
        }
    }
}
