//! # API Error Types
//!
//! [`AppError`] is the closed set of failures a pipeline step or handler can
//! produce. Every variant maps to exactly one status code through
//! [`AppError::status_code`], and every response, success or failure, is
//! wrapped in the same [`Envelope`]:
//!
//! ```json
//! { "success": false, "error": "Validation failed", "details": { "amount": ["..."] } }
//! ```
//!
//! `Internal` never exposes its message to clients; the full detail goes to
//! the log instead.

use std::time::Duration;

use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use ledgerline_core::Role;
use ledgerline_schema::FieldErrors;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

// ── Envelope ────────────────────────────────────────────────────────────────

/// Response body shared by every endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T = Value> {
    /// `true` for 2xx responses.
    pub success: bool,
    /// Payload of a successful response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Human-readable error message.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Structured error detail (field → messages for validation failures).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Auxiliary information such as pagination or retry hints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<Value>,
}

impl<T> Envelope<T> {
    /// Successful envelope carrying `data`.
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            details: None,
            meta: None,
        }
    }

    /// Attach metadata.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.meta = Some(meta);
        self
    }
}

impl Envelope<Value> {
    /// Failure envelope.
    pub fn failure(error: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
            details,
            meta: None,
        }
    }
}

/// A successful response: status code plus enveloped data.
#[derive(Debug)]
pub struct ApiResponse<T> {
    status: StatusCode,
    envelope: Envelope<T>,
}

impl<T> ApiResponse<T> {
    /// `200 OK` with `data`.
    pub fn ok(data: T) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope::ok(data),
        }
    }

    /// `201 Created` with `data`.
    pub fn created(data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            envelope: Envelope::ok(data),
        }
    }

    /// Attach metadata to the envelope.
    pub fn with_meta(mut self, meta: Value) -> Self {
        self.envelope = self.envelope.with_meta(meta);
        self
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

// ── AppError ────────────────────────────────────────────────────────────────

/// Every way a request can fail inside the pipeline.
#[derive(Error, Debug)]
pub enum AppError {
    /// No session credential was presented, or a step that needs an
    /// authenticated caller ran without one (401).
    #[error("Authentication required")]
    AuthenticationRequired,

    /// A credential was presented but did not verify (401).
    #[error("Invalid or expired session")]
    InvalidCredential,

    /// Sign-in failed. Unknown account and wrong password are not
    /// distinguished (401).
    #[error("Invalid email or password")]
    InvalidLogin,

    /// The CSRF cookie and header are missing or differ (403).
    #[error("Invalid CSRF token")]
    CsrfMismatch,

    /// The caller's role ranks below the route's minimum (403).
    #[error("Insufficient permissions: requires {required}")]
    InsufficientRole {
        /// Minimum role for the route.
        required: Role,
    },

    /// Input did not match the declared shape (400).
    #[error("Validation failed")]
    ValidationFailed(FieldErrors),

    /// The request body is not valid JSON (400).
    #[error("Request body is not valid JSON")]
    MalformedRequestBody,

    /// The client exceeded its rate limit (429).
    #[error("Too many requests")]
    RateLimited {
        /// Time until the oldest request in the window expires.
        retry_after: Duration,
    },

    /// The requested resource does not exist (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// Internal server error (500). Message is logged but not returned to client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// The single mapping from error to HTTP status.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::AuthenticationRequired | Self::InvalidCredential | Self::InvalidLogin => {
                StatusCode::UNAUTHORIZED
            }
            Self::CsrfMismatch | Self::InsufficientRole { .. } => StatusCode::FORBIDDEN,
            Self::ValidationFailed(_) | Self::MalformedRequestBody => StatusCode::BAD_REQUEST,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Whole seconds until `duration` elapses, rounded up and never zero.
pub(crate) fn ceil_secs(duration: Duration) -> u64 {
    let secs = duration.as_secs() + u64::from(duration.subsec_nanos() > 0);
    secs.max(1)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, details, meta) = match &self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "internal server error");
                ("An internal error occurred".to_string(), None, None)
            }
            Self::ValidationFailed(fields) => (
                self.to_string(),
                serde_json::to_value(fields).ok(),
                None,
            ),
            Self::RateLimited { retry_after } => (
                self.to_string(),
                None,
                Some(serde_json::json!({ "retryAfter": ceil_secs(*retry_after) })),
            ),
            other => (other.to_string(), None, None),
        };

        let mut envelope = Envelope::failure(message, details);
        envelope.meta = meta;
        let mut response = (status, Json(envelope)).into_response();

        if let Self::RateLimited { retry_after } = &self {
            response.headers_mut().insert(
                header::RETRY_AFTER,
                HeaderValue::from(ceil_secs(*retry_after)),
            );
        }
        response
    }
}
