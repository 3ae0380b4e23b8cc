//! Unified gateway error type.
//!
//! Every handler returns `Result<T, GatewayError>`, which implements
//! [`axum::response::IntoResponse`] so errors are converted to a
//! `{"error": <message>}` JSON body with the matching status code.
//!
//! **Security note:** upstream and internal errors are logged with full
//! detail but only a fixed message is returned, so provider error bodies,
//! configuration problems and exception text never reach the client.

use axum::extract::rejection::BytesRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use tutor_types::{text, ValidationError};

use crate::auth::VerifyError;
use crate::upstream::UpstreamError;

/// All errors that can occur while relaying a chat request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing, malformed or unverifiable bearer credential.
    #[error("unauthorized")]
    Unauthorized,

    /// The body failed validation; the caller must fix it.
    #[error("invalid request: {0}")]
    InvalidRequest(#[from] ValidationError),

    /// The body could not be read at all, including bodies over the size
    /// limit, which can never hold a valid conversation.
    #[error("unreadable request body: {0}")]
    UnreadableBody(#[from] BytesRejection),

    /// The provider answered 429.
    #[error("upstream rate limited")]
    UpstreamRateLimited,

    /// The provider answered 402.
    #[error("upstream quota exhausted")]
    UpstreamQuotaExhausted,

    /// Any other provider failure, including timeouts and transport errors.
    #[error("upstream failure: {0}")]
    UpstreamFailure(#[source] UpstreamError),

    /// An unclassified internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let (status, client_message) = match &self {
            // Client-facing errors: expose the message directly.
            GatewayError::Unauthorized => (StatusCode::UNAUTHORIZED, text::UNAUTHORIZED.to_owned()),
            GatewayError::InvalidRequest(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            GatewayError::UnreadableBody(e) => {
                warn!(error = %e, status = %e.status(), "request body rejected");
                (StatusCode::BAD_REQUEST, "request body could not be read".to_owned())
            }
            GatewayError::UpstreamRateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, text::RATE_LIMITED.to_owned())
            }
            GatewayError::UpstreamQuotaExhausted => {
                (StatusCode::PAYMENT_REQUIRED, text::QUOTA_EXHAUSTED.to_owned())
            }

            // Internal errors: log the detail, return a fixed message.
            GatewayError::UpstreamFailure(e) => {
                error!(error = %e, "AI gateway error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    text::SERVICE_UNAVAILABLE.to_owned(),
                )
            }
            GatewayError::Internal(m) => {
                error!(message = %m, "internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    text::SERVICE_UNAVAILABLE.to_owned(),
                )
            }
        };
        (status, Json(json!({ "error": client_message }))).into_response()
    }
}

impl From<UpstreamError> for GatewayError {
    fn from(e: UpstreamError) -> Self {
        match e {
            UpstreamError::RateLimited => GatewayError::UpstreamRateLimited,
            UpstreamError::QuotaExhausted => GatewayError::UpstreamQuotaExhausted,
            UpstreamError::NotConfigured => GatewayError::Internal(e.to_string()),
            other => GatewayError::UpstreamFailure(other),
        }
    }
}

impl From<VerifyError> for GatewayError {
    fn from(e: VerifyError) -> Self {
        GatewayError::Internal(format!("identity verification failed: {e}"))
    }
}

// ── Tests ──────────────────────────────────────────────────────────────────────
