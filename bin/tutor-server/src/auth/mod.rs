//! Caller authentication.
//!
//! Handles `Authorization: Bearer <token>` credentials. The token is
//! checked by an [`IdentityVerifier`]; the gateway itself stores nothing.

mod hosted;

pub use hosted::HostedAuthVerifier;

use std::sync::Arc;

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use thiserror::Error;
use tracing::warn;

use crate::error::GatewayError;
use crate::state::AppState;

/// The caller behind a verified credential.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("identity service request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("identity service returned {0}")]
    UnexpectedStatus(u16),

    #[error("identity service is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    /// Resolve `token` to an identity.
    ///
    /// `Ok(None)` means the credential was rejected; `Err` means the check
    /// itself could not be carried out.
    async fn verify(&self, token: &str) -> Result<Option<Identity>, VerifyError>;
}

/// Installed when no identity service is configured; every check fails
/// as a server-side problem rather than as a rejected credential.
#[derive(Debug, Default)]
pub struct UnconfiguredVerifier;

#[async_trait]
impl IdentityVerifier for UnconfiguredVerifier {
    async fn verify(&self, _token: &str) -> Result<Option<Identity>, VerifyError> {
        Err(VerifyError::NotConfigured)
    }
}

/// Extractor that admits only verified callers.
///
/// Runs before the body is read, so unauthenticated requests cost no body
/// parsing and never reach the provider.
pub struct RequireUser(pub Identity);

impl FromRequestParts<Arc<AppState>> for RequireUser {
    type Rejection = GatewayError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(token) = bearer_token(&parts.headers) else {
            warn!("missing or malformed Authorization header");
            return Err(GatewayError::Unauthorized);
        };

        match state.verifier.verify(token).await? {
            Some(identity) => Ok(RequireUser(identity)),
            None => {
                warn!("credential rejected by identity service");
                Err(GatewayError::Unauthorized)
            }
        }
    }
}

/// Extract `<token>` from `Authorization: Bearer <token>`.
fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    (!token.is_empty() && !token.contains(char::is_whitespace)).then_some(token)
}
