//! Shared application state injected into every Axum handler.

use std::sync::Arc;

use tracing::warn;

use crate::auth::{HostedAuthVerifier, IdentityVerifier, UnconfiguredVerifier};
use crate::config::Config;
use crate::upstream::{ChatProvider, OpenAiCompatProvider};

/// State shared across all HTTP handlers.
#[derive(Clone)]
pub struct AppState {
    /// Server configuration (env-derived).
    pub config: Arc<Config>,
    /// Resolves bearer tokens to callers.
    pub verifier: Arc<dyn IdentityVerifier>,
    /// Streams completions from the model provider.
    pub provider: Arc<dyn ChatProvider>,
}

impl AppState {
    /// Build the production verifier and provider from `config`.
    pub fn from_config(config: Config) -> Result<Self, reqwest::Error> {
        let verifier: Arc<dyn IdentityVerifier> = match &config.auth_url {
            Some(url) => Arc::new(HostedAuthVerifier::new(
                url,
                config.auth_api_key.clone(),
                config.connect_timeout,
            )?),
            None => {
                warn!("TUTOR_AUTH_URL is not set; every chat request will fail with 500");
                Arc::new(UnconfiguredVerifier)
            }
        };
        if config.provider_api_key.is_none() {
            warn!("TUTOR_PROVIDER_API_KEY is not set; every chat request will fail with 500");
        }
        let provider = Arc::new(OpenAiCompatProvider::new(&config)?);

        Ok(Self {
            config: Arc::new(config),
            verifier,
            provider,
        })
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("bind_address", &self.config.bind_address)
            .field("provider_url", &self.config.provider_url)
            .finish_non_exhaustive()
    }
}
