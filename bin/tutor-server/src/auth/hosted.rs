use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::{Identity, IdentityVerifier, VerifyError};

/// Verifies access tokens against a hosted auth service's
/// `GET /auth/v1/user` endpoint.
pub struct HostedAuthVerifier {
    client: Client,
    user_url: String,
    api_key: Option<String>,
}

#[derive(Deserialize)]
struct UserRecord {
    #[serde(default)]
    id: String,
    #[serde(default)]
    email: Option<String>,
}

impl HostedAuthVerifier {
    pub fn new(
        base_url: &str,
        api_key: Option<String>,
        connect_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("tutor-server/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect_timeout)
            .timeout(Duration::from_secs(15))
            .build()?;
        Ok(Self {
            client,
            user_url: format!("{}/auth/v1/user", base_url.trim_end_matches('/')),
            api_key,
        })
    }
}

#[async_trait]
impl IdentityVerifier for HostedAuthVerifier {
    async fn verify(&self, token: &str) -> Result<Option<Identity>, VerifyError> {
        let mut request = self.client.get(&self.user_url).bearer_auth(token);
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Ok(None),
            status if status.is_success() => {
                let user: UserRecord = response.json().await?;
                if user.id.is_empty() {
                    return Ok(None);
                }
                Ok(Some(Identity {
                    user_id: user.id,
                    email: user.email,
                }))
            }
            status => Err(VerifyError::UnexpectedStatus(status.as_u16())),
        }
    }
}
