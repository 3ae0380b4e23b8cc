//! HTTP side of the consumer: send one chat turn to the gateway and hand
//! back the reply as a [`DeltaStream`].

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tutor_types::{ChatMessage, ChatRequest};

use crate::error::ClientError;
use crate::stream::DeltaStream;

/// Something that can open a reply stream for a conversation.
///
/// [`ChatClient`] is the real implementation; tests substitute scripted
/// transports.
#[async_trait]
pub trait ChatTransport: Send + Sync {
    async fn open(&self, token: &str, messages: &[ChatMessage]) -> Result<DeltaStream, ClientError>;
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Full URL of the relay, e.g. `https://project.example.com/functions/v1/ai-chat`.
    pub endpoint: String,
    /// Public project key sent as the `apikey` header, when the hosting
    /// platform requires one in front of the function.
    pub api_key: Option<String>,
    pub connect_timeout: Duration,
}

impl ClientConfig {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key: None,
            connect_timeout: Duration::from_secs(10),
        }
    }

    /// Build from `TUTOR_CHAT_ENDPOINT`, `TUTOR_API_KEY` and
    /// `TUTOR_CONNECT_TIMEOUT_SECS`.
    pub fn from_env() -> Self {
        Self {
            endpoint: env_or("TUTOR_CHAT_ENDPOINT", "http://127.0.0.1:3000/ai-chat"),
            api_key: std::env::var("TUTOR_API_KEY").ok().filter(|k| !k.is_empty()),
            connect_timeout: Duration::from_secs(parse_env("TUTOR_CONNECT_TIMEOUT_SECS", 10)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

#[derive(Serialize)]
struct OutgoingRequest<'a> {
    messages: &'a [ChatMessage],
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
}

impl ChatClient {
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("tutor-client/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .build()?;
        Ok(Self {
            http,
            endpoint: config.endpoint,
            api_key: config.api_key,
        })
    }
}

#[async_trait]
impl ChatTransport for ChatClient {
    async fn open(&self, token: &str, messages: &[ChatMessage]) -> Result<DeltaStream, ClientError> {
        ChatRequest::new(messages.to_vec()).validate()?;

        let mut request = self
            .http
            .post(&self.endpoint)
            .bearer_auth(token)
            .json(&OutgoingRequest { messages });
        if let Some(key) = &self.api_key {
            request = request.header("apikey", key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = match response.json::<ErrorBody>().await {
                Ok(body) => body.error,
                Err(_) => status.to_string(),
            };
            return Err(ClientError::Status {
                status: status.as_u16(),
                message,
            });
        }

        debug!(%status, messages = messages.len(), "reply stream opened");
        Ok(DeltaStream::from_response(response))
    }
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
