use std::io;
use std::time::Duration;

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;
use tutor_types::ChatMessage;

use super::{ByteStream, ChatProvider, UpstreamError};
use crate::config::Config;

/// Streams completions from an OpenAI-compatible `/chat/completions`
/// endpoint using the server-held API key.
pub struct OpenAiCompatProvider {
    client: Client,
    url: String,
    api_key: Option<String>,
    model: String,
    response_timeout: Duration,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

impl OpenAiCompatProvider {
    pub fn new(config: &Config) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(concat!("tutor-server/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            client,
            url: config.provider_url.clone(),
            api_key: config.provider_api_key.clone(),
            model: config.provider_model.clone(),
            response_timeout: config.response_timeout,
        })
    }
}

impl std::fmt::Debug for OpenAiCompatProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatProvider")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[async_trait]
impl ChatProvider for OpenAiCompatProvider {
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ByteStream, UpstreamError> {
        let api_key = self.api_key.as_deref().ok_or(UpstreamError::NotConfigured)?;

        let send = self
            .client
            .post(&self.url)
            .bearer_auth(api_key)
            .json(&CompletionRequest {
                model: &self.model,
                messages,
                stream: true,
            })
            .send();

        let response = tokio::time::timeout(self.response_timeout, send)
            .await
            .map_err(|_| UpstreamError::Timeout(self.response_timeout))??;

        debug!(status = %response.status(), model = %self.model, "provider responded");
        classify(response, self.response_timeout).await
    }
}

/// Most of a provider error body that is kept for the log.
const ERROR_BODY_LIMIT: usize = 4 * 1024;

/// Turn a provider response into its body stream or a classified error.
///
/// Reading an error body is bounded by `read_timeout` and
/// [`ERROR_BODY_LIMIT`]; whatever arrived in time is kept.
async fn classify(
    response: reqwest::Response,
    read_timeout: Duration,
) -> Result<ByteStream, UpstreamError> {
    match response.status() {
        status if status.is_success() => Ok(response
            .bytes_stream()
            .map_err(io::Error::other)
            .boxed()),
        StatusCode::TOO_MANY_REQUESTS => Err(UpstreamError::RateLimited),
        StatusCode::PAYMENT_REQUIRED => Err(UpstreamError::QuotaExhausted),
        status => Err(UpstreamError::Status {
            status: status.as_u16(),
            body: error_body(response, read_timeout).await,
        }),
    }
}

async fn error_body(response: reqwest::Response, read_timeout: Duration) -> String {
    let mut body = Vec::new();
    let mut chunks = response.bytes_stream();
    let read = async {
        while let Some(Ok(chunk)) = chunks.next().await {
            body.extend_from_slice(&chunk);
            if body.len() >= ERROR_BODY_LIMIT {
                break;
            }
        }
    };
    if tokio::time::timeout(read_timeout, read).await.is_err() {
        debug!(received = body.len(), "provider error body timed out");
    }
    body.truncate(ERROR_BODY_LIMIT);
    String::from_utf8_lossy(&body).into_owned()
}

// ── Tests ──────────────────────────────────────────────────────────────────────
