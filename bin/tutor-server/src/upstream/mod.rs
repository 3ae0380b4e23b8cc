//! Upstream chat-completion provider.
//!
//! [`ChatProvider`] is the seam between the relay route and the streaming
//! LLM gateway; [`OpenAiCompatProvider`] is the production implementation.

mod openai;

pub use openai::OpenAiCompatProvider;

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream::BoxStream;
use thiserror::Error;
use tutor_types::ChatMessage;

/// The provider's response body, chunk by chunk, in arrival order.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("provider rate limited the request")]
    RateLimited,

    #[error("provider quota exhausted")]
    QuotaExhausted,

    #[error("provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("provider did not respond within {0:?}")]
    Timeout(Duration),

    #[error("provider API key is not configured")]
    NotConfigured,
}

#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Start a streaming completion for `messages`.
    ///
    /// Resolves once the response headers are in. Dropping the returned
    /// stream abandons the upstream request.
    async fn stream_chat(&self, messages: &[ChatMessage]) -> Result<ByteStream, UpstreamError>;
}
