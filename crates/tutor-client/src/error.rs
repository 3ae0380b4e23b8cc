use thiserror::Error;
use tutor_types::ValidationError;

/// Boxed error from an arbitrary byte source.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failures while sending a chat turn or reading its reply.
///
/// None of these are shown to the user verbatim; the view replaces them
/// with a fixed apology.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("chat request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("gateway returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("reading the reply stream failed: {0}")]
    Read(#[source] BoxError),

    #[error("refusing to send an invalid request: {0}")]
    Invalid(#[from] ValidationError),
}
