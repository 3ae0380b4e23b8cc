use thiserror::Error;

use crate::chat::{MAX_CONTENT_CHARS, MAX_MESSAGES};

/// Reasons a chat request body is rejected before any upstream call.
///
/// The `Display` text is returned to the caller verbatim in the 400 body,
/// so it must only describe the caller's own input.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("request body is not valid JSON")]
    MalformedJson(#[source] serde_json::Error),

    #[error("request body must be an object with a `messages` array")]
    MissingMessages,

    #[error("messages must not be empty")]
    EmptyConversation,

    #[error("too many messages ({count}); at most {MAX_MESSAGES} are allowed")]
    TooManyMessages { count: usize },

    #[error("message {index} must be an object")]
    MalformedMessage { index: usize },

    #[error("message {index} has an invalid role")]
    InvalidRole { index: usize },

    #[error("message {index} content must be a string")]
    MissingContent { index: usize },

    #[error(
        "message {index} content is too long ({length} characters; at most {MAX_CONTENT_CHARS} are allowed)"
    )]
    ContentTooLong { index: usize, length: usize },
}
