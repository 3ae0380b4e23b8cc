//! Chat request types and the limits the gateway enforces on them.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum::{AsRefStr, Display, EnumString};

use crate::error::ValidationError;

/// Maximum number of client messages in one request.
pub const MAX_MESSAGES: usize = 50;

/// Maximum message content length, counted in Unicode scalar values.
pub const MAX_CONTENT_CHARS: usize = 8000;

/// Author of a chat message.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// A single message in conversation order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Body of `POST /ai-chat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self { messages }
    }

    /// Parse and validate a raw request body.
    ///
    /// The message count is checked first, then each message in order (role,
    /// then content) so the error always names the first offending message.
    /// Unknown fields are ignored.
    pub fn from_json(body: &[u8]) -> Result<Self, ValidationError> {
        let value: Value = serde_json::from_slice(body).map_err(ValidationError::MalformedJson)?;
        let raw = value
            .get("messages")
            .and_then(Value::as_array)
            .ok_or(ValidationError::MissingMessages)?;

        check_count(raw.len())?;

        let messages = raw
            .iter()
            .enumerate()
            .map(|(index, raw)| parse_message(index, raw))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { messages })
    }

    /// Check the limits on an already typed request.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_count(self.messages.len())?;
        self.messages
            .iter()
            .enumerate()
            .try_for_each(|(index, m)| check_content(index, &m.content))
    }
}

fn check_count(count: usize) -> Result<(), ValidationError> {
    match count {
        0 => Err(ValidationError::EmptyConversation),
        n if n > MAX_MESSAGES => Err(ValidationError::TooManyMessages { count: n }),
        _ => Ok(()),
    }
}

fn check_content(index: usize, content: &str) -> Result<(), ValidationError> {
    let length = content.chars().count();
    if length > MAX_CONTENT_CHARS {
        return Err(ValidationError::ContentTooLong { index, length });
    }
    Ok(())
}

fn parse_message(index: usize, raw: &Value) -> Result<ChatMessage, ValidationError> {
    let fields = raw
        .as_object()
        .ok_or(ValidationError::MalformedMessage { index })?;

    let role = fields
        .get("role")
        .and_then(Value::as_str)
        .and_then(|r| r.parse::<Role>().ok())
        .ok_or(ValidationError::InvalidRole { index })?;

    let content = fields
        .get("content")
        .and_then(Value::as_str)
        .ok_or(ValidationError::MissingContent { index })?;
    check_content(index, content)?;

    Ok(ChatMessage::new(role, content))
}

// ── Tests ──────────────────────────────────────────────────────────────────────
