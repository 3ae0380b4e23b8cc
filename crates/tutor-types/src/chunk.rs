//! The provider's native streaming envelope.
//!
//! The gateway relays these frames untouched; only the client decodes them.
//! Every field is defaulted so an envelope of a different shape decodes to
//! "no delta" instead of an error.

use serde::{Deserialize, Serialize};

/// Prefix of every SSE data line.
pub const DATA_PREFIX: &str = "data: ";

/// Payload that marks the producer's logical end of stream.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatChunk {
    #[serde(default)]
    pub choices: Vec<ChunkChoice>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkChoice {
    #[serde(default)]
    pub delta: ChunkDelta,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkDelta {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl ChatChunk {
    /// A single-choice chunk carrying `content`.
    pub fn delta(content: impl Into<String>) -> Self {
        Self {
            choices: vec![ChunkChoice {
                delta: ChunkDelta {
                    content: Some(content.into()),
                },
            }],
        }
    }

    /// The first choice's delta text, if present and non-empty.
    pub fn first_delta(&self) -> Option<&str> {
        self.choices
            .first()
            .and_then(|c| c.delta.content.as_deref())
            .filter(|s| !s.is_empty())
    }

    /// Encode as one SSE event (`data: <json>` plus the blank separator line).
    pub fn to_sse_event(&self) -> String {
        // Serializing plain structs of strings cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        format!("{DATA_PREFIX}{json}\n\n")
    }
}

/// The terminal `data: [DONE]` event.
pub fn done_event() -> String {
    format!("{DATA_PREFIX}{DONE_SENTINEL}\n\n")
}
