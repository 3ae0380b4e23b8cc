//! Shared types for the tutor chat relay.
//!
//! Both the gateway (`tutor-server`) and the streaming consumer
//! (`tutor-client`) depend on this crate so the request limits, the
//! provider's streaming envelope and the fixed user-facing strings are
//! defined exactly once.

pub mod chat;
pub mod chunk;
pub mod error;
pub mod text;

pub use chat::{ChatMessage, ChatRequest, Role, MAX_CONTENT_CHARS, MAX_MESSAGES};
pub use chunk::{done_event, ChatChunk, ChunkChoice, ChunkDelta, DATA_PREFIX, DONE_SENTINEL};
pub use error::ValidationError;
