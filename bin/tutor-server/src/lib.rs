//! tutor-server: the authenticated streaming relay behind the AI tutor.
//!
//! A single `POST /ai-chat` route verifies the caller's bearer token,
//! validates the conversation, prepends the tutoring persona and relays the
//! model provider's `text/event-stream` response without buffering it.
//!
//! The binary in `main.rs` only wires configuration, tracing and shutdown;
//! everything else lives here so integration tests can build the router
//! with fake collaborators.

pub mod auth;
pub mod config;
pub mod error;
pub mod middleware;
pub mod prompt;
pub mod routes;
pub mod state;
pub mod upstream;

pub use config::{Cli, Config};
pub use error::GatewayError;
pub use state::AppState;
