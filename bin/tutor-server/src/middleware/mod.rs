//! HTTP middleware stack.
//!
//! Re-exports the CORS layer builder and the trace middleware.

pub mod cors;
pub mod trace;

pub use cors::cors_layer;
pub use trace::{trace_middleware, X_TRACE_ID};
