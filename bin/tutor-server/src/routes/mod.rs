//! Axum router construction.
//!
//! [`build`] assembles the complete application router:
//! - Middleware layers (CORS, per-request trace id)
//! - Optional OpenAPI document (disable with `TUTOR_ENABLE_API_DOCS=false`)
//! - Health / heartbeat route
//! - The `/ai-chat` relay

mod chat;
pub mod doc;
mod health;

use std::sync::Arc;

use axum::routing::get;
use axum::{middleware, Json, Router};
use tower::ServiceBuilder;

use crate::middleware::{cors_layer, trace_middleware};
use crate::state::AppState;

/// Build the complete Axum [`Router`] for the application.
pub fn build(state: Arc<AppState>) -> Router {
    let mut app = Router::new()
        .merge(health::router())
        .merge(chat::router());

    if state.config.enable_api_docs {
        let api_doc = doc::get_docs();
        app = app.route("/api-docs/openapi.json", get(move || async move { Json(api_doc) }));
    }

    app
        // Outermost layers execute first on the way in; tracing wraps CORS so
        // pre-flights are logged too.
        .layer(
            ServiceBuilder::new()
                .layer(middleware::from_fn(trace_middleware))
                .layer(cors_layer(&state.config)),
        )
        .with_state(state)
}
