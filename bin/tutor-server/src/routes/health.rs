//! Liveness and configuration readiness.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use utoipa::{OpenApi, ToSchema};

use crate::state::AppState;

#[derive(OpenApi)]
#[openapi(paths(get_health), components(schemas(HealthReport)))]
pub struct HealthApi;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route("/health", get(get_health))
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthReport {
    /// Always `"ok"` while the process serves requests.
    status: String,
    version: String,
    /// Whether a provider key is set; without it every relay answers 500.
    provider_configured: bool,
    /// Whether an identity service is set; without it every relay answers 500.
    auth_configured: bool,
}

/// Report that the gateway is up, and whether it can relay at all.
///
/// No upstream call is made; the flags only reflect configuration, so a
/// load balancer can tell a misconfigured instance apart from a dead one.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses((status = 200, description = "Gateway is up", body = HealthReport))
)]
pub async fn get_health(State(state): State<Arc<AppState>>) -> Json<HealthReport> {
    Json(HealthReport {
        status: "ok".to_owned(),
        version: env!("CARGO_PKG_VERSION").to_owned(),
        provider_configured: state.config.provider_api_key.is_some(),
        auth_configured: state.config.auth_url.is_some(),
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::auth::UnconfiguredVerifier;
    use crate::config::Config;
    use crate::upstream::OpenAiCompatProvider;

    fn state(config: Config) -> Arc<AppState> {
        Arc::new(AppState {
            verifier: Arc::new(UnconfiguredVerifier),
            provider: Arc::new(OpenAiCompatProvider::new(&config).unwrap()),
            config: Arc::new(config),
        })
    }

    #[tokio::test]
    async fn unconfigured_gateway_is_alive_but_flags_missing_settings() {
        let Json(report) = get_health(State(state(Config::default()))).await;
        assert_eq!(report.status, "ok");
        assert_eq!(report.version, env!("CARGO_PKG_VERSION"));
        assert!(!report.provider_configured);
        assert!(!report.auth_configured);
    }

    #[tokio::test]
    async fn configured_gateway_reports_ready() {
        let config = Config {
            provider_api_key: Some("sk-test".into()),
            auth_url: Some("http://127.0.0.1:9".into()),
            ..Config::default()
        };
        let Json(report) = get_health(State(state(config))).await;
        assert!(report.provider_configured);
        assert!(report.auth_configured);
    }
}
