//! Server configuration, loaded from environment variables at startup.

use std::time::Duration;

use clap::Parser;

/// Default upstream chat-completion endpoint.
pub const DEFAULT_PROVIDER_URL: &str = "https://ai.gateway.lovable.dev/v1/chat/completions";

/// Default model id sent upstream.
pub const DEFAULT_PROVIDER_MODEL: &str = "google/gemini-3-flash-preview";

/// Runtime configuration for tutor-server.
///
/// Every field has a default so the server starts without any environment
/// variables set. The provider key and identity service are optional at
/// startup; requests that need them fail with a 500 until they are set.
#[derive(Debug, Clone)]
pub struct Config {
    /// TCP address to bind (default: `"0.0.0.0:3000"`).
    pub bind_address: String,

    /// `tracing` filter string, e.g. `"info"` or `"debug,tower_http=warn"`.
    pub log_level: String,

    /// When `true`, emit log records as newline-delimited JSON.
    pub log_json: bool,

    /// Directory for daily-rotated log files, in addition to stdout.
    pub log_dir: Option<String>,

    /// Comma-separated CORS allow-list. `None` allows any origin.
    pub cors_allowed_origins: Option<String>,

    /// Upstream chat-completion endpoint (OpenAI-compatible, streaming).
    pub provider_url: String,

    /// Server-held provider credential. Never sent to clients or logged.
    pub provider_api_key: Option<String>,

    /// Model id sent upstream.
    pub provider_model: String,

    /// Base URL of the hosted identity service, e.g. `https://xyz.supabase.co`.
    pub auth_url: Option<String>,

    /// Project key sent as `apikey` to the identity service.
    pub auth_api_key: Option<String>,

    /// Upstream TCP/TLS connect timeout.
    pub connect_timeout: Duration,

    /// Time allowed until the upstream response headers arrive.
    pub response_timeout: Duration,

    /// Serve the OpenAPI document at `/api-docs/openapi.json`.
    pub enable_api_docs: bool,
}

impl Config {
    /// Build [`Config`] from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        Self {
            bind_address: env_or("TUTOR_BIND", "0.0.0.0:3000"),
            log_level: env_or("TUTOR_LOG", "info"),
            log_json: env_flag("TUTOR_LOG_JSON", false),
            log_dir: env_opt("TUTOR_LOG_DIR"),
            cors_allowed_origins: env_opt("TUTOR_CORS_ORIGINS"),
            provider_url: env_or("TUTOR_PROVIDER_URL", DEFAULT_PROVIDER_URL),
            provider_api_key: env_opt("TUTOR_PROVIDER_API_KEY"),
            provider_model: env_or("TUTOR_PROVIDER_MODEL", DEFAULT_PROVIDER_MODEL),
            auth_url: env_opt("TUTOR_AUTH_URL"),
            auth_api_key: env_opt("TUTOR_AUTH_API_KEY"),
            connect_timeout: Duration::from_secs(parse_env("TUTOR_CONNECT_TIMEOUT_SECS", 10)),
            response_timeout: Duration::from_secs(parse_env("TUTOR_RESPONSE_TIMEOUT_SECS", 60)),
            enable_api_docs: env_flag("TUTOR_ENABLE_API_DOCS", true),
        }
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_cli(mut self, cli: Cli) -> Self {
        if let Some(bind) = cli.bind {
            self.bind_address = bind;
        }
        if let Some(level) = cli.log {
            self.log_level = level;
        }
        if cli.log_json {
            self.log_json = true;
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".into(),
            log_level: "info".into(),
            log_json: false,
            log_dir: None,
            cors_allowed_origins: None,
            provider_url: DEFAULT_PROVIDER_URL.into(),
            provider_api_key: None,
            provider_model: DEFAULT_PROVIDER_MODEL.into(),
            auth_url: None,
            auth_api_key: None,
            connect_timeout: Duration::from_secs(10),
            response_timeout: Duration::from_secs(60),
            enable_api_docs: true,
        }
    }
}

/// Command-line overrides. Everything else comes from the environment.
#[derive(Debug, Default, Parser)]
#[command(name = "tutor-server", version, about = "AI tutor chat relay")]
pub struct Cli {
    /// Address to listen on (overrides TUTOR_BIND).
    #[arg(long)]
    pub bind: Option<String>,

    /// Tracing filter (overrides TUTOR_LOG).
    #[arg(long)]
    pub log: Option<String>,

    /// Emit JSON log lines.
    #[arg(long)]
    pub log_json: bool,
}

// ── private helpers ──────────────────────────────────────────────────────────

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn env_flag(key: &str, default: bool) -> bool {
    std::env::var(key)
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(default)
}

fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
