//! Process configuration.
//!
//! Everything is resolved once from `PHISHGUARD_*` environment variables
//! at startup and passed explicitly into the component constructors, so
//! no pipeline code performs ambient lookups and every component can be
//! substituted with a test double.

/// Default model for text-only classification (the cheaper variant).
const DEFAULT_TEXT_MODEL: &str = "google/gemini-2.5-flash";

/// Default model when an audio payload is attached (higher capability).
const DEFAULT_AUDIO_MODEL: &str = "google/gemini-2.5-pro";

/// Default rate limit: 60 requests per minute per IP.
const DEFAULT_RATE_LIMIT: u64 = 60;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),
}

/// Resolved process configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Chat-completions endpoint of the AI gateway.
    pub ai_url: String,
    /// Bearer key for the AI gateway.
    pub ai_key: String,
    pub text_model: String,
    pub audio_model: String,
    /// Base URL of the storage REST gateway.
    pub db_url: String,
    /// Service/anon API key for the storage and auth gateways.
    pub db_key: String,
    /// Base URL of the auth service. Defaults to `db_url` (managed
    /// backends expose both on one host).
    pub auth_url: String,
    /// Requests per minute per IP.
    pub rate_limit: u64,
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .ok_or(ConfigError::Missing(name))
}

fn optional(name: &str, default: &str) -> String {
    std::env::var(name)
        .ok()
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let db_url = required("PHISHGUARD_DB_URL")?;
        Ok(Self {
            ai_url: required("PHISHGUARD_AI_URL")?,
            ai_key: required("PHISHGUARD_AI_KEY")?,
            text_model: optional("PHISHGUARD_TEXT_MODEL", DEFAULT_TEXT_MODEL),
            audio_model: optional("PHISHGUARD_AUDIO_MODEL", DEFAULT_AUDIO_MODEL),
            auth_url: optional("PHISHGUARD_AUTH_URL", &db_url),
            db_key: required("PHISHGUARD_DB_KEY")?,
            db_url,
            rate_limit: std::env::var("PHISHGUARD_RATE_LIMIT")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(DEFAULT_RATE_LIMIT),
        })
    }
}
