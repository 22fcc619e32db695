use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingVar(String),
    #[error("Invalid value for environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub google_api_key: String,
    pub live_model: String,
    pub live_voice: String,
    pub live_api_host: String,
    pub log_level: Level,
    pub prompts_path: PathBuf,
    pub glossary_path: PathBuf,
    pub keepalive_interval: Duration,
    pub handshake_timeout: Duration,
}

impl Config {
    /// Loads configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:8000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let google_api_key = std::env::var("GOOGLE_API_KEY")
            .or_else(|_| std::env::var("GEMINI_API_KEY"))
            .map_err(|_| ConfigError::MissingVar("GOOGLE_API_KEY".to_string()))?;

        let live_model = std::env::var("LIVE_MODEL")
            .unwrap_or_else(|_| "gemini-2.5-flash-native-audio-preview-12-2025".to_string());
        let live_voice = std::env::var("LIVE_VOICE").unwrap_or_else(|_| "Kore".to_string());
        let live_api_host = std::env::var("LIVE_API_HOST")
            .unwrap_or_else(|_| "generativelanguage.googleapis.com".to_string());

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let prompts_path = std::env::var("PROMPTS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./prompts"));
        let glossary_path = std::env::var("GLOSSARY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data/glossary.json"));

        let keepalive_interval = secs_from_env("KEEPALIVE_INTERVAL_SECS", 15)?;
        let handshake_timeout = secs_from_env("HANDSHAKE_TIMEOUT_SECS", 10)?;

        Ok(Self {
            bind_address,
            google_api_key,
            live_model,
            live_voice,
            live_api_host,
            log_level,
            prompts_path,
            glossary_path,
            keepalive_interval,
            handshake_timeout,
        })
    }
}

/// Reads a positive number of seconds, falling back to `default` when unset.
fn secs_from_env(var: &str, default: u64) -> Result<Duration, ConfigError> {
    let Ok(raw) = std::env::var(var) else {
        return Ok(Duration::from_secs(default));
    };
    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 => Ok(Duration::from_secs(secs)),
        _ => Err(ConfigError::InvalidValue(
            var.to_string(),
            format!("'{}' is not a positive number of seconds", raw),
        )),
    }
}
