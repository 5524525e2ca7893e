//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All optional:
//! - `TALENT_OPS_API_URL` - API base URL (default: `http://localhost:8081/api/v1`)
//! - `TALENT_OPS_WS_URL` - Realtime endpoint (default: API URL with a `ws`/`wss`
//!   scheme and `/ws` appended to its path)
//! - `TALENT_OPS_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `TALENT_OPS_RECONNECT_DELAY_MS` - Delay between realtime reconnects (default: 3000)
//! - `TALENT_OPS_MAX_RECONNECT_ATTEMPTS` - Reconnects before giving up (default: 5)
//! - `TALENT_OPS_STORAGE_PATH` - Durable storage file (default:
//!   `<data dir>/talent-ops/storage.json`)
//! - `TALENT_OPS_FALLBACK_ROLE` - Role applied when no role was persisted
//!   (default: none, so every permission check fails)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `TALENT_OPS_LOG_JSON` - Emit JSON logs when set to `1` or `true`

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:8081/api/v1";
const DEFAULT_REQUEST_TIMEOUT_SECS: &str = "10";
const DEFAULT_RECONNECT_DELAY_MS: &str = "3000";
const DEFAULT_MAX_RECONNECT_ATTEMPTS: &str = "5";
const STORAGE_DIR: &str = "talent-ops";
const STORAGE_FILE: &str = "storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Realtime reconnect behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Fixed delay before every reconnect attempt
    pub delay: Duration,
    /// Attempts after which the channel gives up
    pub max_attempts: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(3),
            max_attempts: 5,
        }
    }
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every API path is joined onto
    pub api_url: Url,
    /// Realtime WebSocket endpoint
    pub ws_url: Url,
    /// Timeout applied to every HTTP request
    pub request_timeout: Duration,
    /// Realtime reconnect policy
    pub reconnect: ReconnectConfig,
    /// Durable key/value storage file
    pub storage_path: PathBuf,
    /// Role code applied when storage holds none
    pub fallback_role: Option<String>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "development", "production")
    pub sentry_environment: Option<String>,
    /// Emit JSON logs instead of text
    pub log_json: bool,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set but cannot be parsed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = Env(lookup);

        let api_url = parse_url("TALENT_OPS_API_URL", &env.or_default("TALENT_OPS_API_URL", DEFAULT_API_URL))?;
        let ws_url = match env.optional("TALENT_OPS_WS_URL") {
            Some(raw) => parse_url("TALENT_OPS_WS_URL", &raw)?,
            None => derive_ws_url(&api_url)?,
        };

        let timeout_secs = parse_number::<u64>(
            "TALENT_OPS_REQUEST_TIMEOUT_SECS",
            &env.or_default("TALENT_OPS_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
        )?;
        let delay_ms = parse_number::<u64>(
            "TALENT_OPS_RECONNECT_DELAY_MS",
            &env.or_default("TALENT_OPS_RECONNECT_DELAY_MS", DEFAULT_RECONNECT_DELAY_MS),
        )?;
        let max_attempts = parse_number::<u32>(
            "TALENT_OPS_MAX_RECONNECT_ATTEMPTS",
            &env.or_default("TALENT_OPS_MAX_RECONNECT_ATTEMPTS", DEFAULT_MAX_RECONNECT_ATTEMPTS),
        )?;

        let storage_path = match env.optional("TALENT_OPS_STORAGE_PATH") {
            Some(path) => PathBuf::from(path),
            None => default_storage_path()?,
        };

        Ok(Self {
            api_url,
            ws_url,
            request_timeout: Duration::from_secs(timeout_secs),
            reconnect: ReconnectConfig {
                delay: Duration::from_millis(delay_ms),
                max_attempts,
            },
            storage_path,
            fallback_role: env.optional("TALENT_OPS_FALLBACK_ROLE"),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
            log_json: env
                .optional("TALENT_OPS_LOG_JSON")
                .is_some_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        })
    }

    /// Configuration pointing at `api_url` with every other value defaulted
    /// and storage under `storage_path`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the URL cannot be parsed or has no WebSocket
    /// equivalent.
    pub fn for_api(api_url: &str, storage_path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let api_url = parse_url("api_url", api_url)?;
        let ws_url = derive_ws_url(&api_url)?;
        Ok(Self {
            api_url,
            ws_url,
            request_timeout: Duration::from_secs(10),
            reconnect: ReconnectConfig::default(),
            storage_path: storage_path.into(),
            fallback_role: None,
            sentry_dsn: None,
            sentry_environment: None,
            log_json: false,
        })
    }
}

struct Env<F>(F);

impl<F: Fn(&str) -> Option<String>> Env<F> {
    /// Get an optional variable. Empty values count as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|value| !value.trim().is_empty())
    }

    /// Get a variable with a default value.
    fn or_default(&self, key: &str, default: &str) -> String {
        self.optional(key).unwrap_or_else(|| default.to_string())
    }
}

fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

fn parse_number<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// `http(s)://host/api/v1` becomes `ws(s)://host/api/v1/ws`.
fn derive_ws_url(api_url: &Url) -> Result<Url, ConfigError> {
    let scheme = match api_url.scheme() {
        "https" => "wss",
        "http" => "ws",
        other => {
            return Err(ConfigError::InvalidEnvVar(
                "TALENT_OPS_API_URL".to_string(),
                format!("unsupported scheme {other}, cannot derive TALENT_OPS_WS_URL"),
            ));
        }
    };
    let mut ws_url = api_url.clone();
    ws_url.set_scheme(scheme).map_err(|()| {
        ConfigError::InvalidEnvVar("TALENT_OPS_WS_URL".to_string(), format!("cannot use scheme {scheme}"))
    })?;
    let path = format!("{}/ws", api_url.path().trim_end_matches('/'));
    ws_url.set_path(&path);
    ws_url.set_query(None);
    Ok(ws_url)
}

fn default_storage_path() -> Result<PathBuf, ConfigError> {
    dirs::data_dir()
        .map(|dir| dir.join(STORAGE_DIR).join(STORAGE_FILE))
        .ok_or_else(|| ConfigError::MissingEnvVar("TALENT_OPS_STORAGE_PATH".to_string()))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(vars: &[(&str, &str)]) -> Result<ClientConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        ClientConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[("TALENT_OPS_STORAGE_PATH", "/tmp/tops.json")]).unwrap();
        assert_eq!(config.api_url.as_str(), DEFAULT_API_URL);
        assert_eq!(config.ws_url.as_str(), "ws://localhost:8081/api/v1/ws");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.reconnect, ReconnectConfig::default());
        assert!(config.fallback_role.is_none());
        assert!(!config.log_json);
    }

    #[test]
    fn test_https_derives_wss() {
        let config = config_from(&[
            ("TALENT_OPS_API_URL", "https://talent.example.com/api/v1/"),
            ("TALENT_OPS_STORAGE_PATH", "/tmp/tops.json"),
        ])
        .unwrap();
        assert_eq!(config.ws_url.as_str(), "wss://talent.example.com/api/v1/ws");
    }

    #[test]
    fn test_explicit_ws_url_wins() {
        let config = config_from(&[
            ("TALENT_OPS_WS_URL", "ws://realtime.internal:9000/socket"),
            ("TALENT_OPS_STORAGE_PATH", "/tmp/tops.json"),
        ])
        .unwrap();
        assert_eq!(config.ws_url.as_str(), "ws://realtime.internal:9000/socket");
    }

    #[test]
    fn test_invalid_number_is_rejected() {
        let err = config_from(&[
            ("TALENT_OPS_MAX_RECONNECT_ATTEMPTS", "many"),
            ("TALENT_OPS_STORAGE_PATH", "/tmp/tops.json"),
        ])
        .unwrap_err();
        assert!(
            matches!(err, ConfigError::InvalidEnvVar(ref key, _) if key == "TALENT_OPS_MAX_RECONNECT_ATTEMPTS")
        );
    }

    #[test]
    fn test_fallback_role_and_json_logs() {
        let config = config_from(&[
            ("TALENT_OPS_FALLBACK_ROLE", "viewer"),
            ("TALENT_OPS_LOG_JSON", "true"),
            ("TALENT_OPS_STORAGE_PATH", "/tmp/tops.json"),
        ])
        .unwrap();
        assert_eq!(config.fallback_role.as_deref(), Some("viewer"));
        assert!(config.log_json);
    }

    #[test]
    fn test_for_api() {
        let config = ClientConfig::for_api("http://127.0.0.1:4000/api/v1", "/tmp/x.json").unwrap();
        assert_eq!(config.ws_url.as_str(), "ws://127.0.0.1:4000/api/v1/ws");
    }
}
