//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `BOOKSTORE_API_BASE` - API base URL (default: `http://localhost:8080/api/v1`)
//! - `BOOKSTORE_DATA_DIR` - Directory for durable client state (default: `.bookstore`)
//! - `BOOKSTORE_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: transport default)
//! - `BOOKSTORE_USER_AGENT` - `User-Agent` header sent with every request

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Default API base URL.
pub const DEFAULT_API_BASE: &str = "http://localhost:8080/api/v1";

/// Default directory for durable client state.
pub const DEFAULT_DATA_DIR: &str = ".bookstore";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Bookstore client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API base URL without a trailing slash
    pub api_base: String,
    /// Directory holding durable client state
    pub data_dir: PathBuf,
    /// Per-request timeout; `None` keeps the transport default
    pub timeout: Option<Duration>,
    /// `User-Agent` header override
    pub user_agent: Option<String>,
}

impl ClientConfig {
    /// Configuration for the given API base URL with defaults elsewhere.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `api_base` is not an absolute
    /// http(s) URL.
    pub fn new(api_base: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            api_base: normalize_api_base("BOOKSTORE_API_BASE", api_base)?,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            timeout: None,
            user_agent: None,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is set to an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let api_base = normalize_api_base(
            "BOOKSTORE_API_BASE",
            &get_env_or_default("BOOKSTORE_API_BASE", DEFAULT_API_BASE),
        )?;
        let data_dir = PathBuf::from(get_env_or_default("BOOKSTORE_DATA_DIR", DEFAULT_DATA_DIR));
        let timeout = get_optional_env("BOOKSTORE_HTTP_TIMEOUT_SECS")
            .map(|raw| parse_timeout("BOOKSTORE_HTTP_TIMEOUT_SECS", &raw))
            .transpose()?;
        let user_agent = get_optional_env("BOOKSTORE_USER_AGENT");

        Ok(Self {
            api_base,
            data_dir,
            timeout,
            user_agent,
        })
    }

    /// Set the durable state directory.
    #[must_use]
    pub fn with_data_dir(mut self, data_dir: impl Into<PathBuf>) -> Self {
        self.data_dir = data_dir.into();
        self
    }

    /// Set the per-request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Full URL for an API path such as `/books`.
    #[must_use]
    pub fn url_for(&self, path: &str) -> String {
        format!("{}{path}", self.api_base.trim_end_matches('/'))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating empty values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Validate an API base URL and strip any trailing slash.
fn normalize_api_base(key: &str, raw: &str) -> Result<String, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme `{}`", url.scheme()),
        ));
    }
    Ok(url.as_str().trim_end_matches('/').to_string())
}

fn parse_timeout(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    match raw.trim().parse::<u64>() {
        Ok(0) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "timeout must be positive".to_string(),
        )),
        Ok(secs) => Ok(Duration::from_secs(secs)),
        Err(e) => Err(ConfigError::InvalidEnvVar(key.to_string(), e.to_string())),
    }
}
