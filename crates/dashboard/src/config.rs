//! Dashboard configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `SG_COMMERCE_API_URL` - Base URL of the commerce API (subscriptions, orders, ...)
//!
//! ## Optional
//! - `SG_COMMERCE_SYNC_URL` - Sync trigger endpoint (default: `{SG_COMMERCE_API_URL}/sync`)
//! - `SG_COMMERCE_API_KEY` - Key sent as `apikey` and bearer token to the commerce API
//! - `SG_HTTP_TIMEOUT_SECS` - Request timeout in seconds (default: 30)
//! - `SG_QUERY_RETRIES` - Extra attempts for a failing query (default: 2)
//! - `SG_STORAGE_PATH` - Local key-value file (default: `.streetgasm/storage.json`)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//!
//! ## Optional (auxiliary store - enables preferences, favorites, approvals)
//! - `SG_AUX_URL` - Auxiliary store project URL
//! - `SG_AUX_ANON_KEY` - Auxiliary store anonymous key

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: &str = "30";
const DEFAULT_QUERY_RETRIES: &str = "2";
const DEFAULT_STORAGE_PATH: &str = ".streetgasm/storage.json";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Dashboard configuration.
#[derive(Debug, Clone)]
pub struct DashboardConfig {
    pub commerce: CommerceConfig,
    /// `None` when the auxiliary store is not configured.
    pub aux_store: Option<AuxStoreConfig>,
    /// Extra attempts after a failed query.
    pub query_retries: u32,
    /// Path of the local key-value file.
    pub storage_path: PathBuf,
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
}

/// Commerce API configuration.
///
/// Implements `Debug` manually to redact the API key.
#[derive(Clone)]
pub struct CommerceConfig {
    /// Base URL, without trailing slash
    pub api_url: Url,
    /// Sync trigger endpoint
    pub sync_url: Url,
    pub api_key: Option<SecretString>,
    pub timeout: Duration,
}

impl std::fmt::Debug for CommerceConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommerceConfig")
            .field("api_url", &self.api_url.as_str())
            .field("sync_url", &self.sync_url.as_str())
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl CommerceConfig {
    /// Configuration for `api_url` with the default sync URL, no key and a
    /// 30 second timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse.
    pub fn new(api_url: &str) -> Result<Self, ConfigError> {
        let api_url = parse_url("SG_COMMERCE_API_URL", api_url)?;
        let sync_url = default_sync_url(&api_url)?;
        Ok(Self {
            api_url,
            sync_url,
            api_key: None,
            timeout: Duration::from_secs(30),
        })
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(api_key.into()));
        self
    }

    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn from_env() -> Result<Self, ConfigError> {
        let api_url = parse_url(
            "SG_COMMERCE_API_URL",
            &get_required_env("SG_COMMERCE_API_URL")?,
        )?;
        let sync_url = match get_optional_env("SG_COMMERCE_SYNC_URL") {
            Some(raw) => parse_url("SG_COMMERCE_SYNC_URL", &raw)?,
            None => default_sync_url(&api_url)?,
        };
        let timeout_secs = get_env_or_default("SG_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS)
            .parse::<u64>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SG_HTTP_TIMEOUT_SECS".to_string(), e.to_string())
            })?;

        Ok(Self {
            api_url,
            sync_url,
            api_key: get_optional_env("SG_COMMERCE_API_KEY").map(SecretString::from),
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Auxiliary store (`PostgREST`) configuration.
///
/// Implements `Debug` manually to redact the anonymous key.
#[derive(Clone)]
pub struct AuxStoreConfig {
    pub url: Url,
    pub anon_key: SecretString,
}

impl std::fmt::Debug for AuxStoreConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuxStoreConfig")
            .field("url", &self.url.as_str())
            .field("anon_key", &"[REDACTED]")
            .finish()
    }
}

impl AuxStoreConfig {
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if the URL does not parse.
    pub fn new(url: &str, anon_key: impl Into<String>) -> Result<Self, ConfigError> {
        Ok(Self {
            url: parse_url("SG_AUX_URL", url)?,
            anon_key: SecretString::from(anon_key.into()),
        })
    }

    fn from_env() -> Result<Option<Self>, ConfigError> {
        let url = get_optional_env("SG_AUX_URL");
        let anon_key = get_optional_env("SG_AUX_ANON_KEY");

        match (url, anon_key) {
            (Some(url), Some(key)) => Self::new(&url, key).map(Some),
            (None, None) => Ok(None),
            _ => Err(ConfigError::InvalidEnvVar(
                "SG_AUX_*".to_string(),
                "Both SG_AUX_URL and SG_AUX_ANON_KEY must be set together".to_string(),
            )),
        }
    }
}

impl DashboardConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let commerce = CommerceConfig::from_env()?;
        let aux_store = AuxStoreConfig::from_env()?;
        let query_retries = get_env_or_default("SG_QUERY_RETRIES", DEFAULT_QUERY_RETRIES)
            .parse::<u32>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("SG_QUERY_RETRIES".to_string(), e.to_string())
            })?;

        Ok(Self {
            commerce,
            aux_store,
            query_retries,
            storage_path: PathBuf::from(get_env_or_default(
                "SG_STORAGE_PATH",
                DEFAULT_STORAGE_PATH,
            )),
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Get the auxiliary store config if configured.
    #[must_use]
    pub const fn aux_store(&self) -> Option<&AuxStoreConfig> {
        self.aux_store.as_ref()
    }
}

/// Parse a base URL, dropping any trailing slash from its path.
fn parse_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "URL cannot be used as a base".to_string(),
        ));
    }
    let trimmed = url.path().trim_end_matches('/').to_string();
    url.set_path(&trimmed);
    Ok(url)
}

fn default_sync_url(api_url: &Url) -> Result<Url, ConfigError> {
    let raw = format!("{}/sync", api_url.as_str().trim_end_matches('/'));
    parse_url("SG_COMMERCE_SYNC_URL", &raw)
}

fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}
