//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `MEDUSA_PUBLISHABLE_KEY` - Publishable API key sent with every Store API request
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `STOREFRONT_BASE_URL` - Public URL for the storefront (default: http://localhost:3000)
//! - `MEDUSA_BACKEND_URL` - Commerce backend base URL (default: http://localhost:9000)
//! - `MEDIA_BASE_URL` - Base for relative media paths (falls back to the backend URL)
//! - `MEDUSA_CACHE_TTL_SECS` - Catalog cache lifetime (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_BACKEND_URL: &str = "http://localhost:9000";
const DEFAULT_CACHE_TTL_SECS: u64 = 300;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Public base URL for the storefront
    pub base_url: String,
    /// Commerce backend configuration
    pub medusa: MedusaConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    pub sentry_environment: Option<String>,
    pub sentry_sample_rate: f32,
    pub sentry_traces_sample_rate: f32,
}

/// Commerce backend (Medusa Store API) configuration.
///
/// Implements `Debug` manually so the key never lands in logs verbatim.
#[derive(Clone)]
pub struct MedusaConfig {
    /// Backend base URL without trailing slash
    pub backend_url: String,
    /// Publishable API key (scopes requests to a sales channel)
    pub publishable_key: String,
    /// Base for relative media paths
    pub media_base_url: Option<String>,
    /// How long catalog responses stay cached
    pub cache_ttl: Duration,
}

impl std::fmt::Debug for MedusaConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MedusaConfig")
            .field("backend_url", &self.backend_url)
            .field("publishable_key", &redact(&self.publishable_key))
            .field("media_base_url", &self.media_base_url)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}

impl MedusaConfig {
    /// Config pointing at `backend_url` with default cache settings.
    #[must_use]
    pub fn new(backend_url: &str, publishable_key: &str) -> Self {
        Self {
            backend_url: backend_url.trim_end_matches('/').to_string(),
            publishable_key: publishable_key.to_string(),
            media_base_url: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
        }
    }
}

impl StorefrontConfig {
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

        Self::from_lookup(&|key: &str| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_lookup(vars: Lookup<'_>) -> Result<Self, ConfigError> {
        let host = get_env_or_default(vars, "STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = get_env_or_default(vars, "STOREFRONT_PORT", "3000")
            .parse::<u16>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_PORT".to_string(), e.to_string())
            })?;
        let base_url = get_url(vars, "STOREFRONT_BASE_URL", Some("http://localhost:3000"))?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            base_url,
            medusa: MedusaConfig::from_lookup(vars)?,
            sentry_dsn: get_optional_env(vars, "SENTRY_DSN"),
            sentry_environment: get_optional_env(vars, "SENTRY_ENVIRONMENT"),
            sentry_sample_rate: get_rate(vars, "SENTRY_SAMPLE_RATE", 1.0)?,
            sentry_traces_sample_rate: get_rate(vars, "SENTRY_TRACES_SAMPLE_RATE", 0.0)?,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether cookies should carry the `Secure` flag.
    #[must_use]
    pub fn is_secure(&self) -> bool {
        self.base_url.starts_with("https://")
    }
}

impl MedusaConfig {
    fn from_lookup(vars: Lookup<'_>) -> Result<Self, ConfigError> {
        let backend_url = get_url(vars, "MEDUSA_BACKEND_URL", Some(DEFAULT_BACKEND_URL))?
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string());
        let cache_ttl = get_env_or_default(
            vars,
            "MEDUSA_CACHE_TTL_SECS",
            &DEFAULT_CACHE_TTL_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar("MEDUSA_CACHE_TTL_SECS".to_string(), e.to_string()))?;

        Ok(Self {
            backend_url,
            publishable_key: get_required_env(vars, "MEDUSA_PUBLISHABLE_KEY")?,
            media_base_url: get_url(vars, "MEDIA_BASE_URL", None)?,
            cache_ttl: Duration::from_secs(cache_ttl),
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Environment variable lookup.
pub type Lookup<'a> = &'a dyn Fn(&str) -> Option<String>;

/// Get a required, non-blank environment variable.
fn get_required_env(vars: Lookup<'_>, key: &str) -> Result<String, ConfigError> {
    get_optional_env(vars, key).ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable. Blank values count as unset.
fn get_optional_env(vars: Lookup<'_>, key: &str) -> Option<String> {
    vars(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(vars: Lookup<'_>, key: &str, default: &str) -> String {
    get_optional_env(vars, key).unwrap_or_else(|| default.to_string())
}

/// Get an absolute http(s) URL, returned without trailing slashes.
fn get_url(vars: Lookup<'_>, key: &str, default: Option<&str>) -> Result<Option<String>, ConfigError> {
    let Some(raw) = get_optional_env(vars, key).or_else(|| default.map(String::from)) else {
        return Ok(None);
    };

    let parsed = Url::parse(&raw)
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", parsed.scheme()),
        ));
    }

    Ok(Some(raw.trim_end_matches('/').to_string()))
}

/// Get a sampling rate between 0.0 and 1.0.
fn get_rate(vars: Lookup<'_>, key: &str, default: f32) -> Result<f32, ConfigError> {
    let Some(raw) = get_optional_env(vars, key) else {
        return Ok(default);
    };
    let rate = raw
        .parse::<f32>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if (0.0..=1.0).contains(&rate) {
        Ok(rate)
    } else {
        Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            "must be between 0.0 and 1.0".to_string(),
        ))
    }
}

fn redact(value: &str) -> String {
    let visible: String = value.chars().take(6).collect();
    if value.chars().count() > 6 {
        format!("{visible}…[REDACTED]")
    } else {
        "[REDACTED]".to_string()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(pairs: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(&move |key: &str| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[("MEDUSA_PUBLISHABLE_KEY", "pk_test_123")]).unwrap();

        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:3000");
        assert_eq!(config.base_url, "http://localhost:3000");
        assert_eq!(config.medusa.backend_url, "http://localhost:9000");
        assert_eq!(config.medusa.cache_ttl, Duration::from_secs(300));
        assert!(config.medusa.media_base_url.is_none());
        assert!(config.sentry_dsn.is_none());
        assert!(!config.is_secure());
    }

    #[test]
    fn test_missing_publishable_key() {
        let err = load(&[]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "MEDUSA_PUBLISHABLE_KEY"));
    }

    #[test]
    fn test_blank_publishable_key_is_missing() {
        let err = load(&[("MEDUSA_PUBLISHABLE_KEY", "   ")]).unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)));
    }

    #[test]
    fn test_trailing_slashes_trimmed() {
        let config = load(&[
            ("MEDUSA_PUBLISHABLE_KEY", "pk"),
            ("MEDUSA_BACKEND_URL", "https://api.example.com//"),
            ("MEDIA_BASE_URL", "https://media.example.com/"),
        ])
        .unwrap();

        assert_eq!(config.medusa.backend_url, "https://api.example.com");
        assert_eq!(
            config.medusa.media_base_url.as_deref(),
            Some("https://media.example.com")
        );
    }

    #[test]
    fn test_invalid_values() {
        assert!(matches!(
            load(&[("MEDUSA_PUBLISHABLE_KEY", "pk"), ("STOREFRONT_PORT", "http")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("MEDUSA_PUBLISHABLE_KEY", "pk"), ("MEDUSA_BACKEND_URL", "ftp://x")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
        assert!(matches!(
            load(&[("MEDUSA_PUBLISHABLE_KEY", "pk"), ("SENTRY_SAMPLE_RATE", "2")]),
            Err(ConfigError::InvalidEnvVar(_, _))
        ));
    }

    #[test]
    fn test_https_base_url_is_secure() {
        let config = load(&[
            ("MEDUSA_PUBLISHABLE_KEY", "pk"),
            ("STOREFRONT_BASE_URL", "https://shop.example.com"),
        ])
        .unwrap();
        assert!(config.is_secure());
    }

    #[test]
    fn test_medusa_config_debug_redacts_key() {
        let config = MedusaConfig::new("http://localhost:9000/", "pk_01HSECRETVALUE");
        let debug_output = format!("{config:?}");

        assert!(debug_output.contains("http://localhost:9000"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("pk_01HSECRETVALUE"));
    }
}
