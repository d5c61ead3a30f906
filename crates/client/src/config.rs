//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Optional
//! - `SHOPFRONT_BACKEND_URL` - Base URL of the store backend (default: `http://127.0.0.1:8000/`)
//! - `SHOPFRONT_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 10)
//! - `SHOPFRONT_AUTH_SCHEME` - Authorization header scheme (default: `JWT`)
//! - `SHOPFRONT_STORAGE_PATH` - Durable client storage file (default: `.shopfront/storage.json`)
//! - `SHOPFRONT_SITE_URL` - Public origin used for checkout callbacks (default: `http://localhost:5173`)
//! - `SHOPFRONT_CHECKOUT_URL` - Payment-session endpoint; checkout is disabled when unset
//! - `SHOPFRONT_CHECKOUT_KEY` - Bearer key for the payment-session endpoint (required with the URL)
//! - `SENTRY_DSN` - Sentry error tracking DSN

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000/";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_AUTH_SCHEME: &str = "JWT";
const DEFAULT_STORAGE_PATH: &str = ".shopfront/storage.json";
const DEFAULT_SITE_URL: &str = "http://localhost:5173";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Storefront client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend base URL, always ending in `/` so relative paths join under it
    pub backend_url: Url,
    /// Upper bound on every backend request
    pub request_timeout: Duration,
    /// Scheme placed before the access token in the `Authorization` header
    pub auth_scheme: String,
    /// Location of the durable key/value storage file
    pub storage_path: PathBuf,
    /// Origin the checkout success/cancel callbacks return to
    pub site_url: Url,
    /// Hosted checkout configuration, if enabled
    pub checkout: Option<CheckoutConfig>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
}

/// Payment-session endpoint configuration.
///
/// Implements `Debug` manually to redact the key.
#[derive(Clone)]
pub struct CheckoutConfig {
    /// Payment-session creation endpoint
    pub endpoint: Url,
    /// Bearer key sent to the endpoint
    pub api_key: SecretString,
}

impl std::fmt::Debug for CheckoutConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckoutConfig")
            .field("endpoint", &self.endpoint.as_str())
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but malformed, or if
    /// the checkout endpoint is set without its key.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Same as [`ClientConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let backend_url = parse_base_url(
            "SHOPFRONT_BACKEND_URL",
            &get("SHOPFRONT_BACKEND_URL", DEFAULT_BACKEND_URL),
        )?;
        let timeout_secs = get(
            "SHOPFRONT_REQUEST_TIMEOUT_SECS",
            &DEFAULT_TIMEOUT_SECS.to_string(),
        )
        .parse::<u64>()
        .map_err(|e| {
            ConfigError::InvalidEnvVar("SHOPFRONT_REQUEST_TIMEOUT_SECS".to_string(), e.to_string())
        })?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "SHOPFRONT_REQUEST_TIMEOUT_SECS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }
        let site_url = parse_url("SHOPFRONT_SITE_URL", &get("SHOPFRONT_SITE_URL", DEFAULT_SITE_URL))?;

        let checkout = match lookup("SHOPFRONT_CHECKOUT_URL") {
            Some(endpoint) => Some(CheckoutConfig {
                endpoint: parse_url("SHOPFRONT_CHECKOUT_URL", &endpoint)?,
                api_key: lookup("SHOPFRONT_CHECKOUT_KEY")
                    .map(SecretString::from)
                    .ok_or_else(|| ConfigError::MissingEnvVar("SHOPFRONT_CHECKOUT_KEY".to_string()))?,
            }),
            None => None,
        };

        Ok(Self {
            backend_url,
            request_timeout: Duration::from_secs(timeout_secs),
            auth_scheme: get("SHOPFRONT_AUTH_SCHEME", DEFAULT_AUTH_SCHEME),
            storage_path: PathBuf::from(get("SHOPFRONT_STORAGE_PATH", DEFAULT_STORAGE_PATH)),
            site_url,
            checkout,
            sentry_dsn: lookup("SENTRY_DSN"),
        })
    }

    /// Default configuration pointed at an explicit backend.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if `backend_url` is not a valid URL.
    pub fn for_backend(backend_url: &str) -> Result<Self, ConfigError> {
        let mut config = Self::from_lookup(|_| None)?;
        config.backend_url = parse_base_url("SHOPFRONT_BACKEND_URL", backend_url)?;
        Ok(config)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    Url::parse(value).map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a base URL, appending a trailing slash so `Url::join` keeps the path.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = parse_url(key, value)?;
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = ClientConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.backend_url.as_str(), "http://127.0.0.1:8000/");
        assert_eq!(config.request_timeout, Duration::from_secs(10));
        assert_eq!(config.auth_scheme, "JWT");
        assert!(config.checkout.is_none());
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_backend_url_gets_trailing_slash() {
        let config =
            ClientConfig::from_lookup(lookup_from(&[("SHOPFRONT_BACKEND_URL", "https://api.shop.test/v1")]))
                .unwrap();
        assert_eq!(config.backend_url.as_str(), "https://api.shop.test/v1/");
        assert_eq!(
            config.backend_url.join("store/carts/").unwrap().as_str(),
            "https://api.shop.test/v1/store/carts/"
        );
    }

    #[test]
    fn test_invalid_timeout() {
        let err = ClientConfig::from_lookup(lookup_from(&[("SHOPFRONT_REQUEST_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(ref k, _) if k == "SHOPFRONT_REQUEST_TIMEOUT_SECS"));

        let err = ClientConfig::from_lookup(lookup_from(&[("SHOPFRONT_REQUEST_TIMEOUT_SECS", "0")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidEnvVar(_, _)));
    }

    #[test]
    fn test_checkout_requires_key() {
        let err = ClientConfig::from_lookup(lookup_from(&[(
            "SHOPFRONT_CHECKOUT_URL",
            "https://pay.example.com/functions/v1/checkout",
        )]))
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(ref k) if k == "SHOPFRONT_CHECKOUT_KEY"));
    }

    #[test]
    fn test_checkout_config_debug_redacts_key() {
        let config = ClientConfig::from_lookup(lookup_from(&[
            ("SHOPFRONT_CHECKOUT_URL", "https://pay.example.com/functions/v1/checkout"),
            ("SHOPFRONT_CHECKOUT_KEY", "anon_key_super_secret"),
        ]))
        .unwrap();
        let checkout = config.checkout.unwrap();
        assert_eq!(checkout.api_key.expose_secret(), "anon_key_super_secret");

        let debug_output = format!("{checkout:?}");
        assert!(debug_output.contains("pay.example.com"));
        assert!(debug_output.contains("[REDACTED]"));
        assert!(!debug_output.contains("anon_key_super_secret"));
    }

    #[test]
    fn test_for_backend() {
        let config = ClientConfig::for_backend("http://127.0.0.1:4010").unwrap();
        assert_eq!(config.backend_url.as_str(), "http://127.0.0.1:4010/");
        assert!(ClientConfig::for_backend("not a url").is_err());
    }
}
