//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ORDER_API_URL` - Base URL of the order service REST API
//! - `ORDER_API_TOKEN` - Bearer token for the order service (high entropy)
//!
//! ## Optional
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 3000)
//! - `RETURN_FETCH_DEBOUNCE_MS` - Coalescing window for return request fetches (default: 100)
//! - `RETURN_FETCH_TIMEOUT_MS` - Timeout for a single return request fetch (default: 10000)
//! - `ORDER_CACHE_TTL_SECS` - How long fetched orders are cached (default: 30)
//! - `RETURN_CACHE_TTL_SECS` - How long loaded return requests are reused (default: 60)
//! - `RETURN_CACHE_CAPACITY` - Most orders whose return requests are kept (default: 10000)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;
use url::Url;

const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;
const MIN_SECRET_LEN: usize = 16;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Storefront application configuration.
#[derive(Debug, Clone)]
pub struct StorefrontConfig {
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Order service configuration
    pub order_api: OrderApiConfig,
    /// Return request fetch coordination
    pub returns: ReturnFetchConfig,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

/// Order service API configuration.
///
/// Implements `Debug` manually to redact the token.
#[derive(Clone)]
pub struct OrderApiConfig {
    /// Base URL, e.g. `https://orders.internal/api/v1`
    pub base_url: Url,
    /// Bearer token (server-side only)
    pub token: SecretString,
    /// Time-to-live for cached orders
    pub order_cache_ttl: Duration,
}

impl std::fmt::Debug for OrderApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderApiConfig")
            .field("base_url", &self.base_url.as_str())
            .field("token", &"[REDACTED]")
            .field("order_cache_ttl", &self.order_cache_ttl)
            .finish()
    }
}

/// Timing for the return request fetch coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReturnFetchConfig {
    /// Triggers within this window collapse into one fetch.
    pub debounce: Duration,
    /// A fetch that takes longer than this is treated as failed.
    pub timeout: Duration,
    /// How long a fetch outcome is reused before the order is fetched again.
    pub settled_ttl: Duration,
    /// Upper bound on orders with a remembered outcome.
    pub settled_capacity: u64,
}

impl Default for ReturnFetchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(100),
            timeout: Duration::from_secs(10),
            settled_ttl: Duration::from_secs(60),
            settled_capacity: 10_000,
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
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let host = get_env_or_default("STOREFRONT_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("STOREFRONT_HOST".to_string(), e.to_string())
            })?;
        let port = parse_env_or_default("STOREFRONT_PORT", 3000_u16)?;

        let order_api = OrderApiConfig::from_env()?;
        let returns = ReturnFetchConfig::from_env()?;

        Ok(Self {
            host,
            port,
            order_api,
            returns,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

impl OrderApiConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let raw_url = get_required_env("ORDER_API_URL")?;
        let base_url = Url::parse(&raw_url)
            .map_err(|e| ConfigError::InvalidEnvVar("ORDER_API_URL".to_string(), e.to_string()))?;
        let ttl_secs = parse_env_or_default("ORDER_CACHE_TTL_SECS", 30_u64)?;

        Ok(Self {
            base_url,
            token: get_validated_secret("ORDER_API_TOKEN")?,
            order_cache_ttl: Duration::from_secs(ttl_secs),
        })
    }
}

impl ReturnFetchConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        #[allow(clippy::cast_possible_truncation)] // defaults are small constants
        let debounce_ms = parse_env_or_default(
            "RETURN_FETCH_DEBOUNCE_MS",
            defaults.debounce.as_millis() as u64,
        )?;
        #[allow(clippy::cast_possible_truncation)]
        let timeout_ms = parse_env_or_default(
            "RETURN_FETCH_TIMEOUT_MS",
            defaults.timeout.as_millis() as u64,
        )?;

        let ttl_secs =
            parse_env_or_default("RETURN_CACHE_TTL_SECS", defaults.settled_ttl.as_secs())?;
        let settled_capacity =
            parse_env_or_default("RETURN_CACHE_CAPACITY", defaults.settled_capacity)?;

        if timeout_ms == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "RETURN_FETCH_TIMEOUT_MS".to_string(),
                "must be greater than zero".to_string(),
            ));
        }

        Ok(Self {
            debounce: Duration::from_millis(debounce_ms),
            timeout: Duration::from_millis(timeout_ms),
            settled_ttl: Duration::from_secs(ttl_secs),
            settled_capacity,
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Parse an environment variable, falling back to `default` when unset.
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(value) => parse_value(key, &value),
        Err(_) => Ok(default),
    }
}

fn parse_value<T>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value
        .parse::<T>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Shannon entropy of `s` in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    let mut counts: HashMap<char, u32> = HashMap::new();
    let mut total = 0_u32;
    for c in s.chars() {
        *counts.entry(c).or_default() += 1;
        total += 1;
    }
    if total == 0 {
        return 0.0;
    }

    let total = f64::from(total);
    counts
        .values()
        .map(|&count| {
            let p = f64::from(count) / total;
            -p * p.log2()
        })
        .sum()
}

/// Reject tokens that look copied from a sample `.env` or are too guessable.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let insecure = |reason: String| Err(ConfigError::InsecureSecret(var_name.to_string(), reason));

    if secret.chars().count() < MIN_SECRET_LEN {
        return insecure(format!("shorter than {MIN_SECRET_LEN} characters"));
    }

    let lower = secret.to_lowercase();
    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(**p)) {
        return insecure(format!("appears to be a placeholder (contains '{pattern}')"));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return insecure(format!(
            "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1})"
        ));
    }

    Ok(())
}

/// Load and validate a secret from environment.
fn get_validated_secret(key: &str) -> Result<SecretString, ConfigError> {
    let value = get_required_env(key)?;
    validate_secret_strength(&value, key)?;
    Ok(SecretString::from(value))
}
