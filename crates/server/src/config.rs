//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `STORELENS_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! ## Optional
//! - `STORELENS_MONGODB_URI` - `MongoDB` connection string; without it the
//!   document side of every comparison reports "not configured"
//! - `STORELENS_MONGODB_DATABASE` - Document database name (default: `ecommerce_mongodb`)
//! - `STORELENS_HOST` - Bind address (default: 127.0.0.1)
//! - `STORELENS_PORT` - Listen port (default: 5001)
//! - `STORELENS_QUERY_TIMEOUT_SECS` - Per-store timeout for comparisons (default: 10)
//! - `STORELENS_CHECKOUT_PRICING` - `flat`, `flat:<amount>` or `catalog` (default: `flat:20.00`)
//! - `STORELENS_COOKIE_SECURE` - Mark the session cookie `Secure` (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use storelens_core::cart::CheckoutPricing;

/// Default document database name.
pub const DEFAULT_MONGODB_DATABASE: &str = "ecommerce_mongodb";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Connection settings for the document store.
///
/// Implements `Debug` manually to redact the URI, which may carry credentials.
#[derive(Clone)]
pub struct MongoConfig {
    /// `MongoDB` connection string
    pub uri: SecretString,
    /// Database holding the mirrored collections
    pub database: String,
}

impl std::fmt::Debug for MongoConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MongoConfig")
            .field("uri", &"[REDACTED]")
            .field("database", &self.database)
            .finish()
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// Document store settings, if configured
    pub mongo: Option<MongoConfig>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Upper bound on each side of a dual-store comparison
    pub query_timeout: Duration,
    /// How checkout prices cart lines
    pub checkout_pricing: CheckoutPricing,
    /// Whether the session cookie requires HTTPS
    pub cookie_secure: bool,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g. `production`, `staging`)
    pub sentry_environment: Option<String>,
}

impl ServerConfig {
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

        let database_url = get_database_url("STORELENS_DATABASE_URL")?;
        let mongo = get_optional_env("STORELENS_MONGODB_URI").map(|uri| MongoConfig {
            uri: SecretString::from(uri),
            database: get_env_or_default("STORELENS_MONGODB_DATABASE", DEFAULT_MONGODB_DATABASE),
        });

        let host = parse_env("STORELENS_HOST", "127.0.0.1", str::parse::<IpAddr>)?;
        let port = parse_env("STORELENS_PORT", "5001", str::parse::<u16>)?;
        let timeout_secs = parse_env("STORELENS_QUERY_TIMEOUT_SECS", "10", str::parse::<u64>)?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STORELENS_QUERY_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }
        let checkout_pricing = parse_env(
            "STORELENS_CHECKOUT_PRICING",
            "flat:20.00",
            str::parse::<CheckoutPricing>,
        )?;
        let cookie_secure = parse_bool("STORELENS_COOKIE_SECURE")?;

        Ok(Self {
            database_url,
            mongo,
            host,
            port,
            query_timeout: Duration::from_secs(timeout_secs),
            checkout_pricing,
            cookie_secure,
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

// =============================================================================
// Helper Functions
// =============================================================================

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable. Empty values count as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Parse an environment variable (or its default) with `parse`.
fn parse_env<T, E: std::fmt::Display>(
    key: &str,
    default: &str,
    parse: impl FnOnce(&str) -> Result<T, E>,
) -> Result<T, ConfigError> {
    parse(&get_env_or_default(key, default))
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
}

/// Parse a boolean flag; unset means `false`.
fn parse_bool(key: &str) -> Result<bool, ConfigError> {
    match get_optional_env(key).as_deref().map(str::to_ascii_lowercase).as_deref() {
        None | Some("0" | "false" | "no" | "off") => Ok(false),
        Some("1" | "true" | "yes" | "on") => Ok(true),
        Some(other) => Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("expected a boolean, got {other:?}"),
        )),
    }
}
