//! Storefront configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `STOREFRONT_HOST` - Bind address (default: 127.0.0.1)
//! - `STOREFRONT_PORT` - Listen port (default: 8080)
//! - `STOREFRONT_DATABASE_URL` - `PostgreSQL` connection string, falling back to
//!   `DATABASE_URL`. When neither is set the in-memory store is used.
//! - `SHOP_DELIVERY_COST` - Flat delivery charge (default: 500)
//! - `SHOP_FREE_DELIVERY_THRESHOLD` - Subtotal from which delivery is free (default: 20000)
//! - `STOREFRONT_REQUEST_TIMEOUT_SECS` - Per-request timeout (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use boutique_core::{DeliveryPricing, Money};

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
    /// `PostgreSQL` database connection URL (contains password); `None` selects
    /// the in-memory store
    pub database_url: Option<SecretString>,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Delivery charge and free-delivery threshold
    pub pricing: DeliveryPricing,
    /// Requests running longer than this are aborted
    pub request_timeout: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl StorefrontConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary variable source.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a variable is present but invalid.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env(&lookup);

        let host = env.parse_or("STOREFRONT_HOST", "127.0.0.1")?;
        let port = env.parse_or("STOREFRONT_PORT", "8080")?;
        let database_url = env
            .optional("STOREFRONT_DATABASE_URL")
            .or_else(|| env.optional("DATABASE_URL"))
            .map(SecretString::from);

        let defaults = DeliveryPricing::default();
        let pricing = DeliveryPricing {
            delivery_cost: env.money_or("SHOP_DELIVERY_COST", defaults.delivery_cost)?,
            free_delivery_threshold: env
                .money_or("SHOP_FREE_DELIVERY_THRESHOLD", defaults.free_delivery_threshold)?,
        };

        let timeout_secs: u64 = env.parse_or("STOREFRONT_REQUEST_TIMEOUT_SECS", "30")?;
        if timeout_secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                "STOREFRONT_REQUEST_TIMEOUT_SECS".to_string(),
                "must be at least 1".to_string(),
            ));
        }

        Ok(Self {
            database_url,
            host,
            port,
            pricing,
            request_timeout: Duration::from_secs(timeout_secs),
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

/// Get the storefront database URL, with fallback to generic `DATABASE_URL`.
///
/// Used by the CLI, which cannot run without a database.
///
/// # Errors
///
/// Returns `ConfigError::MissingEnvVar` if neither variable is set.
pub fn database_url_from_env() -> Result<SecretString, ConfigError> {
    let _ = dotenvy::dotenv();
    std::env::var("STOREFRONT_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| ConfigError::MissingEnvVar("STOREFRONT_DATABASE_URL".to_string()))
}

// =============================================================================
// Helper Functions
// =============================================================================

struct Env<'a, F>(&'a F);

impl<F: Fn(&str) -> Option<String>> Env<'_, F> {
    /// Get an optional variable, treating blank values as unset.
    fn optional(&self, key: &str) -> Option<String> {
        (self.0)(key).filter(|v| !v.trim().is_empty())
    }

    /// Parse a variable, falling back to `default` when unset.
    fn parse_or<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let raw = self.optional(key).unwrap_or_else(|| default.to_string());
        raw.trim()
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a non-negative amount of money.
    fn money_or(&self, key: &str, default: Money) -> Result<Money, ConfigError> {
        let Some(raw) = self.optional(key) else {
            return Ok(default);
        };
        let amount = raw
            .trim()
            .parse::<Money>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
        if amount.is_negative() {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must not be negative".to_string(),
            ));
        }
        Ok(amount)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use secrecy::ExposeSecret;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<StorefrontConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        StorefrontConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert!(config.database_url.is_none());
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8080");
        assert_eq!(config.pricing, DeliveryPricing::default());
        assert_eq!(config.request_timeout, Duration::from_secs(30));
        assert!(config.sentry_dsn.is_none());
    }

    #[test]
    fn test_database_url_falls_back_to_generic_var() {
        let config = load(&[("DATABASE_URL", "postgres://localhost/shop")]).unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://localhost/shop"
        );

        let config = load(&[
            ("DATABASE_URL", "postgres://localhost/other"),
            ("STOREFRONT_DATABASE_URL", "postgres://localhost/shop"),
        ])
        .unwrap();
        assert_eq!(
            config.database_url.unwrap().expose_secret(),
            "postgres://localhost/shop"
        );
    }

    #[test]
    fn test_pricing_overrides() {
        let config = load(&[
            ("SHOP_DELIVERY_COST", "350"),
            ("SHOP_FREE_DELIVERY_THRESHOLD", "15000.50"),
        ])
        .unwrap();
        assert_eq!(config.pricing.delivery_cost, Money::from_units(350));
        assert_eq!(
            config.pricing.free_delivery_threshold.to_string(),
            "15000.5"
        );
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("STOREFRONT_PORT", "eighty")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "STOREFRONT_PORT"
        ));
        assert!(load(&[("SHOP_DELIVERY_COST", "-1")]).is_err());
        assert!(load(&[("STOREFRONT_REQUEST_TIMEOUT_SECS", "0")]).is_err());
        assert!(load(&[("STOREFRONT_HOST", "not-an-ip")]).is_err());
    }

    #[test]
    fn test_debug_redacts_database_url() {
        let config = load(&[("DATABASE_URL", "postgres://user:hunter2@db/shop")]).unwrap();
        let debug_output = format!("{config:?}");
        assert!(!debug_output.contains("hunter2"));
    }
}
