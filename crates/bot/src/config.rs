//! Bot configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional.
//!
//! - `BOT_HOST` - Bind address (default: 127.0.0.1)
//! - `BOT_PORT` - Listen port (default: 8081)
//! - `BOT_WEB_APP_URL` - Storefront base URL, falling back to
//!   `RENDER_EXTERNAL_URL` (default: `http://localhost:8080`)
//! - `BOT_ADMIN_IDS` - Comma-separated chat user ids allowed to broadcast
//! - `BOT_SESSION_TTL_SECS` - Idle lifetime of a chat session (default: 1800)
//! - `BOT_SESSION_SWEEP_SECS` - Expired-session sweep period (default: 60)
//! - `BOT_CATALOG_REFRESH_SECS` - Catalog mirror refresh period (default: 300)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::collections::HashSet;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Chat bot configuration.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// IP address to bind the webhook server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Storefront base URL, used for links and the catalog feed
    pub web_app_url: Url,
    /// Chat user ids allowed to compose broadcasts
    pub admin_ids: HashSet<i64>,
    /// Sessions untouched for this long are dropped
    pub session_ttl: Duration,
    /// How often expired sessions are swept
    pub session_sweep: Duration,
    /// How often the catalog mirror is refreshed
    pub catalog_refresh: Duration,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment name
    pub sentry_environment: Option<String>,
}

impl BotConfig {
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

        let host = env.parse_or("BOT_HOST", "127.0.0.1")?;
        let port = env.parse_or("BOT_PORT", "8081")?;

        let (url_key, raw_url) = env
            .optional("BOT_WEB_APP_URL")
            .map(|v| ("BOT_WEB_APP_URL", v))
            .or_else(|| {
                env.optional("RENDER_EXTERNAL_URL")
                    .map(|v| ("RENDER_EXTERNAL_URL", v))
            })
            .unwrap_or(("BOT_WEB_APP_URL", "http://localhost:8080".to_string()));
        let web_app_url = parse_web_app_url(url_key, &raw_url)?;

        let admin_ids = env
            .optional("BOT_ADMIN_IDS")
            .map(|raw| parse_admin_ids(&raw))
            .transpose()?
            .unwrap_or_default();

        Ok(Self {
            host,
            port,
            web_app_url,
            admin_ids,
            session_ttl: env.seconds_or("BOT_SESSION_TTL_SECS", "1800")?,
            session_sweep: env.seconds_or("BOT_SESSION_SWEEP_SECS", "60")?,
            catalog_refresh: env.seconds_or("BOT_CATALOG_REFRESH_SECS", "300")?,
            sentry_dsn: env.optional("SENTRY_DSN"),
            sentry_environment: env.optional("SENTRY_ENVIRONMENT"),
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Whether the given chat user may compose broadcasts.
    #[must_use]
    pub fn is_admin(&self, user_id: i64) -> bool {
        self.admin_ids.contains(&user_id)
    }

    /// Absolute storefront link for a path such as `cart` or `catalog`.
    #[must_use]
    pub fn web_link(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.web_app_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn parse_web_app_url(key: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme {}", url.scheme()),
        ));
    }
    Ok(url)
}

fn parse_admin_ids(raw: &str) -> Result<HashSet<i64>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i64>()
                .map_err(|e| ConfigError::InvalidEnvVar("BOT_ADMIN_IDS".to_string(), e.to_string()))
        })
        .collect()
}

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

    /// Parse a positive number of seconds.
    fn seconds_or(&self, key: &str, default: &str) -> Result<Duration, ConfigError> {
        let secs: u64 = self.parse_or(key, default)?;
        if secs == 0 {
            return Err(ConfigError::InvalidEnvVar(
                key.to_string(),
                "must be at least 1".to_string(),
            ));
        }
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<BotConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        BotConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = load(&[]).unwrap();
        assert_eq!(config.socket_addr().to_string(), "127.0.0.1:8081");
        assert_eq!(config.web_app_url.as_str(), "http://localhost:8080/");
        assert!(config.admin_ids.is_empty());
        assert_eq!(config.session_ttl, Duration::from_secs(1800));
        assert_eq!(config.session_sweep, Duration::from_secs(60));
        assert_eq!(config.catalog_refresh, Duration::from_secs(300));
    }

    #[test]
    fn test_web_app_url_fallback() {
        let config = load(&[("RENDER_EXTERNAL_URL", "https://shop.onrender.com")]).unwrap();
        assert_eq!(config.web_link("cart"), "https://shop.onrender.com/cart");

        let config = load(&[
            ("RENDER_EXTERNAL_URL", "https://shop.onrender.com"),
            ("BOT_WEB_APP_URL", "https://boutique.example/"),
        ])
        .unwrap();
        assert_eq!(config.web_link("/orders"), "https://boutique.example/orders");
    }

    #[test]
    fn test_admin_ids() {
        let config = load(&[("BOT_ADMIN_IDS", " 101, 202,,303 ")]).unwrap();
        assert!(config.is_admin(101));
        assert!(config.is_admin(303));
        assert!(!config.is_admin(404));
        assert!(load(&[("BOT_ADMIN_IDS", "101,abc")]).is_err());
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(load(&[("BOT_WEB_APP_URL", "not a url")]).is_err());
        assert!(load(&[("BOT_WEB_APP_URL", "ftp://shop.example")]).is_err());
        assert!(load(&[("BOT_SESSION_TTL_SECS", "0")]).is_err());
        assert!(matches!(
            load(&[("BOT_PORT", "99999")]),
            Err(ConfigError::InvalidEnvVar(key, _)) if key == "BOT_PORT"
        ));
    }
}
