//! Process configuration loaded from the environment.

use crate::{Error, Result};

/// Default upstream tracking API base URL.
pub const DEFAULT_BASE_URL: &str = "https://paris.dispatchtrack.com/api/external/v1";

/// Default PostgreSQL connection string.
pub const DEFAULT_DATABASE_URL: &str = "postgres://localhost/routesync";

/// Process-wide configuration.
///
/// Every value is overridable from the environment; only the upstream API
/// token has no default and is required at startup.
///
/// | Variable | Default | Description |
/// |----------|---------|-------------|
/// | `DATABASE_URL` | `postgres://localhost/routesync` | PostgreSQL connection string |
/// | `DISPATCHTRACK_BASE_URL` | production endpoint | Upstream API base URL |
/// | `DISPATCHTRACK_TOKEN` | (required) | Upstream API auth token |
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection string.
    pub database_url: String,
    /// Upstream tracking API base URL (no trailing slash).
    pub base_url: String,
    /// Upstream tracking API token, sent as `X-AUTH-TOKEN`.
    pub token: String,
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// A missing `DISPATCHTRACK_TOKEN` is a fatal startup error.
    pub fn from_env() -> Result<Self> {
        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let base_url = std::env::var("DISPATCHTRACK_BASE_URL")
            .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let token = std::env::var("DISPATCHTRACK_TOKEN")
            .map_err(|_| Error::Config("DISPATCHTRACK_TOKEN is not set".to_string()))?;
        if token.trim().is_empty() {
            return Err(Error::Config("DISPATCHTRACK_TOKEN is empty".to_string()));
        }

        Ok(Self {
            database_url,
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_base_url_has_no_trailing_slash() {
        assert!(!DEFAULT_BASE_URL.ends_with('/'));
    }

    #[test]
    fn test_config_is_clone_and_debug() {
        let config = Config {
            database_url: DEFAULT_DATABASE_URL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            token: "secret".to_string(),
        };
        let cloned = config.clone();
        assert_eq!(cloned.base_url, config.base_url);
        assert!(format!("{:?}", config).contains("Config"));
    }
}
