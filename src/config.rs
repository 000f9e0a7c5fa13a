use std::env;
use std::str::FromStr;

// ============================================================================
// Application Configuration
// ============================================================================
//
// Loaded once at startup from the environment (and a .env file if present).
//
//   DATABASE_URL              PostgreSQL URL; unset runs on sample data
//   DATABASE_MAX_CONNECTIONS  pool size (default 5)
//   METRICS_HOST              /metrics and /health bind address (default 0.0.0.0)
//   METRICS_PORT              /metrics and /health port (default 9090)
//   RUST_LOG                  tracing filter (default below)
//
// ============================================================================

pub const DEFAULT_LOG_FILTER: &str = "info,order_query=debug";
pub const DEFAULT_METRICS_HOST: &str = "0.0.0.0";

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// None selects the in-memory sample store
    pub database: Option<DatabaseConfig>,
    pub metrics_host: String,
    pub metrics_port: u16,
    pub log_filter: String,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let max_connections = parsed_or(&lookup, "DATABASE_MAX_CONNECTIONS", 5)?;
        let database = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .map(|url| DatabaseConfig { url, max_connections });

        Ok(Self {
            database,
            metrics_host: lookup("METRICS_HOST")
                .map(|host| host.trim().to_string())
                .filter(|host| !host.is_empty())
                .unwrap_or_else(|| DEFAULT_METRICS_HOST.to_string()),
            metrics_port: parsed_or(&lookup, "METRICS_PORT", 9090)?,
            log_filter: lookup("RUST_LOG").unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}

fn parsed_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults_without_environment() {
        let config = AppConfig::from_lookup(lookup(&[])).unwrap();

        assert!(config.database.is_none());
        assert_eq!(config.metrics_host, DEFAULT_METRICS_HOST);
        assert_eq!(config.metrics_port, 9090);
        assert_eq!(config.log_filter, DEFAULT_LOG_FILTER);
    }

    #[test]
    fn test_database_settings_are_read() {
        let config = AppConfig::from_lookup(lookup(&[
            ("DATABASE_URL", "postgres://localhost/shop"),
            ("DATABASE_MAX_CONNECTIONS", "12"),
            ("METRICS_HOST", "127.0.0.1"),
            ("METRICS_PORT", "9100"),
        ]))
        .unwrap();

        assert_eq!(
            config.database,
            Some(DatabaseConfig {
                url: "postgres://localhost/shop".to_string(),
                max_connections: 12,
            })
        );
        assert_eq!(config.metrics_host, "127.0.0.1");
        assert_eq!(config.metrics_port, 9100);
    }

    #[test]
    fn test_blank_database_url_selects_sample_store() {
        let config = AppConfig::from_lookup(lookup(&[("DATABASE_URL", "  ")])).unwrap();
        assert!(config.database.is_none());
    }

    #[test]
    fn test_invalid_port_is_rejected() {
        let err = AppConfig::from_lookup(lookup(&[("METRICS_PORT", "http")])).unwrap_err();

        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "METRICS_PORT"),
        }
    }
}
