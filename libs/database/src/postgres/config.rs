use core_config::{env_parse, env_required, ConfigError, FromEnv};
use sea_orm::ConnectOptions;
use std::time::Duration;
use tracing::log::LevelFilter;

/// PostgreSQL connection pool settings
#[derive(Clone, Debug)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout: Duration,
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
    pub max_lifetime: Duration,
    pub sqlx_logging: bool,
}

impl PostgresConfig {
    /// Pool defaults sized for a worker: each analysis run holds a connection
    /// only while persisting, so a small pool suffices.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_connections: 20,
            min_connections: 2,
            connect_timeout: Duration::from_secs(8),
            acquire_timeout: Duration::from_secs(8),
            idle_timeout: Duration::from_secs(300),
            max_lifetime: Duration::from_secs(1800),
            sqlx_logging: false,
        }
    }

    pub fn with_pool_size(mut self, max_connections: u32, min_connections: u32) -> Self {
        self.max_connections = max_connections;
        self.min_connections = min_connections;
        self
    }

    pub fn into_connect_options(self) -> ConnectOptions {
        let mut opt = ConnectOptions::new(&self.url);
        opt.max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .connect_timeout(self.connect_timeout)
            .acquire_timeout(self.acquire_timeout)
            .idle_timeout(self.idle_timeout)
            .max_lifetime(self.max_lifetime)
            .sqlx_logging(self.sqlx_logging)
            .sqlx_logging_level(LevelFilter::Debug);
        opt
    }
}

/// Environment variables:
/// - `DATABASE_URL` (required)
/// - `DB_MAX_CONNECTIONS` (default 20), `DB_MIN_CONNECTIONS` (default 2)
/// - `DB_CONNECT_TIMEOUT_SECS`, `DB_ACQUIRE_TIMEOUT_SECS` (default 8)
/// - `DB_IDLE_TIMEOUT_SECS` (default 300), `DB_MAX_LIFETIME_SECS` (default 1800)
/// - `DB_SQLX_LOGGING` (default false)
impl FromEnv for PostgresConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::new(env_required("DATABASE_URL")?);

        Ok(Self {
            max_connections: env_parse("DB_MAX_CONNECTIONS", &defaults.max_connections.to_string())?,
            min_connections: env_parse("DB_MIN_CONNECTIONS", &defaults.min_connections.to_string())?,
            connect_timeout: core_config::env_secs(
                "DB_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout.as_secs(),
            )?,
            acquire_timeout: core_config::env_secs(
                "DB_ACQUIRE_TIMEOUT_SECS",
                defaults.acquire_timeout.as_secs(),
            )?,
            idle_timeout: core_config::env_secs(
                "DB_IDLE_TIMEOUT_SECS",
                defaults.idle_timeout.as_secs(),
            )?,
            max_lifetime: core_config::env_secs(
                "DB_MAX_LIFETIME_SECS",
                defaults.max_lifetime.as_secs(),
            )?,
            sqlx_logging: env_parse("DB_SQLX_LOGGING", "false")?,
            url: defaults.url,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_postgres_config_with_pool_size() {
        let config = PostgresConfig::new("postgresql://localhost/test").with_pool_size(50, 10);
        assert_eq!(config.max_connections, 50);
        assert_eq!(config.min_connections, 10);
    }

    #[test]
    fn test_postgres_config_from_env_minimal() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/legal")),
                ("DB_MAX_CONNECTIONS", None),
                ("DB_SQLX_LOGGING", None),
            ],
            || {
                let config = PostgresConfig::from_env().unwrap();
                assert_eq!(config.url, "postgresql://localhost/legal");
                assert_eq!(config.max_connections, 20);
                assert!(!config.sqlx_logging);
            },
        );
    }

    #[test]
    fn test_postgres_config_from_env_custom() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/legal")),
                ("DB_MAX_CONNECTIONS", Some("50")),
                ("DB_CONNECT_TIMEOUT_SECS", Some("15")),
            ],
            || {
                let config = PostgresConfig::from_env().unwrap();
                assert_eq!(config.max_connections, 50);
                assert_eq!(config.connect_timeout, Duration::from_secs(15));
            },
        );
    }

    #[test]
    fn test_postgres_config_from_env_requires_url() {
        temp_env::with_var_unset("DATABASE_URL", || {
            let err = PostgresConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("DATABASE_URL"));
        });
    }

    #[test]
    fn test_postgres_config_from_env_bad_pool_size() {
        temp_env::with_vars(
            [
                ("DATABASE_URL", Some("postgresql://localhost/legal")),
                ("DB_MAX_CONNECTIONS", Some("lots")),
            ],
            || {
                let err = PostgresConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("DB_MAX_CONNECTIONS"));
            },
        );
    }
}
