//! Shared configuration primitives for the analysis services.
//!
//! Every configuration struct in the workspace implements [`FromEnv`] and is
//! built from the `env_*` helpers below, so missing or malformed variables
//! surface as a [`ConfigError`] that names the offending key.

pub mod server;
pub mod tracing;

use std::env;
use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Configuration error type
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Environment variable '{0}' is required but not set")]
    MissingEnvVar(String),

    #[error("Failed to parse environment variable '{key}': {details}")]
    ParseError { key: String, details: String },
}

/// Application environment
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Environment {
    Development,
    Production,
}

impl Environment {
    /// Reads `APP_ENV`; anything other than "production" means development.
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        if app_env.eq_ignore_ascii_case("production") {
            Environment::Production
        } else {
            Environment::Development
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn is_development(&self) -> bool {
        matches!(self, Environment::Development)
    }
}

/// Trait for configuration that can be loaded from environment variables
pub trait FromEnv: Sized {
    fn from_env() -> Result<Self, ConfigError>;
}

/// Load an environment variable, falling back to `default` when unset
pub fn env_or_default(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Load an environment variable or return [`ConfigError::MissingEnvVar`]
pub fn env_required(key: &str) -> Result<String, ConfigError> {
    env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Load and parse an environment variable, falling back to `default` when unset.
///
/// The default goes through the same parser, so a bad default is reported
/// just like a bad value.
pub fn env_parse<T>(key: &str, default: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    env_or_default(key, default)
        .trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::ParseError {
            key: key.to_string(),
            details: e.to_string(),
        })
}

/// Load a whole number of seconds as a [`Duration`]
pub fn env_secs(key: &str, default_secs: u64) -> Result<Duration, ConfigError> {
    env_parse::<u64>(key, &default_secs.to_string()).map(Duration::from_secs)
}

/// Load a whole number of milliseconds as a [`Duration`]
pub fn env_millis(key: &str, default_millis: u64) -> Result<Duration, ConfigError> {
    env_parse::<u64>(key, &default_millis.to_string()).map(Duration::from_millis)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_environment_defaults_to_development() {
        temp_env::with_var_unset("APP_ENV", || {
            let env = Environment::from_env();
            assert_eq!(env, Environment::Development);
            assert!(env.is_development());
            assert!(!env.is_production());
        });
    }

    #[test]
    fn test_environment_production_case_insensitive() {
        for value in ["production", "PRODUCTION", "Production"] {
            temp_env::with_var("APP_ENV", Some(value), || {
                assert_eq!(Environment::from_env(), Environment::Production);
            });
        }
    }

    #[test]
    fn test_environment_unknown_defaults_to_development() {
        temp_env::with_var("APP_ENV", Some("staging"), || {
            assert_eq!(Environment::from_env(), Environment::Development);
        });
    }

    #[test]
    fn test_env_or_default() {
        temp_env::with_var("CFG_TEST_VAR", Some("set"), || {
            assert_eq!(env_or_default("CFG_TEST_VAR", "fallback"), "set");
        });
        temp_env::with_var_unset("CFG_TEST_VAR", || {
            assert_eq!(env_or_default("CFG_TEST_VAR", "fallback"), "fallback");
        });
    }

    #[test]
    fn test_env_required_missing() {
        temp_env::with_var_unset("CFG_MISSING_REQUIRED", || {
            let err = env_required("CFG_MISSING_REQUIRED").unwrap_err();
            assert!(err.to_string().contains("CFG_MISSING_REQUIRED"));
            assert!(err.to_string().contains("required"));
        });
    }

    #[test]
    fn test_env_parse_uses_default_when_unset() {
        temp_env::with_var_unset("CFG_PARSE_VAR", || {
            let value: u32 = env_parse("CFG_PARSE_VAR", "42").unwrap();
            assert_eq!(value, 42);
        });
    }

    #[test]
    fn test_env_parse_trims_whitespace() {
        temp_env::with_var("CFG_PARSE_VAR", Some(" 7 "), || {
            let value: u32 = env_parse("CFG_PARSE_VAR", "42").unwrap();
            assert_eq!(value, 7);
        });
    }

    #[test]
    fn test_env_parse_reports_key_on_failure() {
        temp_env::with_var("CFG_PARSE_VAR", Some("seven"), || {
            let err = env_parse::<u32>("CFG_PARSE_VAR", "42").unwrap_err();
            match err {
                ConfigError::ParseError { key, .. } => assert_eq!(key, "CFG_PARSE_VAR"),
                other => panic!("unexpected error: {other}"),
            }
        });
    }

    #[test]
    fn test_env_secs_and_millis() {
        temp_env::with_vars(
            [("CFG_SECS", Some("90")), ("CFG_MILLIS", None::<&str>)],
            || {
                assert_eq!(env_secs("CFG_SECS", 10).unwrap(), Duration::from_secs(90));
                assert_eq!(
                    env_millis("CFG_MILLIS", 250).unwrap(),
                    Duration::from_millis(250)
                );
            },
        );
    }
}
