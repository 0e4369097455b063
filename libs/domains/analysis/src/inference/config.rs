use core_config::{env_millis, env_or_default, env_parse, env_secs, ConfigError, FromEnv};
use std::time::Duration;

use crate::models::EMBEDDING_DIMENSION;

/// Timeout and retry policy of one inference operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OperationPolicy {
    /// Limit for a single attempt, request to decoded body
    pub timeout: Duration,
    /// Attempts after the first one
    pub max_retries: u32,
    /// Fixed pause between attempts
    pub retry_delay: Duration,
}

impl OperationPolicy {
    pub const fn new(timeout: Duration, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            timeout,
            max_retries,
            retry_delay,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_retries + 1
    }

    fn from_env(prefix: &str, defaults: OperationPolicy) -> Result<Self, ConfigError> {
        Ok(Self {
            timeout: env_secs(
                &format!("{prefix}_TIMEOUT_SECS"),
                defaults.timeout.as_secs(),
            )?,
            max_retries: env_parse(
                &format!("{prefix}_MAX_RETRIES"),
                &defaults.max_retries.to_string(),
            )?,
            retry_delay: env_millis(
                &format!("{prefix}_RETRY_DELAY_MS"),
                defaults.retry_delay.as_millis() as u64,
            )?,
        })
    }
}

/// Connection and per-operation policies for the inference client
#[derive(Debug, Clone, PartialEq)]
pub struct InferenceConfig {
    pub base_url: String,
    pub summarize: OperationPolicy,
    pub analyze: OperationPolicy,
    pub embed: OperationPolicy,
    /// Health probes are never retried
    pub health_timeout: Duration,
    pub embedding_dimension: usize,
}

impl InferenceConfig {
    pub const DEFAULT_BASE_URL: &'static str = "http://localhost:8000";

    pub const SUMMARIZE: OperationPolicy =
        OperationPolicy::new(Duration::from_secs(60), 2, Duration::from_secs(3));
    pub const ANALYZE: OperationPolicy =
        OperationPolicy::new(Duration::from_secs(300), 2, Duration::from_secs(10));
    pub const EMBED: OperationPolicy =
        OperationPolicy::new(Duration::from_secs(30), 2, Duration::from_secs(2));
    pub const HEALTH_TIMEOUT: Duration = Duration::from_secs(10);

    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            ..Self::default()
        }
    }

    pub fn with_summarize(mut self, policy: OperationPolicy) -> Self {
        self.summarize = policy;
        self
    }

    pub fn with_analyze(mut self, policy: OperationPolicy) -> Self {
        self.analyze = policy;
        self
    }

    pub fn with_embed(mut self, policy: OperationPolicy) -> Self {
        self.embed = policy;
        self
    }

    pub fn with_health_timeout(mut self, timeout: Duration) -> Self {
        self.health_timeout = timeout;
        self
    }

    pub fn with_embedding_dimension(mut self, dimension: usize) -> Self {
        self.embedding_dimension = dimension;
        self
    }

    /// Worst-case wall time of one `analyze` call including retries
    pub fn analyze_budget(&self) -> Duration {
        self.analyze.timeout * self.analyze.max_attempts() + self.analyze.retry_delay * self.analyze.max_retries
    }

    pub(crate) fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            base_url: Self::DEFAULT_BASE_URL.to_string(),
            summarize: Self::SUMMARIZE,
            analyze: Self::ANALYZE,
            embed: Self::EMBED,
            health_timeout: Self::HEALTH_TIMEOUT,
            embedding_dimension: EMBEDDING_DIMENSION,
        }
    }
}

/// Environment variables (defaults in parentheses):
/// - `INFERENCE_BASE_URL` (http://localhost:8000)
/// - `INFERENCE_SUMMARIZE_TIMEOUT_SECS` (60), `INFERENCE_SUMMARIZE_MAX_RETRIES` (2),
///   `INFERENCE_SUMMARIZE_RETRY_DELAY_MS` (3000)
/// - `INFERENCE_ANALYZE_*` (300, 2, 10000)
/// - `INFERENCE_EMBED_*` (30, 2, 2000)
/// - `INFERENCE_HEALTH_TIMEOUT_SECS` (10)
/// - `INFERENCE_EMBEDDING_DIMENSION` (768, the only accepted value)
impl FromEnv for InferenceConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let config = Self::new(env_or_default("INFERENCE_BASE_URL", Self::DEFAULT_BASE_URL))
            .with_summarize(OperationPolicy::from_env("INFERENCE_SUMMARIZE", Self::SUMMARIZE)?)
            .with_analyze(OperationPolicy::from_env("INFERENCE_ANALYZE", Self::ANALYZE)?)
            .with_embed(OperationPolicy::from_env("INFERENCE_EMBED", Self::EMBED)?)
            .with_health_timeout(env_secs(
                "INFERENCE_HEALTH_TIMEOUT_SECS",
                Self::HEALTH_TIMEOUT.as_secs(),
            )?)
            .with_embedding_dimension(env_parse(
                "INFERENCE_EMBEDDING_DIMENSION",
                &EMBEDDING_DIMENSION.to_string(),
            )?);

        // document_embeddings only accepts vectors of this length
        if config.embedding_dimension != EMBEDDING_DIMENSION {
            return Err(ConfigError::ParseError {
                key: "INFERENCE_EMBEDDING_DIMENSION".to_string(),
                details: format!(
                    "must be {EMBEDDING_DIMENSION} to match the stored embedding column, got {}",
                    config.embedding_dimension
                ),
            });
        }

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VARS: [&str; 12] = [
        "INFERENCE_BASE_URL",
        "INFERENCE_SUMMARIZE_TIMEOUT_SECS",
        "INFERENCE_SUMMARIZE_MAX_RETRIES",
        "INFERENCE_SUMMARIZE_RETRY_DELAY_MS",
        "INFERENCE_ANALYZE_TIMEOUT_SECS",
        "INFERENCE_ANALYZE_MAX_RETRIES",
        "INFERENCE_ANALYZE_RETRY_DELAY_MS",
        "INFERENCE_EMBED_TIMEOUT_SECS",
        "INFERENCE_EMBED_MAX_RETRIES",
        "INFERENCE_EMBED_RETRY_DELAY_MS",
        "INFERENCE_HEALTH_TIMEOUT_SECS",
        "INFERENCE_EMBEDDING_DIMENSION",
    ];

    #[test]
    fn test_defaults() {
        let config = InferenceConfig::default();

        assert_eq!(config.base_url, "http://localhost:8000");
        assert_eq!(config.summarize.timeout, Duration::from_secs(60));
        assert_eq!(config.summarize.retry_delay, Duration::from_secs(3));
        assert_eq!(config.analyze.timeout, Duration::from_secs(300));
        assert_eq!(config.analyze.retry_delay, Duration::from_secs(10));
        assert_eq!(config.embed.timeout, Duration::from_secs(30));
        assert_eq!(config.embed.retry_delay, Duration::from_secs(2));
        assert_eq!(config.health_timeout, Duration::from_secs(10));
        for policy in [config.summarize, config.analyze, config.embed] {
            assert_eq!(policy.max_retries, 2);
            assert_eq!(policy.max_attempts(), 3);
        }
        assert_eq!(config.embedding_dimension, 768);
    }

    #[test]
    fn test_from_env_defaults() {
        temp_env::with_vars_unset(VARS, || {
            assert_eq!(InferenceConfig::from_env().unwrap(), InferenceConfig::default());
        });
    }

    #[test]
    fn test_from_env_overrides() {
        temp_env::with_vars(
            [
                ("INFERENCE_BASE_URL", Some("http://ai:9000/")),
                ("INFERENCE_ANALYZE_TIMEOUT_SECS", Some("120")),
                ("INFERENCE_ANALYZE_MAX_RETRIES", Some("4")),
                ("INFERENCE_EMBED_RETRY_DELAY_MS", Some("250")),
            ],
            || {
                let config = InferenceConfig::from_env().unwrap();
                assert_eq!(config.base_url, "http://ai:9000");
                assert_eq!(config.analyze.timeout, Duration::from_secs(120));
                assert_eq!(config.analyze.max_retries, 4);
                assert_eq!(config.embed.retry_delay, Duration::from_millis(250));
                assert_eq!(config.summarize, InferenceConfig::SUMMARIZE);
            },
        );
    }

    #[test]
    fn test_from_env_invalid_value_names_key() {
        temp_env::with_var("INFERENCE_EMBED_MAX_RETRIES", Some("twice"), || {
            let err = InferenceConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("INFERENCE_EMBED_MAX_RETRIES"));
        });
    }

    #[test]
    fn test_from_env_rejects_dimension_the_schema_cannot_store() {
        for value in ["0", "384", "1536"] {
            temp_env::with_var("INFERENCE_EMBEDDING_DIMENSION", Some(value), || {
                let err = InferenceConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("INFERENCE_EMBEDDING_DIMENSION"));
                assert!(err.to_string().contains("768"));
            });
        }
        temp_env::with_var("INFERENCE_EMBEDDING_DIMENSION", Some("768"), || {
            assert_eq!(InferenceConfig::from_env().unwrap().embedding_dimension, 768);
        });
    }

    #[test]
    fn test_url_joining() {
        let config = InferenceConfig::new("http://ai:8000/");
        assert_eq!(config.url("/analyze"), "http://ai:8000/analyze");
        assert_eq!(config.url("health"), "http://ai:8000/health");
    }

    #[test]
    fn test_analyze_budget() {
        // 3 x 300s attempts + 2 x 10s pauses
        assert_eq!(
            InferenceConfig::default().analyze_budget(),
            Duration::from_secs(920)
        );
    }
}
