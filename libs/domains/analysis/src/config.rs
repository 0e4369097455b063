use core_config::{env_or_default, env_parse, env_secs, ConfigError, FromEnv};
use std::time::Duration;

use crate::models::DEFAULT_DOCUMENT_TYPE;

/// Concurrency and deadline settings for analysis runs and embedding handlers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Analysis runs executing at once
    pub max_concurrent_analyses: usize,
    /// Embedding handlers executing at once
    pub max_concurrent_embeddings: usize,
    /// Upper bound on read + analyze + persist for one document
    pub analysis_deadline: Duration,
    pub document_type: String,
}

impl PipelineConfig {
    /// Comfortably above the worst-case analyze budget (3 x 5min + 2 x 10s)
    pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(20 * 60);

    pub fn with_max_concurrent_analyses(mut self, max: usize) -> Self {
        self.max_concurrent_analyses = max.max(1);
        self
    }

    pub fn with_max_concurrent_embeddings(mut self, max: usize) -> Self {
        self.max_concurrent_embeddings = max.max(1);
        self
    }

    pub fn with_analysis_deadline(mut self, deadline: Duration) -> Self {
        self.analysis_deadline = deadline;
        self
    }

    pub fn with_document_type(mut self, document_type: impl Into<String>) -> Self {
        self.document_type = document_type.into();
        self
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_analyses: 4,
            max_concurrent_embeddings: 8,
            analysis_deadline: Self::DEFAULT_DEADLINE,
            document_type: DEFAULT_DOCUMENT_TYPE.to_string(),
        }
    }
}

/// - `ANALYSIS_MAX_CONCURRENT` (4)
/// - `EMBEDDING_MAX_CONCURRENT` (8)
/// - `ANALYSIS_DEADLINE_SECS` (1200)
/// - `ANALYSIS_DOCUMENT_TYPE` ("general")
impl FromEnv for PipelineConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let max_concurrent_analyses: usize = env_parse(
            "ANALYSIS_MAX_CONCURRENT",
            &defaults.max_concurrent_analyses.to_string(),
        )?;
        let max_concurrent_embeddings: usize = env_parse(
            "EMBEDDING_MAX_CONCURRENT",
            &defaults.max_concurrent_embeddings.to_string(),
        )?;
        for (key, value) in [
            ("ANALYSIS_MAX_CONCURRENT", max_concurrent_analyses),
            ("EMBEDDING_MAX_CONCURRENT", max_concurrent_embeddings),
        ] {
            if value == 0 {
                return Err(ConfigError::ParseError {
                    key: key.to_string(),
                    details: "must be at least 1".to_string(),
                });
            }
        }

        Ok(Self {
            max_concurrent_analyses,
            max_concurrent_embeddings,
            analysis_deadline: env_secs(
                "ANALYSIS_DEADLINE_SECS",
                defaults.analysis_deadline.as_secs(),
            )?,
            document_type: env_or_default("ANALYSIS_DOCUMENT_TYPE", &defaults.document_type),
        })
    }
}
