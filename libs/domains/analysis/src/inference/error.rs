use std::time::Duration;
use thiserror::Error;

/// Failure of a single call to the inference service
#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("{operation} timed out after {}ms", .after.as_millis())]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Inference service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("{operation} failed after {attempts} attempts: {last}")]
    Exhausted {
        operation: &'static str,
        attempts: u32,
        #[source]
        last: Box<InferenceError>,
    },
}

impl InferenceError {
    /// HTTP status of the last upstream response, if there was one
    pub fn upstream_status(&self) -> Option<u16> {
        match self {
            InferenceError::Status { status, .. } => Some(*status),
            InferenceError::Exhausted { last, .. } => last.upstream_status(),
            _ => None,
        }
    }
}

pub type InferenceResult<T> = Result<T, InferenceError>;

impl From<reqwest::Error> for InferenceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            InferenceError::Malformed(err.to_string())
        } else {
            InferenceError::Transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for InferenceError {
    fn from(err: serde_json::Error) -> Self {
        InferenceError::Malformed(err.to_string())
    }
}
