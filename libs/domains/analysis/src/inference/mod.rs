//! Client for the AI inference service
//!
//! Each operation has its own [`OperationPolicy`]: a per-attempt timeout and a
//! fixed number of retries with a fixed pause. Empty payloads count as
//! failures and use up the same retry budget as transport errors.

pub mod client;
pub mod config;
pub mod error;
pub mod retry;

pub use client::{AnalyzeRequest, InferenceApi, InferenceClient};
pub use config::{InferenceConfig, OperationPolicy};
pub use error::{InferenceError, InferenceResult};

#[cfg(test)]
pub use client::MockInferenceApi;
