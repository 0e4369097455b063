use std::future::Future;
use tracing::{debug, warn};

use super::config::OperationPolicy;
use super::error::{InferenceError, InferenceResult};

/// Run `attempt` under `policy`: each try is bounded by `policy.timeout`,
/// failures are retried `policy.max_retries` times with a fixed pause.
///
/// A single failed attempt is returned as-is when no retries are configured;
/// otherwise exhaustion wraps the last error in [`InferenceError::Exhausted`].
pub async fn with_fixed_retry<F, Fut, T>(
    operation: &'static str,
    policy: &OperationPolicy,
    mut attempt: F,
) -> InferenceResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = InferenceResult<T>>,
{
    let max_attempts = policy.max_attempts();
    let mut tries = 0;

    loop {
        tries += 1;
        let outcome = match tokio::time::timeout(policy.timeout, attempt()).await {
            Ok(result) => result,
            Err(_) => Err(InferenceError::Timeout {
                operation,
                after: policy.timeout,
            }),
        };

        match outcome {
            Ok(value) => {
                if tries > 1 {
                    debug!(operation, attempts = tries, "Inference call succeeded after retrying");
                }
                return Ok(value);
            }
            Err(e) if tries < max_attempts => {
                warn!(
                    operation,
                    attempt = tries,
                    max_attempts,
                    error = %e,
                    retry_in_ms = policy.retry_delay.as_millis() as u64,
                    "Inference call failed, retrying"
                );
                tokio::time::sleep(policy.retry_delay).await;
            }
            Err(e) if max_attempts == 1 => return Err(e),
            Err(e) => {
                warn!(operation, attempts = tries, error = %e, "Inference call failed, giving up");
                return Err(InferenceError::Exhausted {
                    operation,
                    attempts: tries,
                    last: Box::new(e),
                });
            }
        }
    }
}
