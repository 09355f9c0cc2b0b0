//! Retry logic with exponential backoff
//!
//! Wraps a fallible async operation and re-runs it on failure with doubling
//! delays. Every failure is retried identically — classification happens at
//! the collaborator boundary, not here.

use crate::config::RetryConfig;
use std::future::Future;
use std::time::Duration;

/// Execute an async operation with exponential backoff retry logic.
///
/// The operation is attempted up to `policy.max_attempts` times in total.
/// The delay before retry *i* (1-indexed) is `initial_delay * 2^(i-1)`, with
/// no jitter. On exhaustion the last error is returned.
///
/// # Example
///
/// ```no_run
/// use media_courier::retry::retry_with_backoff;
/// use media_courier::config::RetryConfig;
///
/// # async fn example() -> Result<(), String> {
/// let policy = RetryConfig::default();
/// let value = retry_with_backoff(&policy, "fetch", || async {
///     Ok::<_, String>(42)
/// }).await?;
/// # Ok(())
/// # }
/// ```
pub async fn retry_with_backoff<F, Fut, T, E>(
    policy: &RetryConfig,
    operation_name: &str,
    mut operation: F,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut delay = policy.initial_delay;

    for attempt in 1..=max_attempts {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::info!(operation = operation_name, attempt, "Succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if attempt < max_attempts => {
                tracing::warn!(
                    operation = operation_name,
                    error = %e,
                    attempt,
                    max_attempts,
                    delay_ms = delay.as_millis(),
                    "Attempt failed, retrying"
                );

                tokio::time::sleep(delay).await;
                delay = Duration::from_secs_f64(delay.as_secs_f64() * 2.0);
            }
            Err(e) => {
                tracing::error!(
                    operation = operation_name,
                    error = %e,
                    attempts = max_attempts,
                    "All retry attempts exhausted"
                );
                return Err(e);
            }
        }
    }

    unreachable!("retry loop always returns within max_attempts iterations")
}
