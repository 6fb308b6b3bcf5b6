//! Bounded retry with exponential backoff for transient failures.

use std::future::Future;
use std::time::Duration;

use crate::error::ReplicateError;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total number of attempts, including the first. Values below 1 are
    /// treated as 1.
    pub max_attempts: u32,
    /// Delay before the second attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(2),
            max_delay: Duration::from_secs(10),
            multiplier: 2.0,
        }
    }
}

impl RetryConfig {
    /// A config that never sleeps, for tests.
    pub fn immediate() -> Self {
        Self {
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            ..Self::default()
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`RetryConfig::max_delay`].
pub fn next_delay(current: Duration, config: &RetryConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Run `op` until it succeeds, fails with a non-transient error, or
/// exhausts the configured attempts.
///
/// Only [`transient`](ReplicateError::is_transient) failures are retried;
/// an application-level rejection returns immediately. After the final
/// attempt the last transport error is re-raised.
pub async fn retry_transient<T, F, Fut>(
    config: &RetryConfig,
    what: &str,
    mut op: F,
) -> Result<T, ReplicateError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ReplicateError>>,
{
    // A zero-attempt config would otherwise make the loop body
    // unreachable; always try at least once.
    let max_attempts = config.max_attempts.max(1);
    let mut delay = config.initial_delay;

    for attempt in 1..=max_attempts {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_transient() && attempt < max_attempts => {
                tracing::warn!(
                    attempt,
                    what,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Transient failure, retrying",
                );
                tokio::time::sleep(delay).await;
                delay = next_delay(delay, config);
            }
            Err(e) => {
                if e.is_transient() {
                    tracing::error!(what, attempts = max_attempts, error = %e,
                        "Giving up after exhausting retries");
                }
                return Err(e);
            }
        }
    }

    // max_attempts is clamped to at least 1, so the loop always returns.
    unreachable!("retry loop exited without a result")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
