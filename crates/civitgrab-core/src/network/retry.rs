//! Bounded retry for network operations.
//!
//! Every failed attempt runs a caller-supplied cleanup step before the next
//! attempt starts. Once the attempt budget is spent the last error is
//! returned unchanged.

use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// Configuration for retry behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryConfig {
    /// Maximum number of attempts (including the first one).
    pub max_attempts: u32,
    /// Pause between a failed attempt and the next one.
    pub delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay: Duration::ZERO,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum number of attempts. Zero is treated as one.
    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    /// Set the pause between attempts.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }
}

/// Details about a failed attempt, handed to the cleanup step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FailedAttempt {
    /// 1-based number of the attempt that failed.
    pub attempt: u32,
    /// Attempts still available after this one.
    pub remaining: u32,
}

/// Statistics about a retry operation.
#[derive(Debug, Clone, Default)]
pub struct RetryStats {
    /// Number of attempts made.
    pub attempts: u32,
    /// Whether the operation ultimately succeeded.
    pub success: bool,
    /// Last error message if failed.
    pub last_error: Option<String>,
}

/// Run `operation` until it succeeds or `config.max_attempts` is reached.
///
/// `on_failure` is awaited after every failed attempt, including the last
/// one, so partial output is always cleaned up before the error surfaces.
pub async fn retry_async<F, Fut, C, CFut, T, E>(
    config: &RetryConfig,
    mut operation: F,
    mut on_failure: C,
) -> (Result<T, E>, RetryStats)
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T, E>>,
    C: FnMut(FailedAttempt, &E) -> CFut,
    CFut: Future<Output = ()>,
    E: std::fmt::Display,
{
    let max_attempts = config.max_attempts.max(1);
    let mut stats = RetryStats::default();
    let mut attempt = 1;

    loop {
        stats.attempts = attempt;

        match operation(attempt).await {
            Ok(value) => {
                stats.success = true;
                if attempt > 1 {
                    debug!("Operation succeeded after {} attempts", attempt);
                }
                return (Ok(value), stats);
            }
            Err(e) => {
                stats.last_error = Some(e.to_string());
                let failed = FailedAttempt {
                    attempt,
                    remaining: max_attempts - attempt,
                };
                on_failure(failed, &e).await;

                if failed.remaining == 0 {
                    return (Err(e), stats);
                }

                if !config.delay.is_zero() {
                    tokio::time::sleep(config.delay).await;
                }
                attempt += 1;
            }
        }
    }
}
