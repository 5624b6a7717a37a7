//! Retry logic for transient NCBI failures
//!
//! Wraps `tokio-retry` with an exponential backoff strategy and only retries
//! errors that classify themselves as transient through [`RetryableError`].

use std::future::Future;
use std::time::Duration;

use tokio_retry::RetryIf;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{debug, warn};

/// Errors that can tell whether repeating the request might succeed
pub trait RetryableError {
    /// Whether the operation that produced this error may be retried
    fn is_retryable(&self) -> bool;

    /// Short human-readable reason used in logs
    fn retry_reason(&self) -> &str;
}

/// Backoff settings for retried requests
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of retries after the first attempt
    pub max_retries: usize,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
    /// Multiplier applied to the delay after each retry
    pub backoff_multiplier: u64,
    /// Randomize delays to avoid synchronized retries across workers
    pub use_jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2,
            use_jitter: true,
        }
    }
}

impl RetryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable retries entirely
    pub fn no_retry() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: usize) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    pub fn without_jitter(mut self) -> Self {
        self.use_jitter = false;
        self
    }

    /// Delays to sleep between attempts, in order
    fn delays(&self) -> Vec<Duration> {
        // ExponentialBackoff yields base^n; scale it so the first delay equals initial_delay
        let base = self.backoff_multiplier.max(1);
        let factor = (self.initial_delay.as_millis() as u64 / base).max(1);
        let use_jitter = self.use_jitter;

        ExponentialBackoff::from_millis(base)
            .factor(factor)
            .max_delay(self.max_delay)
            .map(move |d| if use_jitter { jitter(d) } else { d })
            .take(self.max_retries)
            .collect()
    }
}

/// Run `operation` until it succeeds, fails with a non-retryable error, or
/// the retry budget is spent.
pub async fn with_retry<T, E, F, Fut>(
    mut operation: F,
    config: &RetryConfig,
    operation_name: &str,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: RetryableError + std::fmt::Display,
{
    let mut attempt = 0usize;

    RetryIf::spawn(
        config.delays(),
        || {
            attempt += 1;
            debug!(attempt, operation = operation_name, "Attempting operation");
            operation()
        },
        |err: &E| {
            let retry = err.is_retryable();
            if retry {
                warn!(
                    operation = operation_name,
                    reason = err.retry_reason(),
                    error = %err,
                    "Transient failure, retrying"
                );
            }
            retry
        },
    )
    .await
}
