//! Retry policy: bounded re-execution of fallible async operations.
//!
//! The delay before attempt `n + 1` (after attempt `n` failed) is
//! `min(max_delay, initial_delay · f(n))` where `f` is 1, `n` or `2^(n-1)`
//! depending on the [`BackoffStrategy`]. When attempts run out, or the
//! predicate declines, the last error is returned unchanged.

use convoy_config::{BackoffStrategy, RetryConfig};
use convoy_core::error::ProviderError;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// How many times, how long to wait, and which errors are worth retrying.
pub struct RetryPolicy<E> {
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff: BackoffStrategy,
    should_retry: RetryPredicate<E>,
}

impl<E> Clone for RetryPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            initial_delay: self.initial_delay,
            max_delay: self.max_delay,
            backoff: self.backoff,
            should_retry: self.should_retry.clone(),
        }
    }
}

impl<E> std::fmt::Debug for RetryPolicy<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RetryPolicy")
            .field("max_attempts", &self.max_attempts)
            .field("initial_delay", &self.initial_delay)
            .field("max_delay", &self.max_delay)
            .field("backoff", &self.backoff)
            .finish()
    }
}

impl<E> Default for RetryPolicy<E> {
    /// 3 attempts, 1s initial, 30s cap, exponential, retry everything.
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            backoff: BackoffStrategy::Exponential,
            should_retry: Arc::new(|_: &E| true),
        }
    }
}

impl<E> RetryPolicy<E> {
    pub fn new(max_attempts: u32, initial_delay: Duration, max_delay: Duration, backoff: BackoffStrategy) -> Self {
        Self {
            max_attempts,
            initial_delay,
            max_delay,
            backoff,
            ..Self::default()
        }
    }

    /// Build a policy from the `[retry]` config section. Retries every error.
    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.initial_delay_ms),
            Duration::from_millis(config.max_delay_ms),
            config.backoff,
        )
    }

    /// Only retry errors for which `predicate` returns true.
    pub fn with_should_retry<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.should_retry = Arc::new(predicate);
        self
    }

    pub fn should_retry(&self, error: &E) -> bool {
        (self.should_retry)(error)
    }

    /// Delay to wait after the given (1-based) failed attempt.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let attempt = attempt.max(1);
        let factor = match self.backoff {
            BackoffStrategy::Constant => 1,
            BackoffStrategy::Linear => attempt,
            BackoffStrategy::Exponential => 2u32.saturating_pow(attempt - 1),
        };
        self.initial_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Run `op` until it succeeds, the predicate declines, or attempts run out.
    pub async fn execute<T, F, Fut>(&self, operation: &str, mut op: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: std::fmt::Display,
    {
        let max_attempts = self.max_attempts.max(1);
        let mut attempt = 1;

        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) => {
                    if attempt >= max_attempts || !self.should_retry(&e) {
                        return Err(e);
                    }

                    let delay = self.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Operation failed, retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl RetryPolicy<ProviderError> {
    /// Default timings, but only retry transient provider failures
    /// (rate limits, network errors, timeouts, 5xx responses).
    pub fn transient() -> Self {
        Self::default().with_should_retry(ProviderError::is_retryable)
    }
}
