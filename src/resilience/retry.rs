//! # Retry With Delay
//!
//! Fixed-delay retry of a single remote call, gated by a predicate on the error.

use crate::config::{
    ReporterConfig, DEFAULT_ITEM_FINISH_MAX_ATTEMPTS, DEFAULT_ITEM_FINISH_RETRY_DELAY_MS,
};
use crate::error::ReportingError;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first one
    pub max_attempts: u32,
    /// Pause between consecutive attempts
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ITEM_FINISH_MAX_ATTEMPTS,
            delay: Duration::from_millis(DEFAULT_ITEM_FINISH_RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    /// Item-finish policy described by the reporter configuration
    pub fn for_item_finish(config: &ReporterConfig) -> Self {
        Self::new(
            config.item_finish_max_attempts,
            config.item_finish_retry_delay(),
        )
    }

    /// Delay in whole milliseconds, saturating at `u64::MAX`
    pub fn delay_ms(&self) -> u64 {
        u64::try_from(self.delay.as_millis()).unwrap_or(u64::MAX)
    }

    /// Run `operation` until it succeeds, fails with an error `should_retry` rejects,
    /// or `max_attempts` is exhausted. The last observed error is returned.
    pub async fn run<T, F, Fut, P>(
        &self,
        operation_name: &str,
        should_retry: P,
        mut operation: F,
    ) -> Result<T, ReportingError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ReportingError>>,
        P: Fn(&ReportingError) -> bool,
    {
        let mut attempt = 1;
        loop {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            operation = %operation_name,
                            attempt = attempt,
                            "🔁 Operation succeeded after retry"
                        );
                    }
                    return Ok(value);
                }
                Err(err) if should_retry(&err) && attempt < self.max_attempts => {
                    warn!(
                        operation = %operation_name,
                        attempt = attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = self.delay_ms(),
                        error = %err,
                        "🔁 Retryable failure, scheduling another attempt"
                    );
                    tokio::time::sleep(self.delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    if should_retry(&err) {
                        warn!(
                            operation = %operation_name,
                            attempts = attempt,
                            error = %err,
                            "Retry attempts exhausted"
                        );
                    }
                    return Err(err);
                }
            }
        }
    }
}
