use crate::{CoreError, ErrorExt};
use std::future::Future;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// Fixed-delay retry policy: at most `max_attempts` calls, `delay` apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub max_attempts: u32,
    /// Pause between two attempts
    pub delay: Duration,
}

impl RetryPolicy {
    pub const fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts,
            delay,
        }
    }

    /// Policy for listing the feed: 5 attempts, 2 seconds apart
    pub const fn fetch() -> Self {
        Self::new(5, Duration::from_secs(2))
    }

    /// Policy for a single notification: 3 attempts, 2 seconds apart
    pub const fn notify() -> Self {
        Self::new(3, Duration::from_secs(2))
    }

    /// A policy of zero attempts still runs the operation once.
    fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the attempts are used up. The last error is returned unchanged.
    pub async fn execute<F, Fut, T>(
        &self,
        operation_name: &str,
        mut operation: F,
    ) -> Result<T, CoreError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, CoreError>>,
    {
        let attempts = self.attempts();
        let mut attempt = 1;

        loop {
            let start_time = Instant::now();
            match operation().await {
                Ok(result) => {
                    if attempt > 1 {
                        info!(
                            "Operation {} succeeded on attempt {}/{}",
                            operation_name, attempt, attempts
                        );
                    }
                    return Ok(result);
                }
                Err(error) => {
                    debug!(
                        "Attempt {}/{} failed for {} after {:?}: {}",
                        attempt,
                        attempts,
                        operation_name,
                        start_time.elapsed(),
                        error
                    );

                    if !error.is_retryable() {
                        debug!("Not retrying {} due to error type: {}", operation_name, error);
                        return Err(error);
                    }

                    if attempt >= attempts {
                        warn!(
                            "Operation {} failed after {} attempts: {}",
                            operation_name, attempts, error
                        );
                        return Err(error);
                    }

                    info!(
                        "Retrying {} in {:?} due to: {}",
                        operation_name, self.delay, error
                    );
                    sleep(self.delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::notify()
    }
}
