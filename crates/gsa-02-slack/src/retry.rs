//! Bounded exponential backoff for transient Slack failures.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::SlackResult;

/// Default number of attempts (including the first call).
pub const DEFAULT_ATTEMPTS: u32 = 3;

/// Default delay before the first retry.
pub const DEFAULT_DELAY: Duration = Duration::from_secs(5);

/// Retry policy for read-only calls.
///
/// Only errors reporting [`is_transient`](crate::SlackError::is_transient)
/// are retried; everything else is returned on the first failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, first call included. Zero behaves like one.
    pub attempts: u32,
    /// Delay before the first retry; doubled for each one after.
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: DEFAULT_ATTEMPTS,
            delay: DEFAULT_DELAY,
        }
    }
}

impl RetryPolicy {
    pub fn new(attempts: u32, delay: Duration) -> Self {
        Self { attempts, delay }
    }

    /// A policy that never retries.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Backoff before retry number `retry` (zero based).
    pub fn delay_for(&self, retry: u32) -> Duration {
        self.delay.saturating_mul(2u32.saturating_pow(retry))
    }

    /// Run `f` until it succeeds, fails permanently, or runs out of attempts.
    /// The last error is returned when attempts run out.
    pub async fn execute<F, Fut, T>(&self, operation: &str, mut f: F) -> SlackResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = SlackResult<T>>,
    {
        let attempts = self.attempts.max(1);
        let mut retry = 0;

        loop {
            match f().await {
                Ok(value) => {
                    if retry > 0 {
                        debug!(operation, attempt = retry + 1, "slack call succeeded after retries");
                    }
                    return Ok(value);
                }
                Err(error) if error.is_transient() && retry + 1 < attempts => {
                    let delay = self.delay_for(retry);
                    debug!(
                        operation,
                        attempt = retry + 1,
                        attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %error,
                        "retrying slack call after transient error"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                Err(error) => {
                    if error.is_transient() {
                        warn!(operation, attempts, error = %error, "slack call retries exhausted");
                    }
                    return Err(error);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SlackError;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::default();

        assert_eq!(policy.delay_for(0), Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(10));
        assert_eq!(policy.delay_for(2), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retries_transient_until_success() {
        let calls = AtomicU32::new(0);

        let result = RetryPolicy::default()
            .execute("users.info", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SlackError::ServiceUnavailable)
                } else {
                    Ok("U1")
                }
            })
            .await;

        assert_eq!(result, Ok("U1"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_gives_up_after_attempts() {
        let calls = AtomicU32::new(0);

        let result: SlackResult<()> = RetryPolicy::default()
            .execute("users.info", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SlackError::ServiceUnavailable)
            })
            .await;

        assert_eq!(result, Err(SlackError::ServiceUnavailable));
        assert_eq!(calls.load(Ordering::SeqCst), DEFAULT_ATTEMPTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_permanent_error_not_retried() {
        let calls = AtomicU32::new(0);

        let result: SlackResult<()> = RetryPolicy::default()
            .execute("users.lookupByEmail", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(SlackError::Api("user_not_found".into()))
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
