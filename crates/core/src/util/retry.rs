//! Bounded retry with exponential backoff for calls to external services.

use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Retry budget: how many attempts, and how the delay grows between them.
#[derive(Clone, Debug)]
pub struct Backoff {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            base_delay: Duration::from_millis(250),
            max_delay: Duration::from_secs(2),
        }
    }
}

impl Backoff {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts,
            ..Default::default()
        }
        .with_base_delay(base_delay)
    }

    fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Delay before retry number `attempt` (1-based), doubling each time.
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.base_delay.saturating_mul(factor).min(self.max_delay)
    }

    /// Runs `f` until it succeeds, the budget is spent, or an error is not
    /// retryable. Returns the last error when all attempts fail.
    pub async fn run<F, T, E, Fut>(&self, mut f: F, is_retryable: impl Fn(&E) -> bool) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match f().await {
                Ok(result) => {
                    if attempt > 1 {
                        debug!(attempt, "retried operation succeeded");
                    }
                    return Ok(result);
                }
                Err(e) => {
                    if attempt >= self.max_attempts || !is_retryable(&e) {
                        return Err(e);
                    }
                    let delay = self.delay_for_attempt(attempt);
                    warn!(attempt, max_attempts = self.max_attempts, ?delay, "attempt failed, retrying");
                    sleep(delay).await;
                }
            }
        }
    }
}

/// Server errors and throttling are worth a retry; client errors are not.
pub fn is_http_retryable(status: u16) -> bool {
    matches!(status, 408 | 429 | 500..=599)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn delay_doubles_and_caps() {
        let backoff = Backoff {
            max_attempts: 6,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(500),
        };
        assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
        assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
        assert_eq!(backoff.delay_for_attempt(3), Duration::from_millis(400));
        assert_eq!(backoff.delay_for_attempt(4), Duration::from_millis(500));
    }

    #[tokio::test]
    async fn stops_after_budget_spent() {
        let calls = AtomicU32::new(0);
        let backoff = Backoff::new(3, Duration::from_millis(1));
        let result: Result<(), &str> = backoff
            .run(
                || {
                    calls.fetch_add(1, Ordering::Relaxed);
                    async { Err("boom") }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Err("boom"));
        assert_eq!(calls.load(Ordering::Relaxed), 3);
    }

    #[tokio::test]
    async fn does_not_retry_non_retryable() {
        let calls = AtomicU32::new(0);
        let backoff = Backoff::new(3, Duration::from_millis(1));
        let result: Result<(), &str> = backoff
            .run(
                || {
                    calls.fetch_add(1, Ordering::Relaxed);
                    async { Err("fatal") }
                },
                |_| false,
            )
            .await;
        assert_eq!(result, Err("fatal"));
        assert_eq!(calls.load(Ordering::Relaxed), 1);
    }

    #[tokio::test]
    async fn succeeds_on_later_attempt() {
        let calls = AtomicU32::new(0);
        let backoff = Backoff::new(3, Duration::from_millis(1));
        let result = backoff
            .run(
                || {
                    let n = calls.fetch_add(1, Ordering::Relaxed);
                    async move { if n < 1 { Err("flaky") } else { Ok(n) } }
                },
                |_| true,
            )
            .await;
        assert_eq!(result, Ok(1));
    }

    #[test]
    fn retryable_statuses() {
        assert!(is_http_retryable(429));
        assert!(is_http_retryable(500));
        assert!(is_http_retryable(503));
        assert!(is_http_retryable(408));
        assert!(!is_http_retryable(400));
        assert!(!is_http_retryable(401));
        assert!(!is_http_retryable(404));
    }
}
