//! Bounded retry with exponential backoff for LLM calls
//!
//! Only transient transport failures ([`LlmError::is_transient`]) are
//! retried. Malformed or empty completions fail immediately: retrying them
//! would re-spend tokens on the same broken output.

use crate::error::{LlmError, Result};
use std::time::Duration;
use tracing::{debug, warn};

/// Retry policy applied to every provider call
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, first try included
    pub max_attempts: u32,
    /// Delay before the first retry
    pub initial_backoff: Duration,
    /// Upper bound on any single delay
    pub max_backoff: Duration,
    /// Growth factor between consecutive delays
    pub backoff_multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(500),
            max_backoff: Duration::from_secs(10),
            backoff_multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn new(
        max_attempts: u32,
        initial_backoff: Duration,
        max_backoff: Duration,
        backoff_multiplier: f64,
    ) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
            backoff_multiplier,
        }
    }

    /// Single attempt, no retries
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            ..Self::default()
        }
    }

    /// Millisecond-scale backoff, for tests
    pub fn fast() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(10),
            max_backoff: Duration::from_millis(100),
            backoff_multiplier: 2.0,
        }
    }

    /// Run `operation` until it succeeds, fails terminally, or the attempt
    /// budget is spent. Returns the last error in the exhausted case.
    pub async fn execute<F, Fut, T>(&self, operation_name: &str, mut operation: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut delay = self.initial_backoff;

        for attempt in 1..=self.max_attempts {
            match operation().await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(
                            "'{}' succeeded on attempt {}/{}",
                            operation_name, attempt, self.max_attempts
                        );
                    }
                    return Ok(value);
                }
                Err(e) if !e.is_transient() => {
                    debug!("'{}' failed terminally: {}", operation_name, e);
                    return Err(e);
                }
                Err(e) if attempt == self.max_attempts => {
                    warn!(
                        "'{}' exhausted {} attempts: {}",
                        operation_name, self.max_attempts, e
                    );
                    return Err(e);
                }
                Err(e) => {
                    warn!(
                        "'{}' attempt {}/{} failed ({}), retrying in {:?}",
                        operation_name, attempt, self.max_attempts, e, delay
                    );
                    tokio::time::sleep(delay).await;
                    delay = Duration::from_secs_f64(
                        (delay.as_secs_f64() * self.backoff_multiplier)
                            .min(self.max_backoff.as_secs_f64()),
                    );
                }
            }
        }

        // Reachable only with max_attempts == 0
        Err(LlmError::RequestFailed(format!(
            "'{operation_name}' was given no attempts"
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn counter() -> Arc<AtomicU32> {
        Arc::new(AtomicU32::new(0))
    }

    #[tokio::test]
    async fn test_first_try_success_makes_one_call() {
        let calls = counter();
        let c = Arc::clone(&calls);

        let value = RetryPolicy::fast()
            .execute("op", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, LlmError>(7)
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_transient_error_is_retried_until_success() {
        let calls = counter();
        let c = Arc::clone(&calls);

        let value = RetryPolicy::fast()
            .execute("op", || {
                let c = Arc::clone(&c);
                async move {
                    if c.fetch_add(1, Ordering::SeqCst) == 0 {
                        Err(LlmError::RequestFailed("connection reset".into()))
                    } else {
                        Ok(7)
                    }
                }
            })
            .await
            .unwrap();

        assert_eq!(value, 7);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_exhausted_attempts_return_last_error() {
        let calls = counter();
        let c = Arc::clone(&calls);

        let err = RetryPolicy::fast()
            .execute("op", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(LlmError::Timeout(1))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::Timeout(1)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_terminal_error_is_never_retried() {
        let calls = counter();
        let c = Arc::clone(&calls);

        let err = RetryPolicy::fast()
            .execute("op", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(LlmError::MalformedResponse("empty".into()))
                }
            })
            .await
            .unwrap_err();

        assert!(matches!(err, LlmError::MalformedResponse(_)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_no_retry_policy_makes_one_call() {
        let calls = counter();
        let c = Arc::clone(&calls);

        let result = RetryPolicy::no_retry()
            .execute("op", || {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>(LlmError::RateLimitExceeded("429".into()))
                }
            })
            .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
