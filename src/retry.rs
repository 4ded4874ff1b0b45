use std::future::Future;
use std::time::Duration;

use tracing::debug;

/// How the delay between attempts grows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    Constant,
    Exponential,
}

/// Retry budget for one fallible operation. `max_retries` counts the
/// attempts after the first, so 0 means try exactly once.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn constant(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            backoff: Backoff::Constant,
        }
    }

    pub fn exponential(max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            max_retries,
            retry_delay,
            backoff: Backoff::Exponential,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Constant => self.retry_delay,
            Backoff::Exponential => {
                self.retry_delay * 2u32.saturating_pow(attempt.saturating_sub(1))
            }
        }
    }
}

/// Runs `operation` until it succeeds or the budget is spent, sleeping
/// the policy delay before each retry. Returns the last error on
/// exhaustion; `what` names the operation in retry logs.
pub async fn with_retry<T, E, F, Fut>(
    policy: &RetryPolicy,
    what: &str,
    mut operation: F,
) -> Result<T, E>
where
    E: std::fmt::Display,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut attempt: u32 = 0;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(error) if attempt < policy.max_retries => {
                attempt += 1;
                debug!(
                    "Retry {}/{} for {}: {}",
                    attempt, policy.max_retries, what, error
                );
                tokio::time::sleep(policy.delay_for(attempt)).await;
            }
            Err(error) => return Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast_policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy::constant(max_retries, Duration::from_millis(1))
    }

    #[tokio::test]
    async fn test_success_on_first_attempt_makes_one_call() {
        let calls = AtomicU32::new(0);
        let result: Result<u32, &str> = with_retry(&fast_policy(2), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok(7) }
        })
        .await;
        assert_eq!(result, Ok(7));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result: Result<&str, String> = with_retry(&fast_policy(2), "op", || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt < 2 {
                    Err(format!("boom {}", attempt))
                } else {
                    Ok("done")
                }
            }
        })
        .await;
        assert_eq!(result, Ok("done"));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_exhaustion_returns_last_error_after_max_retries_plus_one_calls() {
        let calls = AtomicU32::new(0);
        let result: Result<(), String> = with_retry(&fast_policy(2), "op", || {
            let attempt = calls.fetch_add(1, Ordering::SeqCst);
            async move { Err(format!("failure {}", attempt)) }
        })
        .await;
        assert_eq!(result, Err("failure 2".to_string()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_zero_retries_means_a_single_attempt() {
        let calls = AtomicU32::new(0);
        let result: Result<(), &str> = with_retry(&fast_policy(0), "op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("nope") }
        })
        .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_constant_backoff_keeps_the_base_delay() {
        let policy = RetryPolicy::constant(3, Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(1));
        assert_eq!(policy.delay_for(3), Duration::from_secs(1));
    }

    #[test]
    fn test_exponential_backoff_doubles_each_retry() {
        let policy = RetryPolicy::exponential(3, Duration::from_secs(5));
        assert_eq!(policy.delay_for(1), Duration::from_secs(5));
        assert_eq!(policy.delay_for(2), Duration::from_secs(10));
        assert_eq!(policy.delay_for(3), Duration::from_secs(20));
    }
}
