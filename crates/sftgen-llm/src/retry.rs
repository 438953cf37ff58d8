//! Exponential backoff for rate-limited calls

use crate::LlmError;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Retry ceiling and base delay for rate-limit backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries allowed after the first attempt
    pub max_retries: u32,
    /// Delay before the first retry
    pub base_delay: Duration,
}

impl RetryPolicy {
    /// Create a policy
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self { max_retries, base_delay }
    }

    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 2u32.checked_pow(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }
}

/// Run `op`, retrying only on [`LlmError::RateLimited`].
///
/// Every other error is returned immediately. When the ceiling is reached the
/// last rate-limit description is surfaced as [`LlmError::RateLimitExceeded`].
pub async fn retry_on_rate_limit<T, F, Fut>(policy: &RetryPolicy, mut op: F) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Err(LlmError::RateLimited(message)) => {
                if attempt >= policy.max_retries {
                    return Err(LlmError::RateLimitExceeded {
                        attempts: attempt + 1,
                        message,
                    });
                }
                let delay = policy.delay_for(attempt);
                warn!(
                    "Rate limited (attempt {}/{}), backing off for {:?}: {}",
                    attempt + 1,
                    policy.max_retries + 1,
                    delay,
                    message
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            other => return other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use tokio::time::Instant;

    fn policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(2))
    }

    #[test]
    fn test_delay_doubles() {
        let policy = policy();
        assert_eq!(policy.delay_for(0), Duration::from_secs(2));
        assert_eq!(policy.delay_for(1), Duration::from_secs(4));
        assert_eq!(policy.delay_for(2), Duration::from_secs(8));
    }

    #[test]
    fn test_delay_saturates() {
        let policy = policy();
        assert_eq!(policy.delay_for(64), Duration::from_secs(2).saturating_mul(u32::MAX));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_twice_then_success() {
        let calls = Cell::new(0);
        let start = Instant::now();

        let result = retry_on_rate_limit(&policy(), || {
            let n = calls.get();
            calls.set(n + 1);
            async move {
                if n < 2 {
                    Err(LlmError::RateLimited("429".into()))
                } else {
                    Ok("done".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(calls.get(), 3);
        let elapsed = start.elapsed();
        // 2s * 2^0 + 2s * 2^1
        assert!(elapsed >= Duration::from_secs(6));
        assert!(elapsed < Duration::from_secs(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_rate_limit_exhausts_ceiling() {
        let calls = Cell::new(0);

        let result: Result<String, _> = retry_on_rate_limit(&policy(), || {
            calls.set(calls.get() + 1);
            async { Err(LlmError::RateLimited("slow down".into())) }
        })
        .await;

        assert_eq!(calls.get(), 4);
        match result {
            Err(LlmError::RateLimitExceeded { attempts, message }) => {
                assert_eq!(attempts, 4);
                assert_eq!(message, "slow down");
            }
            other => panic!("Expected RateLimitExceeded, got {:?}", other),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_not_retried() {
        let calls = Cell::new(0);
        let start = Instant::now();

        let result: Result<String, _> = retry_on_rate_limit(&policy(), || {
            calls.set(calls.get() + 1);
            async { Err(LlmError::Timeout("30s".into())) }
        })
        .await;

        assert_eq!(calls.get(), 1);
        assert!(matches!(result, Err(LlmError::Timeout(_))));
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_zero_retries() {
        let policy = RetryPolicy::new(0, Duration::from_secs(2));
        let result: Result<String, _> =
            retry_on_rate_limit(&policy, || async { Err(LlmError::RateLimited("429".into())) }).await;
        assert!(matches!(result, Err(LlmError::RateLimitExceeded { attempts: 1, .. })));
    }
}
