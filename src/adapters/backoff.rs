//! Exponential back-off for external collaborator calls (spec.md §5
//! "Backpressure"): base 1s, factor 2, cap 60s, up to 3 retries.

use std::time::Duration;

/// Back-off policy parameters.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    /// Initial delay before the first retry.
    pub base: Duration,
    /// Multiplier applied to the delay after each retry.
    pub factor: u32,
    /// Maximum delay, regardless of attempt count.
    pub cap: Duration,
    /// Maximum number of retries (not counting the initial attempt).
    pub max_retries: u32,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(1),
            factor: 2,
            cap: Duration::from_secs(60),
            max_retries: 3,
        }
    }
}

impl BackoffPolicy {
    /// Delay before retry attempt `attempt` (1-indexed).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let scaled = self.base.saturating_mul(self.factor.saturating_pow(attempt.saturating_sub(1)));
        scaled.min(self.cap)
    }

    /// Run `f` with retries per this policy, returning the first `Ok`
    /// result or the last error once retries are exhausted.
    pub async fn retry<T, E, F, Fut>(&self, mut f: F) -> Result<T, E>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            match f().await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(err);
                    }
                    tokio::time::sleep(self.delay_for(attempt)).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delay_grows_and_caps() {
        let policy = BackoffPolicy::default();
        assert_eq!(policy.delay_for(1), Duration::from_secs(1));
        assert_eq!(policy.delay_for(2), Duration::from_secs(2));
        assert_eq!(policy.delay_for(3), Duration::from_secs(4));
        assert_eq!(policy.delay_for(10), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_retry_succeeds_after_failures() {
        let policy = BackoffPolicy {
            base: Duration::from_millis(1),
            factor: 1,
            cap: Duration::from_millis(1),
            max_retries: 3,
        };
        let mut attempts = 0;
        let result: Result<u32, &str> = policy
            .retry(|| {
                attempts += 1;
                let current = attempts;
                async move {
                    if current < 3 {
                        Err("not yet")
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;
        assert_eq!(result, Ok(42));
    }

    #[tokio::test]
    async fn test_retry_exhausted_returns_last_error() {
        let policy = BackoffPolicy {
            base: Duration::from_millis(1),
            factor: 1,
            cap: Duration::from_millis(1),
            max_retries: 2,
        };
        let result: Result<u32, &str> = policy.retry(|| async { Err("always fails") }).await;
        assert_eq!(result, Err("always fails"));
    }
}
