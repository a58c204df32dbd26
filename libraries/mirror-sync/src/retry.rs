//! Bounded retry with exponential backoff and full jitter

use mirror_core::StoreError;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Failures that may succeed if the same request is made again
pub trait Transient {
    fn is_transient(&self) -> bool;
}

impl Transient for StoreError {
    fn is_transient(&self) -> bool {
        StoreError::is_transient(self)
    }
}

/// How an operation failed once the retry loop gave up
#[derive(Debug)]
pub enum RetryError<E> {
    /// Every attempt failed transiently
    Exhausted { attempts: u32, last: E },
    /// A failure that retrying cannot fix
    Permanent(E),
}

/// Retry schedule for transient object store failures
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Total attempts including the first one
    pub max_attempts: u32,
    pub initial_backoff: Duration,
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_backoff: Duration::from_millis(200),
            max_backoff: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, initial_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            max_attempts,
            initial_backoff,
            max_backoff,
        }
    }

    /// Upper bound of the wait after failed attempt number `attempt` (1-based):
    /// `initial_backoff * 2^(attempt - 1)`, capped at `max_backoff`
    pub fn backoff_ceiling(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.initial_backoff
            .checked_mul(1u32 << exponent)
            .map_or(self.max_backoff, |delay| delay.min(self.max_backoff))
    }

    /// Random wait in `[0, backoff_ceiling(attempt)]`
    pub fn delay(&self, attempt: u32) -> Duration {
        let ceiling = self.backoff_ceiling(attempt);
        if ceiling.is_zero() {
            return ceiling;
        }
        let millis = rand::thread_rng().gen_range(0..=ceiling.as_millis() as u64);
        Duration::from_millis(millis)
    }

    /// Run `op` until it succeeds, fails permanently, or runs out of attempts
    pub async fn run<T, E, F, Fut>(&self, label: &str, mut op: F) -> Result<T, RetryError<E>>
    where
        E: Transient + Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if !e.is_transient() => return Err(RetryError::Permanent(e)),
                Err(e) if attempt >= self.max_attempts => {
                    return Err(RetryError::Exhausted {
                        attempts: attempt,
                        last: e,
                    })
                }
                Err(e) => {
                    let delay = self.delay(attempt);
                    warn!(
                        item = %label,
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "Transient failure, retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    fn fast() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2))
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_ceiling(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_ceiling(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_ceiling(5), Duration::from_millis(3200));
        assert_eq!(policy.backoff_ceiling(9), Duration::from_secs(30));
        assert_eq!(policy.backoff_ceiling(200), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_transient_failures_are_retried() {
        let calls = AtomicU32::new(0);
        let result = fast()
            .run("a", || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(StoreError::transient("reset"))
                } else {
                    Ok(7)
                }
            })
            .await;

        assert!(matches!(result, Ok(7)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_attempts_are_bounded() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .run("a", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::transient("reset"))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Exhausted { attempts: 3, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_permanent_failures_stop_immediately() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast()
            .run("a", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(StoreError::not_found("mem://b", "a"))
            })
            .await;

        assert!(matches!(result, Err(RetryError::Permanent(ref e)) if e.is_not_found()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    proptest! {
        #[test]
        fn prop_delay_within_ceiling(
            attempt in 1u32..64,
            initial_ms in 0u64..5_000,
            max_ms in 0u64..120_000,
        ) {
            let policy = RetryPolicy::new(5, Duration::from_millis(initial_ms), Duration::from_millis(max_ms));
            let ceiling = policy.backoff_ceiling(attempt);

            prop_assert!(ceiling <= policy.max_backoff);
            prop_assert!(policy.delay(attempt) <= ceiling);
            prop_assert!(policy.backoff_ceiling(attempt + 1) >= ceiling);
        }
    }
}
