use std::future::Future;
use std::time::Duration;

use tracing::warn;

use crate::errors::GenerationError;

/// Bounded exponential-backoff retry.
///
/// Deliberately simple: every failure is retried up to the cap, with no
/// retryable/non-retryable distinction and no jitter, so tests can assert
/// the exact delay sequence.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    /// Maximum number of attempts (not re-attempts).
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(2000),
        }
    }
}

/// Result of a retried operation plus how many re-attempts it consumed.
#[derive(Debug)]
pub struct RetryOutcome<T> {
    pub result: Result<T, GenerationError>,
    pub retries: u32,
}

impl RetryPolicy {
    pub fn with_max_retries(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    /// Backoff before re-attempting after `attempt` completed attempts:
    /// `min(base * 2^attempt, max)`.
    pub fn backoff_delay(&self, attempt: u32) -> Duration {
        let exp = self
            .base_delay
            .saturating_mul(2_u32.saturating_pow(attempt));
        exp.min(self.max_delay)
    }

    /// Run `op` up to `max_retries` times, sleeping between attempts, and
    /// return the final error if all attempts fail.
    pub async fn with_retry<T, E, F, Fut>(&self, name: &str, op: F) -> RetryOutcome<T>
    where
        E: Into<GenerationError>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.with_retry_while(name, op, || true).await
    }

    /// Like [`with_retry`](Self::with_retry), but only re-attempts while
    /// `should_retry` holds (used to stop retrying once a circuit opens).
    pub async fn with_retry_while<T, E, F, Fut>(
        &self,
        name: &str,
        mut op: F,
        should_retry: impl Fn() -> bool,
    ) -> RetryOutcome<T>
    where
        E: Into<GenerationError>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let attempts = self.max_retries.max(1);
        let mut retries = 0;
        let mut last_err = None;

        for attempt in 1..=attempts {
            match op().await {
                Ok(value) => {
                    return RetryOutcome {
                        result: Ok(value),
                        retries,
                    };
                }
                Err(err) => {
                    let err: GenerationError = err.into();
                    if attempt == attempts || !should_retry() {
                        last_err = Some(err);
                        break;
                    }
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        operation = name,
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "attempt failed, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    retries += 1;
                }
            }
        }

        RetryOutcome {
            result: Err(last_err.unwrap_or_else(|| {
                GenerationError::Validation(format!("{name}: no attempts were made"))
            })),
            retries,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    #[test]
    fn backoff_is_capped_exponential() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(200));
        assert_eq!(policy.backoff_delay(2), Duration::from_millis(400));
        assert_eq!(policy.backoff_delay(3), Duration::from_millis(800));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(1600));
        assert_eq!(policy.backoff_delay(5), Duration::from_millis(2000));
        assert_eq!(policy.backoff_delay(10), Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn observed_backoff_delays_follow_the_schedule() {
        let policy = RetryPolicy::default();
        let start = tokio::time::Instant::now();
        let outcome = policy
            .with_retry("always-fails", || async {
                Err::<(), _>(GenerationError::Validation("down".into()))
            })
            .await;

        assert!(outcome.result.is_err());
        // Two sleeps between the three attempts: 200ms then 400ms.
        assert_eq!(start.elapsed(), Duration::from_millis(600));
    }

    #[tokio::test(start_paused = true)]
    async fn attempts_exactly_max_retries_and_returns_last_error() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let outcome = policy
            .with_retry("always-fails", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move { Err::<(), _>(GenerationError::Validation(format!("attempt {n}"))) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(outcome.retries, 2);
        match outcome.result {
            Err(GenerationError::Validation(msg)) => assert_eq!(msg, "attempt 3"),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn succeeds_midway_without_consuming_remaining_attempts() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let outcome = policy
            .with_retry("flaky", || {
                let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
                async move {
                    if n < 2 {
                        Err(GenerationError::Validation("transient".into()))
                    } else {
                        Ok(n)
                    }
                }
            })
            .await;

        assert_eq!(outcome.result.ok(), Some(2));
        assert_eq!(outcome.retries, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stops_when_guard_declines_further_retries() {
        let calls = AtomicU32::new(0);
        let policy = RetryPolicy::default();
        let outcome = policy
            .with_retry_while(
                "guarded",
                || {
                    calls.fetch_add(1, Ordering::SeqCst);
                    async { Err::<(), _>(GenerationError::Validation("down".into())) }
                },
                || false,
            )
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(outcome.result.is_err());
    }
}
