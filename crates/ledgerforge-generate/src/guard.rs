use std::future::Future;
use std::sync::Arc;

use crate::breaker::{CircuitBreaker, CircuitBreakerConfig};
use crate::errors::GenerationError;
use crate::registry::StateRegistry;
use crate::retry::RetryPolicy;

/// Circuit breaker composed around bounded retry.
///
/// Retries only run while the circuit admits calls, and breaker accounting
/// happens once per overall (retried) attempt, not per individual retry.
/// Retry counts feed the run metrics.
#[derive(Debug)]
pub struct ExecutionGuard {
    breaker: CircuitBreaker,
    retry: RetryPolicy,
    registry: Arc<StateRegistry>,
}

impl ExecutionGuard {
    pub fn new(name: &str, retry: RetryPolicy, registry: Arc<StateRegistry>) -> Self {
        Self {
            breaker: CircuitBreaker::new(name, CircuitBreakerConfig::default()),
            retry,
            registry,
        }
    }

    pub fn with_breaker_config(
        name: &str,
        retry: RetryPolicy,
        breaker_config: CircuitBreakerConfig,
        registry: Arc<StateRegistry>,
    ) -> Self {
        Self {
            breaker: CircuitBreaker::new(name, breaker_config),
            retry,
            registry,
        }
    }

    pub fn breaker(&self) -> &CircuitBreaker {
        &self.breaker
    }

    /// Run `op` behind the breaker with retries. A circuit-open rejection
    /// fails fast without consuming a retry attempt.
    pub async fn execute<T, E, F, Fut>(&self, name: &str, op: F) -> Result<T, GenerationError>
    where
        E: Into<GenerationError>,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let retry = self.retry;
        let breaker = &self.breaker;
        breaker
            .execute(name, || async {
                let outcome = retry
                    .with_retry_while(name, op, || breaker.is_available())
                    .await;
                self.registry.record_retries(u64::from(outcome.retries));
                outcome.result
            })
            .await
    }
}
