use std::collections::VecDeque;
use std::future::Future;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use crate::errors::GenerationError;

/// Breaker states: `Closed → Open → HalfOpen → Closed | Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Failure ratio within the monitoring window that opens the circuit.
    pub failure_threshold: f64,
    /// How long the circuit stays open before probing recovery.
    pub recovery_timeout: Duration,
    /// Rolling window over which the failure ratio is computed.
    pub monitoring_period: Duration,
    /// Don't open on fewer samples than this.
    pub minimum_requests: u32,
    /// Fraction of half-open probes that must succeed to close again.
    pub success_threshold: f64,
    /// Number of probes evaluated while half-open.
    pub half_open_probes: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 0.5,
            recovery_timeout: Duration::from_secs(30),
            monitoring_period: Duration::from_secs(60),
            minimum_requests: 5,
            success_threshold: 0.6,
            half_open_probes: 3,
        }
    }
}

#[derive(Debug)]
struct BreakerInner {
    state: CircuitState,
    /// (timestamp, failed) samples inside the monitoring window.
    samples: VecDeque<(Instant, bool)>,
    opened_at: Option<Instant>,
    probe_count: u32,
    probe_successes: u32,
    total_rejected: u64,
}

impl BreakerInner {
    fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            samples: VecDeque::new(),
            opened_at: None,
            probe_count: 0,
            probe_successes: 0,
            total_rejected: 0,
        }
    }
}

/// Snapshot of breaker state for observability.
#[derive(Debug, Clone, Serialize)]
pub struct BreakerStats {
    pub state: CircuitState,
    pub window_requests: u32,
    pub window_failures: u32,
    pub rejected: u64,
}

/// Protective gate in front of one generator's remote calls.
///
/// One instance per generator, so one entity type's failures cannot trip
/// another's breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    inner: Mutex<BreakerInner>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner::new()),
        }
    }

    fn inner(&self) -> std::sync::MutexGuard<'_, BreakerInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Run `op` behind the breaker. If the circuit is open the call is
    /// rejected immediately without invoking `op`; otherwise the outcome is
    /// recorded against the monitoring window.
    pub async fn execute<T, F, Fut>(&self, operation: &str, op: F) -> Result<T, GenerationError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, GenerationError>>,
    {
        self.admit(operation)?;
        let result = op().await;
        match &result {
            Ok(_) => self.record_success(),
            Err(_) => self.record_failure(),
        }
        result
    }

    /// Mutating admission check: transitions Open → HalfOpen once the
    /// recovery timeout has elapsed.
    fn admit(&self, operation: &str) -> Result<(), GenerationError> {
        let mut inner = self.inner();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => Ok(()),
            CircuitState::Open => {
                let elapsed = inner
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed >= self.config.recovery_timeout {
                    info!(breaker = %self.name, "circuit half-open, probing recovery");
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_count = 0;
                    inner.probe_successes = 0;
                    Ok(())
                } else {
                    inner.total_rejected += 1;
                    Err(GenerationError::CircuitOpen {
                        operation: operation.to_string(),
                    })
                }
            }
        }
    }

    /// Non-mutating check of whether a call would currently be admitted.
    pub fn is_available(&self) -> bool {
        let inner = self.inner();
        match inner.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => inner
                .opened_at
                .is_some_and(|at| at.elapsed() >= self.config.recovery_timeout),
        }
    }

    pub fn state(&self) -> CircuitState {
        self.inner().state
    }

    /// Force the breaker closed regardless of current state.
    pub fn manual_reset(&self) {
        let mut inner = self.inner();
        inner.state = CircuitState::Closed;
        inner.samples.clear();
        inner.opened_at = None;
        inner.probe_count = 0;
        inner.probe_successes = 0;
    }

    pub fn stats(&self) -> BreakerStats {
        let mut inner = self.inner();
        prune(&mut inner.samples, self.config.monitoring_period);
        BreakerStats {
            state: inner.state,
            window_requests: inner.samples.len() as u32,
            window_failures: inner.samples.iter().filter(|(_, failed)| *failed).count() as u32,
            rejected: inner.total_rejected,
        }
    }

    fn record_success(&self) {
        let mut inner = self.inner();
        match inner.state {
            CircuitState::Closed => {
                inner.samples.push_back((Instant::now(), false));
                prune(&mut inner.samples, self.config.monitoring_period);
            }
            CircuitState::HalfOpen => {
                inner.probe_count += 1;
                inner.probe_successes += 1;
                let ratio = f64::from(inner.probe_successes) / f64::from(inner.probe_count);
                if inner.probe_count >= self.config.half_open_probes
                    && ratio >= self.config.success_threshold
                {
                    info!(breaker = %self.name, "circuit closed after successful probes");
                    inner.state = CircuitState::Closed;
                    inner.samples.clear();
                    inner.opened_at = None;
                }
            }
            CircuitState::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut inner = self.inner();
        match inner.state {
            CircuitState::Closed => {
                inner.samples.push_back((Instant::now(), true));
                prune(&mut inner.samples, self.config.monitoring_period);
                let requests = inner.samples.len() as u32;
                let failures = inner.samples.iter().filter(|(_, failed)| *failed).count();
                let ratio = failures as f64 / f64::from(requests.max(1));
                if requests >= self.config.minimum_requests
                    && ratio >= self.config.failure_threshold
                {
                    warn!(
                        breaker = %self.name,
                        requests,
                        failures,
                        "failure ratio exceeded, circuit open"
                    );
                    inner.state = CircuitState::Open;
                    inner.opened_at = Some(Instant::now());
                }
            }
            // Any probe failure re-opens immediately.
            CircuitState::HalfOpen => {
                warn!(breaker = %self.name, "probe failed, circuit re-opened");
                inner.state = CircuitState::Open;
                inner.opened_at = Some(Instant::now());
            }
            CircuitState::Open => {}
        }
    }
}

fn prune(samples: &mut VecDeque<(Instant, bool)>, window: Duration) {
    while samples
        .front()
        .is_some_and(|(at, _)| at.elapsed() > window)
    {
        samples.pop_front();
    }
}
