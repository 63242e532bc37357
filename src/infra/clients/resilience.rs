//! Circuit breaking and bounded retry for outbound collaborator calls.
//!
//! Only transient failures (transport errors, 5xx) trip the breaker and are
//! retried. A collaborator that answers with a definite client error is
//! healthy as far as the breaker is concerned.

use std::future::Future;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tokio::time::sleep;
use tracing::{info, warn};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    failure_count: usize,
    opened_at: Option<Instant>,
    /// Set while the half-open trial call is outstanding.
    trial_started_at: Option<Instant>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: usize,
    open_duration: Duration,
    state: RwLock<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: usize, open_duration: Duration) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            open_duration,
            state: RwLock::new(BreakerState {
                state: CircuitState::Closed,
                failure_count: 0,
                opened_at: None,
                trial_started_at: None,
            }),
        }
    }

    pub async fn state(&self) -> CircuitState {
        self.state.read().await.state
    }

    /// Open circuits let a single trial call through once `open_duration` has
    /// elapsed. Other callers are rejected until that call reports back; a
    /// trial that never reports (its future was dropped) is replaced after
    /// another `open_duration`.
    async fn can_attempt(&self) -> bool {
        let mut state = self.state.write().await;
        match state.state {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                let stale = state.trial_started_at.is_none_or(|t| t.elapsed() >= self.open_duration);
                if stale {
                    state.trial_started_at = Some(Instant::now());
                }
                stale
            }
            CircuitState::Open => {
                let elapsed = state.opened_at.is_some_and(|t| t.elapsed() >= self.open_duration);
                if elapsed {
                    info!("Circuit breaker transitioning OPEN -> HALF_OPEN");
                    state.state = CircuitState::HalfOpen;
                    state.trial_started_at = Some(Instant::now());
                }
                elapsed
            }
        }
    }

    async fn on_success(&self) {
        let mut state = self.state.write().await;
        if state.state == CircuitState::HalfOpen {
            info!("Circuit breaker transitioning HALF_OPEN -> CLOSED");
        }
        state.state = CircuitState::Closed;
        state.failure_count = 0;
        state.opened_at = None;
        state.trial_started_at = None;
    }

    async fn on_failure(&self) {
        let mut state = self.state.write().await;
        state.failure_count += 1;
        state.trial_started_at = None;

        match state.state {
            CircuitState::Closed if state.failure_count >= self.failure_threshold => {
                warn!(failures = state.failure_count, "Circuit breaker transitioning CLOSED -> OPEN");
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                warn!("Circuit breaker transitioning HALF_OPEN -> OPEN (trial call failed)");
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, the first call included.
    pub max_attempts: usize,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(2),
            multiplier: 2.0,
        }
    }
}

impl RetryPolicy {
    pub fn with_attempts(max_attempts: usize) -> Self {
        Self { max_attempts: max_attempts.max(1), ..Self::default() }
    }

    /// delay = initial * multiplier^attempt, capped at `max_delay`.
    pub fn delay_for_attempt(&self, attempt: usize) -> Duration {
        let factor = self.multiplier.powi(attempt.min(30) as i32);
        let delay = Duration::from_millis((self.initial_delay.as_millis() as f64 * factor) as u64);
        delay.min(self.max_delay)
    }
}

/// Outcome of a single hop as classified by the caller.
#[derive(Debug)]
pub enum HopError {
    Transient(String),
    Permanent(AppError),
}

/// Breaker and retry policy owned by one collaborator.
#[derive(Debug)]
pub struct Resilience {
    name: &'static str,
    breaker: CircuitBreaker,
    retry: RetryPolicy,
}

impl Resilience {
    pub fn new(name: &'static str, breaker: CircuitBreaker, retry: RetryPolicy) -> Self {
        Self { name, breaker, retry }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub async fn circuit_state(&self) -> CircuitState {
        self.breaker.state().await
    }

    pub async fn run<F, Fut, T>(&self, mut operation: F) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, HopError>>,
    {
        let mut attempt = 0;
        loop {
            if !self.breaker.can_attempt().await {
                warn!(collaborator = self.name, "Circuit open, rejecting call");
                return Err(AppError::DependencyUnavailable(format!("{} is unavailable (circuit open)", self.name)));
            }

            match operation().await {
                Ok(value) => {
                    self.breaker.on_success().await;
                    return Ok(value);
                }
                Err(HopError::Permanent(err)) => {
                    self.breaker.on_success().await;
                    return Err(err);
                }
                Err(HopError::Transient(reason)) => {
                    self.breaker.on_failure().await;
                    attempt += 1;
                    if attempt >= self.retry.max_attempts {
                        warn!(collaborator = self.name, attempt, "Giving up: {}", reason);
                        return Err(AppError::DependencyUnavailable(format!("{} is unavailable: {}", self.name, reason)));
                    }
                    let delay = self.retry.delay_for_attempt(attempt - 1);
                    warn!(collaborator = self.name, attempt, delay_ms = delay.as_millis() as u64, "Retrying after: {}", reason);
                    sleep(delay).await;
                }
            }
        }
    }
}
