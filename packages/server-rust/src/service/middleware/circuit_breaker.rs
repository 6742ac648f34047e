//! Circuit-breaker middleware for operations.
//!
//! State machine:
//!
//! ```text
//! Closed   -> Open      failure_threshold consecutive failures within `window`
//! Open     -> HalfOpen  after `cooldown`
//! HalfOpen -> Closed    success_threshold consecutive trial successes
//! HalfOpen -> Open      any trial failure
//! ```
//!
//! Only pipeline failures (`Timeout`, `Internal`, `WrongOperation`) count as
//! failures. A business error inside the envelope is a successful call, and a
//! `RateLimited` rejection from an inner stage is not recorded at all.

use std::sync::Arc;
use std::task::{Context, Poll};

use parking_lot::Mutex;
use tokio::time::Instant;
use tower::{Layer, Service};
use tracing::info;

use super::OperationFuture;
use crate::service::config::BreakerConfig;
use crate::service::operation::{Operation, OperationError, OperationResponse};

// ---------------------------------------------------------------------------
// CircuitBreaker
// ---------------------------------------------------------------------------

/// Observable breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        }
    }
}

/// How a completed call affects the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    Ignored,
}

impl Outcome {
    fn of(result: &Result<OperationResponse, OperationError>) -> Self {
        match result {
            Ok(_) => Self::Success,
            Err(e) if e.is_rejection() => Self::Ignored,
            Err(_) => Self::Failure,
        }
    }
}

/// Ticket issued when a call is admitted.
///
/// Results from an older generation are discarded so a slow call cannot
/// affect the state it was not admitted under.
#[derive(Debug, Clone, Copy)]
struct Admission {
    generation: u64,
    trial: bool,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    generation: u64,
    consecutive_failures: u32,
    consecutive_successes: u32,
    trials_in_flight: u32,
    /// When the current state (or closed-state window) began.
    since: Instant,
}

/// Shared failure-isolation state for one endpoint.
#[derive(Debug)]
pub struct CircuitBreaker {
    name: &'static str,
    config: BreakerConfig,
    state: Mutex<BreakerState>,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        Self {
            name,
            config: config.normalized(),
            state: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                generation: 0,
                consecutive_failures: 0,
                consecutive_successes: 0,
                trials_in_flight: 0,
                since: Instant::now(),
            }),
        }
    }

    /// Current state, applying any elapsed cooldown or window.
    #[must_use]
    pub fn state(&self) -> CircuitState {
        let mut s = self.state.lock();
        self.refresh(&mut s, Instant::now());
        s.state
    }

    fn admit(&self) -> Result<Admission, OperationError> {
        let mut s = self.state.lock();
        self.refresh(&mut s, Instant::now());

        match s.state {
            CircuitState::Closed => Ok(Admission {
                generation: s.generation,
                trial: false,
            }),
            CircuitState::Open => Err(OperationError::CircuitOpen),
            CircuitState::HalfOpen => {
                if s.trials_in_flight >= self.config.half_open_max_calls {
                    return Err(OperationError::CircuitOpen);
                }
                s.trials_in_flight += 1;
                Ok(Admission {
                    generation: s.generation,
                    trial: true,
                })
            }
        }
    }

    fn record(&self, admission: Admission, outcome: Outcome) {
        let mut s = self.state.lock();
        let now = Instant::now();
        self.refresh(&mut s, now);

        if s.generation != admission.generation {
            return;
        }
        if admission.trial {
            s.trials_in_flight = s.trials_in_flight.saturating_sub(1);
        }

        match (s.state, outcome) {
            (_, Outcome::Ignored) => {}
            (CircuitState::Closed, Outcome::Success) => s.consecutive_failures = 0,
            (CircuitState::Closed, Outcome::Failure) => {
                s.consecutive_failures += 1;
                if s.consecutive_failures >= self.config.failure_threshold {
                    self.transition(&mut s, CircuitState::Open, now);
                }
            }
            (CircuitState::HalfOpen, Outcome::Success) => {
                s.consecutive_successes += 1;
                if s.consecutive_successes >= self.config.success_threshold {
                    self.transition(&mut s, CircuitState::Closed, now);
                }
            }
            (CircuitState::HalfOpen, Outcome::Failure) => {
                self.transition(&mut s, CircuitState::Open, now);
            }
            (CircuitState::Open, _) => {}
        }
    }

    fn refresh(&self, s: &mut BreakerState, now: Instant) {
        match s.state {
            CircuitState::Closed if now.duration_since(s.since) >= self.config.window => {
                s.generation += 1;
                s.consecutive_failures = 0;
                s.since = now;
            }
            CircuitState::Open if now.duration_since(s.since) >= self.config.cooldown => {
                self.transition(s, CircuitState::HalfOpen, now);
            }
            _ => {}
        }
    }

    fn transition(&self, s: &mut BreakerState, to: CircuitState, now: Instant) {
        info!(
            endpoint = self.name,
            from = s.state.as_str(),
            to = to.as_str(),
            "circuit breaker state change"
        );
        s.state = to;
        s.generation += 1;
        s.consecutive_failures = 0;
        s.consecutive_successes = 0;
        s.trials_in_flight = 0;
        s.since = now;
    }
}

/// Records `Ignored` if the call future is dropped before completing, so a
/// cancelled trial call does not hold its half-open slot forever.
struct AdmissionGuard {
    breaker: Arc<CircuitBreaker>,
    admission: Option<Admission>,
}

impl AdmissionGuard {
    fn complete(mut self, outcome: Outcome) {
        if let Some(admission) = self.admission.take() {
            self.breaker.record(admission, outcome);
        }
    }
}

impl Drop for AdmissionGuard {
    fn drop(&mut self) {
        if let Some(admission) = self.admission.take() {
            self.breaker.record(admission, Outcome::Ignored);
        }
    }
}

// ---------------------------------------------------------------------------
// CircuitBreakerLayer
// ---------------------------------------------------------------------------

/// Tower layer that guards the inner service with a [`CircuitBreaker`].
#[derive(Debug, Clone)]
pub struct CircuitBreakerLayer {
    breaker: Arc<CircuitBreaker>,
}

impl CircuitBreakerLayer {
    #[must_use]
    pub fn new(name: &'static str, config: BreakerConfig) -> Self {
        Self {
            breaker: Arc::new(CircuitBreaker::new(name, config)),
        }
    }

    /// Shared handle to the breaker state.
    #[must_use]
    pub fn breaker(&self) -> Arc<CircuitBreaker> {
        Arc::clone(&self.breaker)
    }
}

impl<S> Layer<S> for CircuitBreakerLayer {
    type Service = CircuitBreakerService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        CircuitBreakerService {
            inner,
            breaker: Arc::clone(&self.breaker),
        }
    }
}

// ---------------------------------------------------------------------------
// CircuitBreakerService
// ---------------------------------------------------------------------------

/// Service wrapper that short-circuits with `OperationError::CircuitOpen`
/// while the breaker is open.
#[derive(Debug, Clone)]
pub struct CircuitBreakerService<S> {
    inner: S,
    breaker: Arc<CircuitBreaker>,
}

impl<S> Service<Operation> for CircuitBreakerService<S>
where
    S: Service<Operation, Response = OperationResponse, Error = OperationError> + Send,
    S::Future: Send + 'static,
{
    type Response = OperationResponse;
    type Error = OperationError;
    type Future = OperationFuture;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, op: Operation) -> Self::Future {
        let admission = match self.breaker.admit() {
            Ok(admission) => admission,
            Err(e) => return Box::pin(async move { Err(e) }),
        };
        let guard = AdmissionGuard {
            breaker: Arc::clone(&self.breaker),
            admission: Some(admission),
        };

        let fut = self.inner.call(op);
        Box::pin(async move {
            let result = fut.await;
            guard.complete(Outcome::of(&result));
            result
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
