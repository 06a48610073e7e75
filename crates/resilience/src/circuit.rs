// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Circuit breaker gating publish attempts against a failing backend.
//!
//! State transitions:
//!
//! ```text
//! closed    —(consecutive failures reach threshold)→  open
//! open      —(recovery timeout elapsed)→              half_open
//! half_open —(probe succeeds)→                        closed
//! half_open —(probe fails)→                           open
//! ```
//!
//! Transitions are captured inside the lock; registered callbacks fire
//! after it is released.

use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use serde::Serialize;
use sf_core::Clock;
use tracing::{info, warn};

/// Circuit breaker states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl std::fmt::Display for CircuitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "closed"),
            CircuitState::Open => write!(f, "open"),
            CircuitState::HalfOpen => write!(f, "half_open"),
        }
    }
}

/// Point-in-time view of the breaker for introspection endpoints.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u64,
    pub failure_threshold: u32,
    pub recovery_timeout_secs: f64,
}

type StateChangeCallback = Box<dyn Fn(CircuitState, CircuitState) + Send + Sync>;

struct CircuitInner {
    state: CircuitState,
    failures: u32,
    successes: u64,
    half_open_calls: u32,
    last_failure: Option<Instant>,
}

/// Finite-state gate for a failing backend.
pub struct CircuitBreaker {
    failure_threshold: u32,
    recovery_timeout: Duration,
    half_open_max: u32,
    clock: Arc<dyn Clock>,
    inner: Mutex<CircuitInner>,
    callbacks: Mutex<Vec<StateChangeCallback>>,
}

impl CircuitBreaker {
    pub fn new(
        failure_threshold: u32,
        recovery_timeout: Duration,
        half_open_max: u32,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            failure_threshold,
            recovery_timeout,
            half_open_max,
            clock,
            inner: Mutex::new(CircuitInner {
                state: CircuitState::Closed,
                failures: 0,
                successes: 0,
                half_open_calls: 0,
                last_failure: None,
            }),
            callbacks: Mutex::new(Vec::new()),
        }
    }

    /// The stored `open` state decays to `half_open` once the recovery
    /// timeout has elapsed since the last failure.
    fn derived_state(&self, inner: &CircuitInner) -> CircuitState {
        if inner.state == CircuitState::Open {
            if let Some(last) = inner.last_failure {
                if self.clock.now().duration_since(last) >= self.recovery_timeout {
                    return CircuitState::HalfOpen;
                }
            }
        }
        inner.state
    }

    /// Current state (open decays to half_open after the recovery window).
    pub fn state(&self) -> CircuitState {
        let inner = self.inner.lock();
        self.derived_state(&inner)
    }

    /// Whether a request should be admitted. Half-open admits at most
    /// `half_open_max` probes until the next success or failure.
    pub fn allow_request(&self) -> bool {
        let mut inner = self.inner.lock();
        match self.derived_state(&inner) {
            CircuitState::Closed => true,
            CircuitState::HalfOpen => {
                if inner.half_open_calls < self.half_open_max {
                    inner.half_open_calls += 1;
                    inner.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
            CircuitState::Open => false,
        }
    }

    /// Record a successful request. Any success closes a half-open or open
    /// circuit and resets the consecutive-failure counter.
    pub fn record_success(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.successes += 1;
            inner.failures = 0;
            if inner.state != CircuitState::Closed {
                let old = self.derived_state(&inner);
                inner.state = CircuitState::Closed;
                inner.half_open_calls = 0;
                info!("circuit breaker closed (recovered)");
                Some((old, CircuitState::Closed))
            } else {
                None
            }
        };
        self.notify(transition);
    }

    /// Record a failed request.
    pub fn record_failure(&self) {
        let transition = {
            let mut inner = self.inner.lock();
            inner.failures += 1;
            inner.last_failure = Some(self.clock.now());
            let derived = self.derived_state(&inner);
            if derived == CircuitState::HalfOpen {
                inner.state = CircuitState::Open;
                inner.half_open_calls = 0;
                warn!("circuit breaker re-opened from half-open");
                Some((CircuitState::HalfOpen, CircuitState::Open))
            } else if inner.state == CircuitState::Closed
                && inner.failures >= self.failure_threshold
            {
                inner.state = CircuitState::Open;
                warn!(
                    failures = inner.failures,
                    threshold = self.failure_threshold,
                    "circuit breaker opened"
                );
                Some((CircuitState::Closed, CircuitState::Open))
            } else {
                None
            }
        };
        self.notify(transition);
    }

    fn notify(&self, transition: Option<(CircuitState, CircuitState)>) {
        if let Some((old, new)) = transition {
            for callback in self.callbacks.lock().iter() {
                callback(old, new);
            }
        }
    }

    /// Register a `(old_state, new_state)` transition callback.
    pub fn on_state_change(&self, callback: impl Fn(CircuitState, CircuitState) + Send + Sync + 'static) {
        self.callbacks.lock().push(Box::new(callback));
    }

    /// Force the breaker back to a pristine closed state.
    pub fn reset(&self) {
        let mut inner = self.inner.lock();
        inner.state = CircuitState::Closed;
        inner.failures = 0;
        inner.successes = 0;
        inner.half_open_calls = 0;
        inner.last_failure = None;
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.inner.lock();
        CircuitSnapshot {
            state: self.derived_state(&inner),
            failure_count: inner.failures,
            success_count: inner.successes,
            failure_threshold: self.failure_threshold,
            recovery_timeout_secs: self.recovery_timeout.as_secs_f64(),
        }
    }
}

#[cfg(test)]
#[path = "circuit_tests.rs"]
mod tests;
