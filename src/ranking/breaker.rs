//! Circuit breaker guarding a single metric provider.
//!
//! One breaker instance exists per provider for the lifetime of the process.
//! State is owned and synchronized here and injected into the resolver, so
//! independent engine instances can carry independent breakers.

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Circuit state. Transitions are the only mutations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn label(self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Breaker tuning, injected per provider.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before a recovery probe.
    pub cooldown: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::seconds(60),
        }
    }
}

/// Whether a caller may invoke the provider right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallPermit {
    Allowed,
    ShortCircuit,
}

/// A state transition, reported so the resolver can notify observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitTransition {
    pub from: CircuitState,
    pub to: CircuitState,
}

/// Point-in-time view for health reporting.
#[derive(Debug, Clone, Serialize)]
pub struct CircuitStatus {
    pub provider: String,
    pub state: CircuitState,
    pub consecutive_failures: u32,
}

#[derive(Debug)]
struct Inner {
    state: CircuitState,
    consecutive_failures: u32,
    opened_at: Option<DateTime<Utc>>,
    trial_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    provider: String,
    config: CircuitBreakerConfig,
    inner: Mutex<Inner>,
}

impl CircuitBreaker {
    pub fn new(provider: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            provider: provider.into(),
            config,
            inner: Mutex::new(Inner {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                opened_at: None,
                trial_in_flight: false,
            }),
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn state(&self) -> CircuitState {
        self.lock().state
    }

    pub fn status(&self) -> CircuitStatus {
        let inner = self.lock();
        CircuitStatus {
            provider: self.provider.clone(),
            state: inner.state,
            consecutive_failures: inner.consecutive_failures,
        }
    }

    /// Decide whether a live call may proceed at `now`.
    ///
    /// At most one trial call is permitted while half-open; concurrent
    /// callers observing a pending trial short-circuit to fallback rather
    /// than queue.
    pub fn try_acquire(&self, now: DateTime<Utc>) -> (CallPermit, Option<CircuitTransition>) {
        let mut inner = self.lock();
        match inner.state {
            CircuitState::Closed => (CallPermit::Allowed, None),
            CircuitState::Open => {
                let cooldown_elapsed = inner
                    .opened_at
                    .map(|opened| now - opened >= self.config.cooldown)
                    .unwrap_or(true);
                if cooldown_elapsed {
                    let transition = Self::transition(&mut inner, CircuitState::HalfOpen);
                    inner.trial_in_flight = true;
                    (CallPermit::Allowed, transition)
                } else {
                    (CallPermit::ShortCircuit, None)
                }
            }
            CircuitState::HalfOpen => {
                if inner.trial_in_flight {
                    (CallPermit::ShortCircuit, None)
                } else {
                    inner.trial_in_flight = true;
                    (CallPermit::Allowed, None)
                }
            }
        }
    }

    /// Record a successful live call.
    pub fn record_success(&self) -> Option<CircuitTransition> {
        let mut inner = self.lock();
        inner.consecutive_failures = 0;
        inner.trial_in_flight = false;
        match inner.state {
            CircuitState::Closed => None,
            // A single successful probe closes the circuit.
            CircuitState::HalfOpen | CircuitState::Open => {
                inner.opened_at = None;
                Self::transition(&mut inner, CircuitState::Closed)
            }
        }
    }

    /// Record a failed (or timed-out) live call.
    pub fn record_failure(&self, now: DateTime<Utc>) -> Option<CircuitTransition> {
        let mut inner = self.lock();
        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        inner.trial_in_flight = false;
        match inner.state {
            CircuitState::Closed => {
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.opened_at = Some(now);
                    Self::transition(&mut inner, CircuitState::Open)
                } else {
                    None
                }
            }
            // A failed probe reopens the circuit with a fresh cooldown.
            CircuitState::HalfOpen => {
                inner.opened_at = Some(now);
                Self::transition(&mut inner, CircuitState::Open)
            }
            CircuitState::Open => None,
        }
    }

    fn transition(inner: &mut Inner, to: CircuitState) -> Option<CircuitTransition> {
        if inner.state == to {
            return None;
        }
        let from = inner.state;
        inner.state = to;
        Some(CircuitTransition { from, to })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned lock means another resolution panicked; the breaker
        // state itself is still a consistent snapshot.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
