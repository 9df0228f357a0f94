//! Persisted circuit-breaker state (§3, §4.5): `state/circuit_breaker.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CircuitBreakerState {
    pub active: bool,
    pub triggered_at: Option<DateTime<Utc>>,
    pub reason: Option<String>,
    pub reset_at: Option<DateTime<Utc>>,
}

impl Default for CircuitBreakerState {
    fn default() -> Self {
        Self {
            active: false,
            triggered_at: None,
            reason: None,
            reset_at: None,
        }
    }
}

impl CircuitBreakerState {
    pub fn tripped(reason: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            active: true,
            triggered_at: Some(now),
            reason: Some(reason.into()),
            reset_at: None,
        }
    }

    pub fn reset(now: DateTime<Utc>) -> Self {
        Self {
            active: false,
            triggered_at: None,
            reason: None,
            reset_at: Some(now),
        }
    }
}

/// Failure counter behind the shared circuit breaker (§4.1): a sliding window of
/// failure timestamps. `record_failure`/`should_trip` are the only mutators so the
/// invariant ("trip iff >= threshold failures in the last window_s") lives in one place.
#[derive(Debug, Clone, Default)]
pub struct FailureWindow {
    failures: Vec<DateTime<Utc>>,
}

impl FailureWindow {
    pub fn record_failure(&mut self, at: DateTime<Utc>) {
        self.failures.push(at);
    }

    /// Prunes entries outside the window as a side effect, then reports whether the
    /// threshold was met.
    pub fn should_trip(&mut self, now: DateTime<Utc>, window_s: i64, threshold: usize) -> bool {
        let cutoff = now - chrono::Duration::seconds(window_s);
        self.failures.retain(|t| *t >= cutoff);
        self.failures.len() >= threshold
    }

    pub fn failure_count(&self) -> usize {
        self.failures.len()
    }

    pub fn clear(&mut self) {
        self.failures.clear();
    }
}
