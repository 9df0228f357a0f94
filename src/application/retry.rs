//! `with_retry` + the shared `CircuitBreaker` handle (C1).
//!
//! Grounded on the donor codebase's `infrastructure::core::circuit_breaker`
//! (mutex-guarded state machine) and its retry-policy-as-value-object pattern,
//! but reworked around the typed `BrokerError` taxonomy and the rate-limit-aware
//! backoff schedule from §4.1 rather than a generic transient-middleware retry.

use crate::domain::errors::{BrokerError, RetriableError};
use crate::domain::risk::state::FailureWindow;
use chrono::Utc;
use rand::Rng;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: std::time::Duration,
    pub multiplier: f64,
    pub jitter_fraction: f64,
    pub rate_limit_aware: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: std::time::Duration::from_secs(1),
            multiplier: 2.0,
            jitter_fraction: 0.25,
            rate_limit_aware: true,
        }
    }
}

impl RetryPolicy {
    /// Delay for 1-indexed `attempt` before jitter: `base * multiplier^(attempt-1)`.
    fn scheduled_delay(&self, attempt: u32) -> std::time::Duration {
        let secs = self.base_delay.as_secs_f64() * self.multiplier.powi(attempt as i32 - 1);
        std::time::Duration::from_secs_f64(secs)
    }
}

/// Emitted by `with_retry` so callers/tests can assert on the exact backoff taken,
/// without needing to intercept `tokio::time::sleep` itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryAttempt {
    pub attempt: u32,
    pub max_attempts: u32,
    pub delay: std::time::Duration,
}

/// Retries `op` according to `policy`. Only `BrokerError::Retriable` triggers a
/// retry; non-retriable and fatal errors propagate immediately (§4.1, §7).
///
/// `on_attempt` is called before every sleep with the attempt metadata, standing in
/// for the `retry.attempt` / `retry.success` / `retry.exhausted` structured events
/// (the logger call itself lives at the call site so correlation IDs can be attached).
pub async fn with_retry<T, F, Fut>(
    policy: RetryPolicy,
    mut op: F,
    mut on_attempt: impl FnMut(RetryAttempt),
) -> Result<T, BrokerError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, BrokerError>>,
{
    let mut attempt = 1u32;
    loop {
        match op().await {
            Ok(v) => return Ok(v),
            Err(err) => {
                if !err.is_retriable() || attempt >= policy.max_attempts {
                    return Err(err);
                }
                let delay = delay_for(&policy, attempt, &err);
                on_attempt(RetryAttempt {
                    attempt,
                    max_attempts: policy.max_attempts,
                    delay,
                });
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
        }
    }
}

fn delay_for(policy: &RetryPolicy, attempt: u32, err: &BrokerError) -> std::time::Duration {
    if policy.rate_limit_aware {
        if let BrokerError::Retriable(RetriableError::RateLimit { retry_after_s }) = err {
            let secs = retry_after_s.unwrap_or(60);
            return std::time::Duration::from_secs(secs);
        }
    }
    let scheduled = policy.scheduled_delay(attempt);
    let jitter_max = scheduled.as_secs_f64() * policy.jitter_fraction;
    let jitter = rand::rng().random_range(0.0..=jitter_max.max(0.0));
    scheduled + std::time::Duration::from_secs_f64(jitter)
}

/// Circuit-breaker states consulted by `SafetyChecks` before every trade (§4.1, §4.5).
/// A single process-wide handle is shared via `Arc` across every subsystem rather than
/// relying on language-level singletons (§9).
pub struct CircuitBreakerHandle {
    inner: Mutex<FailureWindow>,
    window_s: i64,
    threshold: usize,
}

pub type SharedCircuitBreaker = Arc<CircuitBreakerHandle>;

impl CircuitBreakerHandle {
    pub fn new(window_s: i64, threshold: usize) -> SharedCircuitBreaker {
        Arc::new(Self {
            inner: Mutex::new(FailureWindow::default()),
            window_s,
            threshold,
        })
    }

    pub async fn record_failure(&self) {
        let mut w = self.inner.lock().await;
        w.record_failure(Utc::now());
    }

    pub async fn should_trip(&self) -> bool {
        let mut w = self.inner.lock().await;
        let tripped = w.should_trip(Utc::now(), self.window_s, self.threshold);
        if tripped {
            warn!(
                failures = w.failure_count(),
                window_s = self.window_s,
                "circuit breaker threshold reached"
            );
        }
        tripped
    }

    pub async fn failure_count(&self) -> usize {
        self.inner.lock().await.failure_count()
    }

    pub async fn reset(&self) {
        self.inner.lock().await.clear();
        info!("circuit breaker failure window cleared");
    }
}
