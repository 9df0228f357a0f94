//! SessionHealth (C7): periodic session probe, single-shot reauth, health metrics.
//!
//! Grounded on the donor codebase's session-management service (a timer task plus
//! a synchronous pre-trade probe sharing one circuit breaker), generalized to the
//! probe/reauth/threshold contract in §4.7.

use crate::application::logger::{Level, Stream, StructuredLogger};
use crate::application::retry::{with_retry, RetryPolicy, SharedCircuitBreaker};
use crate::domain::ports::BrokerAdapter;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{error, info};

#[derive(Debug, Clone)]
pub struct HealthStatus {
    pub is_healthy: bool,
    pub session_start: DateTime<Utc>,
    pub uptime_s: i64,
    pub last_check: Option<DateTime<Utc>>,
    pub checks: u64,
    pub reauth_count: u32,
    pub consecutive_failures: u32,
}

pub struct SessionHealth {
    broker: Arc<dyn BrokerAdapter>,
    retry_policy: RetryPolicy,
    circuit_breaker: SharedCircuitBreaker,
    logger: Arc<StructuredLogger>,
    session_start: DateTime<Utc>,
    last_check: RwLock<Option<DateTime<Utc>>>,
    checks: AtomicU64,
    reauth_count: AtomicU32,
    consecutive_failures: AtomicU32,
    healthy: RwLock<bool>,
    timer: RwLock<Option<JoinHandle<()>>>,
}

impl SessionHealth {
    pub fn new(broker: Arc<dyn BrokerAdapter>, retry_policy: RetryPolicy, circuit_breaker: SharedCircuitBreaker, logger: Arc<StructuredLogger>) -> Arc<Self> {
        Arc::new(Self {
            broker,
            retry_policy,
            circuit_breaker,
            logger,
            session_start: Utc::now(),
            last_check: RwLock::new(None),
            checks: AtomicU64::new(0),
            reauth_count: AtomicU32::new(0),
            consecutive_failures: AtomicU32::new(0),
            healthy: RwLock::new(true),
            timer: RwLock::new(None),
        })
    }

    /// Schedules a periodic probe every `interval_s`. Probes are also invoked
    /// synchronously before every `TradingBot.execute_trade()` via `probe_once`.
    pub async fn start(self: &Arc<Self>, interval_s: u64) {
        let this = self.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_s));
            loop {
                ticker.tick().await;
                this.probe_once().await;
            }
        });
        *self.timer.write().await = Some(handle);
    }

    pub async fn stop(&self) {
        if let Some(handle) = self.timer.write().await.take() {
            handle.abort();
        }
    }

    /// Probes the session once. On retry exhaustion, attempts exactly one
    /// reauthentication; on that failure, records a circuit-breaker failure (§4.7).
    /// Probe latency is logged; credentials/tokens never appear in any log line.
    pub async fn probe_once(&self) -> bool {
        let started = std::time::Instant::now();
        let result = with_retry(self.retry_policy, || self.broker.probe_session(), |_| {}).await;
        let latency_ms = started.elapsed().as_millis();

        *self.last_check.write().await = Some(Utc::now());
        self.checks.fetch_add(1, Ordering::SeqCst);

        match result {
            Ok(()) => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
                *self.healthy.write().await = true;
                self.logger
                    .log(Stream::HealthCheck, "health.passed", json!({"latency_ms": latency_ms}))
                    .await;
                true
            }
            Err(_) => {
                if self.broker.reauthenticate().await.is_ok() {
                    self.reauth_count.fetch_add(1, Ordering::SeqCst);
                    self.consecutive_failures.store(0, Ordering::SeqCst);
                    *self.healthy.write().await = true;
                    info!("reauthenticated after probe failure");
                    true
                } else {
                    self.consecutive_failures.fetch_add(1, Ordering::SeqCst);
                    *self.healthy.write().await = false;
                    self.circuit_breaker.record_failure().await;
                    error!("session probe failed and reauthentication did not recover it");
                    self.logger
                        .log_at(
                            Stream::HealthCheck,
                            "health.failed",
                            json!({"latency_ms": latency_ms}),
                            Level::Error,
                        )
                        .await;
                    false
                }
            }
        }
    }

    pub async fn status(&self) -> HealthStatus {
        HealthStatus {
            is_healthy: *self.healthy.read().await,
            session_start: self.session_start,
            uptime_s: (Utc::now() - self.session_start).num_seconds(),
            last_check: *self.last_check.read().await,
            checks: self.checks.load(Ordering::SeqCst),
            reauth_count: self.reauth_count.load(Ordering::SeqCst),
            consecutive_failures: self.consecutive_failures.load(Ordering::SeqCst),
        }
    }
}
