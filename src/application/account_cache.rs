//! AccountDataCache (C3): TTL-keyed cache over buying power, positions, balance, and
//! day-trade count, with single-flight coalescing and stale-on-failure degradation.
//!
//! Grounded on the donor codebase's account-data caching layer, generalized from a
//! fixed set of fields to the `CacheEntry<T>` + per-key mutex pattern in §4.3.

use crate::application::logger::{Stream, StructuredLogger};
use crate::application::retry::{with_retry, RetryPolicy};
use crate::domain::cache::CacheEntry;
use crate::domain::errors::BrokerError;
use crate::domain::ports::BrokerAdapter;
use crate::domain::types::{AccountBalance, Position};
use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(dead_code)]
enum CacheKey {
    BuyingPower,
    Positions,
    Balance,
    DayTradesUsed,
}

impl CacheKey {
    fn ttl(self, volatile_ttl_s: i64, stable_ttl_s: i64) -> Duration {
        match self {
            CacheKey::BuyingPower => Duration::seconds(volatile_ttl_s),
            CacheKey::Positions | CacheKey::Balance | CacheKey::DayTradesUsed => {
                Duration::seconds(stable_ttl_s)
            }
        }
    }
}

#[derive(Clone)]
enum CachedValue {
    BuyingPower(Decimal),
    Positions(Vec<Position>),
    Balance(AccountBalance),
    DayTradesUsed(u8),
}

pub struct AccountDataCache {
    broker: Arc<dyn BrokerAdapter>,
    logger: Arc<StructuredLogger>,
    retry_policy: RetryPolicy,
    volatile_ttl_s: i64,
    stable_ttl_s: i64,
    entries: RwLock<HashMap<CacheKey, CacheEntry<CachedValue>>>,
    /// Per-key single-flight locks so concurrent misses on the same key coalesce into
    /// one broker call instead of a thundering herd (§4.3).
    flight: RwLock<HashMap<CacheKey, Arc<Mutex<()>>>>,
}

impl AccountDataCache {
    pub fn new(
        broker: Arc<dyn BrokerAdapter>,
        logger: Arc<StructuredLogger>,
        retry_policy: RetryPolicy,
        volatile_ttl_s: i64,
        stable_ttl_s: i64,
    ) -> Self {
        Self {
            broker,
            logger,
            retry_policy,
            volatile_ttl_s,
            stable_ttl_s,
            entries: RwLock::new(HashMap::new()),
            flight: RwLock::new(HashMap::new()),
        }
    }

    pub async fn get_buying_power(&self) -> Result<Decimal, BrokerError> {
        match self
            .get(CacheKey::BuyingPower, || async {
                let balance = self.broker.load_account_profile().await?;
                Ok(CachedValue::BuyingPower(balance.buying_power))
            })
            .await?
        {
            CachedValue::BuyingPower(v) => Ok(v),
            _ => unreachable!("CacheKey::BuyingPower always stores CachedValue::BuyingPower"),
        }
    }

    pub async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        match self
            .get(CacheKey::Positions, || async {
                Ok(CachedValue::Positions(self.broker.get_positions().await?))
            })
            .await?
        {
            CachedValue::Positions(v) => Ok(v),
            _ => unreachable!("CacheKey::Positions always stores CachedValue::Positions"),
        }
    }

    pub async fn get_balance(&self) -> Result<AccountBalance, BrokerError> {
        match self
            .get(CacheKey::Balance, || async {
                Ok(CachedValue::Balance(self.broker.load_account_profile().await?))
            })
            .await?
        {
            CachedValue::Balance(v) => Ok(v),
            _ => unreachable!("CacheKey::Balance always stores CachedValue::Balance"),
        }
    }

    pub async fn get_day_trades_used(&self) -> Result<u8, BrokerError> {
        match self
            .get(CacheKey::DayTradesUsed, || async {
                let balance = self.broker.load_account_profile().await?;
                Ok(CachedValue::DayTradesUsed(balance.day_trades_used))
            })
            .await?
        {
            CachedValue::DayTradesUsed(v) => Ok(v),
            _ => unreachable!("CacheKey::DayTradesUsed always stores CachedValue::DayTradesUsed"),
        }
    }

    /// Invalidate position/balance-derived entries (a fill or partial fill changes
    /// holdings but not necessarily the rest of the account snapshot).
    pub async fn invalidate_positions(&self) {
        let mut entries = self.entries.write().await;
        entries.remove(&CacheKey::Positions);
        entries.remove(&CacheKey::Balance);
    }

    /// Invalidate everything: called after order submission, fill, or cancel-all (§4.3).
    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    async fn get<F, Fut>(&self, key: CacheKey, fetch: F) -> Result<CachedValue, BrokerError>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<CachedValue, BrokerError>>,
    {
        let now = Utc::now();
        if let Some(entry) = self.entries.read().await.get(&key) {
            if entry.is_fresh(now) {
                return Ok(entry.value.clone());
            }
        }

        let lock = {
            let mut flight = self.flight.write().await;
            flight.entry(key).or_insert_with(|| Arc::new(Mutex::new(()))).clone()
        };
        let _guard = lock.lock().await;

        // Re-check freshness: another task may have refreshed this key while we waited
        // for the single-flight lock (coalescing, §4.3).
        let now = Utc::now();
        if let Some(entry) = self.entries.read().await.get(&key) {
            if entry.is_fresh(now) {
                return Ok(entry.value.clone());
            }
        }

        let policy = self.retry_policy;
        match with_retry(policy, &fetch, |_| {}).await {
            Ok(value) => {
                let ttl = key.ttl(self.volatile_ttl_s, self.stable_ttl_s);
                self.entries
                    .write()
                    .await
                    .insert(key, CacheEntry::new(value.clone(), now, ttl));
                Ok(value)
            }
            Err(err) if err.is_retriable() => {
                if let Some(entry) = self.entries.read().await.get(&key) {
                    warn!(?key, "serving stale account data after retry exhaustion");
                    self.logger
                        .log(
                            Stream::RiskManagement,
                            "cache.stale_served",
                            json!({"key": format!("{:?}", key)}),
                        )
                        .await;
                    return Ok(entry.value.clone());
                }
                Err(err)
            }
            Err(err) => Err(err),
        }
    }
}
