//! `CacheEntry<T>` (§3): the TTL-stamped value AccountDataCache (C3) stores per key.

use chrono::{DateTime, Utc};

/// Volatile fields (buying power, quote) refresh more eagerly than stable ones.
pub const VOLATILE_TTL_S: i64 = 60;
/// Stable fields (positions, balance) tolerate more staleness before a refetch.
pub const STABLE_TTL_S: i64 = 300;

#[derive(Debug, Clone)]
pub struct CacheEntry<T> {
    pub value: T,
    pub fetched_at: DateTime<Utc>,
    pub ttl: chrono::Duration,
}

impl<T: Clone> CacheEntry<T> {
    pub fn new(value: T, fetched_at: DateTime<Utc>, ttl: chrono::Duration) -> Self {
        Self {
            value,
            fetched_at,
            ttl,
        }
    }

    /// Fresh iff `now - fetched_at < ttl`.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now - self.fetched_at < self.ttl
    }
}
