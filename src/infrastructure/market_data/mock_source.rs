//! Scriptable `HistoricalDataSource` doubles standing in for the Alpaca-primary /
//! Yahoo-fallback split noted in §9. Tests seed bars per symbol and can force a
//! source to fail so `HistoricalDataManager`'s fallback path is exercised.

use crate::domain::ports::HistoricalDataSource;
use crate::domain::types::HistoricalBar;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

pub struct MockHistoricalDataSource {
    name: &'static str,
    bars: RwLock<HashMap<String, Vec<HistoricalBar>>>,
    pub fail: RwLock<bool>,
}

impl MockHistoricalDataSource {
    pub fn primary() -> Self {
        Self {
            name: "alpaca-primary",
            bars: RwLock::new(HashMap::new()),
            fail: RwLock::new(false),
        }
    }

    pub fn secondary() -> Self {
        Self {
            name: "yahoo-secondary",
            bars: RwLock::new(HashMap::new()),
            fail: RwLock::new(false),
        }
    }

    pub async fn seed(&self, symbol: &str, bars: Vec<HistoricalBar>) {
        self.bars.write().await.insert(symbol.to_string(), bars);
    }
}

#[async_trait]
impl HistoricalDataSource for MockHistoricalDataSource {
    async fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HistoricalBar>> {
        if *self.fail.read().await {
            anyhow::bail!("{} unavailable", self.name);
        }
        let bars = self.bars.read().await.get(symbol).cloned().unwrap_or_default();
        Ok(bars
            .into_iter()
            .filter(|b| b.timestamp_utc >= start && b.timestamp_utc <= end)
            .collect())
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn fetch_filters_by_range() {
        let source = MockHistoricalDataSource::primary();
        let early = Utc::now() - chrono::Duration::days(10);
        let late = Utc::now();
        source
            .seed(
                "AAPL",
                vec![HistoricalBar {
                    symbol: "AAPL".into(),
                    timestamp_utc: early,
                    open: dec!(100),
                    high: dec!(101),
                    low: dec!(99),
                    close: dec!(100),
                    volume: dec!(10),
                }],
            )
            .await;

        let result = source.fetch("AAPL", late - chrono::Duration::days(1), late).await.unwrap();
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn forced_failure_surfaces_as_error() {
        let source = MockHistoricalDataSource::secondary();
        *source.fail.write().await = true;
        assert!(source.fetch("AAPL", Utc::now(), Utc::now()).await.is_err());
    }
}
