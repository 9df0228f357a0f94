//! On-disk cache of fetched bars keyed by `(symbol, interval, range)`, stored under
//! `.backtest_cache/` (§4.9, §6). One JSON file per key; "columnar" in the sense that
//! a key addresses one contiguous OHLCV series rather than a mixed blob.

use crate::domain::types::HistoricalBar;
use anyhow::Result;
use chrono::NaiveDate;
use std::path::PathBuf;
use tokio::fs;

pub struct ColumnarCache {
    root: PathBuf,
}

impl ColumnarCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn key_path(&self, symbol: &str, interval: &str, start: NaiveDate, end: NaiveDate) -> PathBuf {
        self.root.join(format!("{symbol}_{interval}_{start}_{end}.json"))
    }

    pub async fn get(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<Vec<HistoricalBar>>> {
        let path = self.key_path(symbol, interval, start, end);
        match fs::read_to_string(&path).await {
            Ok(contents) => Ok(Some(serde_json::from_str(&contents)?)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub async fn put(
        &self,
        symbol: &str,
        interval: &str,
        start: NaiveDate,
        end: NaiveDate,
        bars: &[HistoricalBar],
    ) -> Result<()> {
        fs::create_dir_all(&self.root).await?;
        let path = self.key_path(symbol, interval, start, end);
        fs::write(&path, serde_json::to_string(bars)?).await?;
        Ok(())
    }
}
