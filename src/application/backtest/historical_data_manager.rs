//! HistoricalDataManager (part of C9): primary/secondary `HistoricalDataSource`
//! fallback backed by the on-disk `ColumnarCache`, with the same gap-detection rule
//! `MarketData` applies to live quotes (§4.4, §4.9).

use crate::application::market_data::is_trading_day;
use crate::domain::ports::HistoricalDataSource;
use crate::domain::types::HistoricalBar;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::collections::HashSet;
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

use crate::infrastructure::market_data::columnar_cache::ColumnarCache;

#[derive(Debug, Error)]
pub enum HistoricalDataError {
    #[error("both primary ({primary}) and secondary ({secondary}) sources failed for {symbol}: {reason}")]
    AllSourcesFailed {
        symbol: String,
        primary: &'static str,
        secondary: &'static str,
        reason: String,
    },

    #[error("missing bars for {symbol} on {missing_dates:?}")]
    GapDetected {
        symbol: String,
        missing_dates: Vec<NaiveDate>,
    },

    #[error(transparent)]
    Cache(#[from] anyhow::Error),
}

pub struct HistoricalDataManager {
    primary: Arc<dyn HistoricalDataSource>,
    secondary: Arc<dyn HistoricalDataSource>,
    cache: ColumnarCache,
    holidays: Vec<NaiveDate>,
}

impl HistoricalDataManager {
    pub fn new(
        primary: Arc<dyn HistoricalDataSource>,
        secondary: Arc<dyn HistoricalDataSource>,
        cache: ColumnarCache,
        holidays: Vec<NaiveDate>,
    ) -> Self {
        Self {
            primary,
            secondary,
            cache,
            holidays,
        }
    }

    /// Serves from cache when present; otherwise tries `primary` then `secondary`,
    /// caching whichever succeeds. Gaps in the trading calendar raise unless
    /// `skip_gaps` is set, in which case the run continues with a logged warning.
    pub async fn fetch(
        &self,
        symbol: &str,
        interval: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        skip_gaps: bool,
    ) -> Result<Vec<HistoricalBar>, HistoricalDataError> {
        let start_date = start.date_naive();
        let end_date = end.date_naive();

        if let Some(cached) = self.cache.get(symbol, interval, start_date, end_date).await? {
            self.check_gaps(symbol, &cached, start_date, end_date, skip_gaps)?;
            return Ok(cached);
        }

        let bars = match self.primary.fetch(symbol, start, end).await {
            Ok(bars) => bars,
            Err(primary_err) => match self.secondary.fetch(symbol, start, end).await {
                Ok(bars) => {
                    warn!(symbol = %symbol, source = self.secondary.name(), "primary historical source failed, served from secondary");
                    bars
                }
                Err(secondary_err) => {
                    return Err(HistoricalDataError::AllSourcesFailed {
                        symbol: symbol.to_string(),
                        primary: self.primary.name(),
                        secondary: self.secondary.name(),
                        reason: format!("{primary_err}; {secondary_err}"),
                    })
                }
            },
        };

        self.cache.put(symbol, interval, start_date, end_date, &bars).await?;
        self.check_gaps(symbol, &bars, start_date, end_date, skip_gaps)?;
        Ok(bars)
    }

    fn check_gaps(
        &self,
        symbol: &str,
        bars: &[HistoricalBar],
        start_date: NaiveDate,
        end_date: NaiveDate,
        skip_gaps: bool,
    ) -> Result<(), HistoricalDataError> {
        let present: HashSet<NaiveDate> = bars.iter().map(|b| b.timestamp_utc.date_naive()).collect();
        let mut missing = Vec::new();
        let mut day = start_date;
        while day <= end_date {
            if is_trading_day(day, &self.holidays) && !present.contains(&day) {
                missing.push(day);
            }
            day += Duration::days(1);
        }
        if missing.is_empty() {
            return Ok(());
        }
        if skip_gaps {
            warn!(symbol = %symbol, ?missing, "gap in historical bars, continuing per skip_gaps");
            return Ok(());
        }
        Err(HistoricalDataError::GapDetected {
            symbol: symbol.to_string(),
            missing_dates: missing,
        })
    }
}
