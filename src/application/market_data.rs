//! MarketData (C4) and TradingHoursValidator.
//!
//! Grounded on the donor codebase's market-data service layer, generalized to the
//! single peak-volatility trading window and data-quality checks from §4.4.

use crate::application::retry::{with_retry, RetryPolicy};
use crate::domain::errors::{BrokerError, MarketDataError};
use crate::domain::ports::{BrokerAdapter, HistoricalInterval, HistoricalSpan, MarketStatus};
use crate::domain::types::{HistoricalBar, Quote};
use chrono::{DateTime, Duration, NaiveTime, Utc, Weekday};
use chrono_tz::Tz;
use std::str::FromStr;
use std::sync::Arc;

/// Trades are only permitted in `[start_hour_et, end_hour_et)`, DST-aware.
#[derive(Clone, Copy)]
pub struct TradingHoursValidator {
    start: NaiveTime,
    end: NaiveTime,
    tz: Tz,
}

impl TradingHoursValidator {
    pub fn new(start_hour_et: u32, end_hour_et: u32, timezone: &str) -> Self {
        let tz = Tz::from_str(timezone).unwrap_or(chrono_tz::America::New_York);
        Self {
            start: NaiveTime::from_hms_opt(start_hour_et, 0, 0).expect("valid hour"),
            end: NaiveTime::from_hms_opt(end_hour_et, 0, 0).expect("valid hour"),
            tz,
        }
    }

    /// Upper bound is exclusive (§9 ambiguity resolution).
    pub fn within_window(&self, now_utc: DateTime<Utc>) -> bool {
        let local = now_utc.with_timezone(&self.tz).time();
        local >= self.start && local < self.end
    }

    pub fn ensure_within_window(&self, now_utc: DateTime<Utc>) -> Result<(), MarketDataError> {
        if self.within_window(now_utc) {
            Ok(())
        } else {
            Err(MarketDataError::TradingHoursError)
        }
    }
}

/// A fixed trading calendar: weekends plus the standard US market holidays used for
/// gap detection (§4.4). Not exhaustive for movable observances beyond this set;
/// extending it is a matter of adding dates, not changing the validator's shape.
pub fn is_trading_day(date: chrono::NaiveDate, holidays: &[chrono::NaiveDate]) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&date)
}

pub struct MarketData {
    broker: Arc<dyn BrokerAdapter>,
    retry_policy: RetryPolicy,
    staleness_threshold: Duration,
    pub trading_hours: TradingHoursValidator,
    holidays: Vec<chrono::NaiveDate>,
}

impl MarketData {
    pub fn new(
        broker: Arc<dyn BrokerAdapter>,
        retry_policy: RetryPolicy,
        staleness_threshold_s: i64,
        trading_hours: TradingHoursValidator,
        holidays: Vec<chrono::NaiveDate>,
    ) -> Self {
        Self {
            broker,
            retry_policy,
            staleness_threshold: Duration::seconds(staleness_threshold_s),
            trading_hours,
            holidays,
        }
    }

    pub async fn get_quote(&self, symbol: &str) -> Result<Quote, MarketDataError> {
        let quote = with_retry(self.retry_policy, || self.broker.get_latest_price(symbol), |_| {})
            .await
            .map_err(|e| MarketDataError::InvalidQuote {
                symbol: symbol.to_string(),
                reason: e.to_string(),
            })?;
        self.validate_quote(&quote)?;
        Ok(quote)
    }

    pub async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, MarketDataError> {
        let quotes = with_retry(self.retry_policy, || self.broker.get_quotes(symbols), |_| {})
            .await
            .map_err(|e| MarketDataError::InvalidQuote {
                symbol: symbols.join(","),
                reason: e.to_string(),
            })?;
        for quote in &quotes {
            self.validate_quote(quote)?;
        }
        Ok(quotes)
    }

    pub async fn get_historical(
        &self,
        symbol: &str,
        interval: HistoricalInterval,
        span: HistoricalSpan,
    ) -> Result<Vec<HistoricalBar>, MarketDataError> {
        let bars = with_retry(
            self.retry_policy,
            || self.broker.get_historical(symbol, interval, span),
            |_| {},
        )
        .await
        .map_err(|e| MarketDataError::InvalidQuote {
            symbol: symbol.to_string(),
            reason: e.to_string(),
        })?;
        self.validate_bars(symbol, &bars)?;
        Ok(bars)
    }

    pub async fn market_status(&self) -> Result<MarketStatus, BrokerError> {
        with_retry(self.retry_policy, || self.broker.get_market_hours(), |_| {}).await
    }

    fn validate_quote(&self, quote: &Quote) -> Result<(), MarketDataError> {
        if !quote.is_fresh(Utc::now(), self.staleness_threshold) {
            return Err(MarketDataError::InvalidQuote {
                symbol: quote.symbol.clone(),
                reason: "stale or non-positive price".to_string(),
            });
        }
        Ok(())
    }

    /// Validates OHLC invariants per bar, strictly increasing timestamps, and no
    /// missing trading days in the span covered by `bars`. Never returns partial data
    /// on failure (§4.4).
    fn validate_bars(&self, symbol: &str, bars: &[HistoricalBar]) -> Result<(), MarketDataError> {
        for bar in bars {
            bar.validate().map_err(|reason| MarketDataError::InvalidQuote {
                symbol: symbol.to_string(),
                reason,
            })?;
        }
        for pair in bars.windows(2) {
            if pair[1].timestamp_utc <= pair[0].timestamp_utc {
                return Err(MarketDataError::InvalidQuote {
                    symbol: symbol.to_string(),
                    reason: "bar timestamps must be strictly increasing".to_string(),
                });
            }
        }
        if let (Some(first), Some(last)) = (bars.first(), bars.last()) {
            let mut missing = Vec::new();
            let mut day = first.timestamp_utc.date_naive();
            let end = last.timestamp_utc.date_naive();
            let present: std::collections::HashSet<_> =
                bars.iter().map(|b| b.timestamp_utc.date_naive()).collect();
            while day <= end {
                if is_trading_day(day, &self.holidays) && !present.contains(&day) {
                    missing.push(day);
                }
                day += Duration::days(1);
            }
            if !missing.is_empty() {
                return Err(MarketDataError::DataQuality {
                    symbol: symbol.to_string(),
                    missing_dates: missing,
                });
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn within_window_respects_et_bounds_and_exclusive_end() {
        let validator = TradingHoursValidator::new(7, 10, "America/New_York");
        // 2024-01-15 12:30 UTC == 07:30 ET (winter, EST = UTC-5)
        let inside = Utc.with_ymd_and_hms(2024, 1, 15, 12, 30, 0).unwrap();
        assert!(validator.within_window(inside));

        // 2024-01-15 15:00 UTC == 10:00 ET exactly -> excluded
        let boundary = Utc.with_ymd_and_hms(2024, 1, 15, 15, 0, 0).unwrap();
        assert!(!validator.within_window(boundary));

        // 2024-01-15 11:30 UTC == 06:30 ET -> before window
        let before = Utc.with_ymd_and_hms(2024, 1, 15, 11, 30, 0).unwrap();
        assert!(!validator.within_window(before));
    }

    #[test]
    fn within_window_is_dst_aware() {
        let validator = TradingHoursValidator::new(7, 10, "America/New_York");
        // 2024-07-15 11:30 UTC == 07:30 EDT (summer, EDT = UTC-4)
        let inside = Utc.with_ymd_and_hms(2024, 7, 15, 11, 30, 0).unwrap();
        assert!(validator.within_window(inside));
    }

    #[test]
    fn is_trading_day_excludes_weekends_and_holidays() {
        let saturday = chrono::NaiveDate::from_ymd_opt(2024, 1, 13).unwrap();
        assert!(!is_trading_day(saturday, &[]));

        let holiday = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert!(!is_trading_day(holiday, &[holiday]));

        let weekday = chrono::NaiveDate::from_ymd_opt(2024, 1, 16).unwrap();
        assert!(is_trading_day(weekday, &[]));
    }
}
