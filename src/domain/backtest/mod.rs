//! Data model for the backtest engine (C9) and orchestrator (C10), §3.

use crate::domain::performance::PerformanceMetrics;
use crate::domain::types::Trade;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BarInterval {
    FiveMinute,
    TenMinute,
    Day,
    Week,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CommissionModel {
    /// Flat fee per trade, plus a proportional fee on notional value.
    pub flat_fee: Decimal,
    pub pct_fee: Decimal,
}

impl CommissionModel {
    pub const ZERO: CommissionModel = CommissionModel {
        flat_fee: Decimal::ZERO,
        pct_fee: Decimal::ZERO,
    };

    pub fn commission(&self, notional: Decimal) -> Decimal {
        self.flat_fee + notional * self.pct_fee
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BacktestConfigError {
    #[error("symbols must not be empty")]
    NoSymbols,
    #[error("start_date {start} must be before end_date {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("initial_capital must be > 0")]
    InvalidCapital,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub symbols: Vec<String>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub initial_capital: Decimal,
    pub commission_model: CommissionModel,
    pub bar_interval: BarInterval,
    /// If true, gap detection warns and continues instead of aborting (§4.9).
    pub skip_gaps: bool,
}

impl BacktestConfig {
    pub fn validate(&self) -> Result<(), BacktestConfigError> {
        if self.symbols.is_empty() {
            return Err(BacktestConfigError::NoSymbols);
        }
        if self.start_date >= self.end_date {
            return Err(BacktestConfigError::InvalidDateRange {
                start: self.start_date,
                end: self.end_date,
            });
        }
        if self.initial_capital <= Decimal::ZERO {
            return Err(BacktestConfigError::InvalidCapital);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestResult {
    pub config: BacktestConfig,
    pub trades: Vec<Trade>,
    pub equity_curve: Vec<(DateTime<Utc>, Decimal)>,
    pub metrics: PerformanceMetrics,
    pub warnings: Vec<String>,
}

/// Capital budget exclusively reserved for one strategy inside the orchestrator (C10).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyAllocation {
    pub strategy_id: String,
    pub weight: Decimal,
    pub allocated: Decimal,
    pub used: Decimal,
    pub available: Decimal,
}

impl StrategyAllocation {
    pub fn new(strategy_id: impl Into<String>, weight: Decimal, capital: Decimal) -> Self {
        let allocated = capital * weight;
        Self {
            strategy_id: strategy_id.into(),
            weight,
            allocated,
            used: Decimal::ZERO,
            available: allocated,
        }
    }

    pub fn reserve(&mut self, amount: Decimal) -> bool {
        if amount > self.available {
            return false;
        }
        self.available -= amount;
        self.used += amount;
        true
    }

    /// Return capital (including realized P&L) for a closed position.
    pub fn release(&mut self, amount_with_pnl: Decimal, original_reservation: Decimal) {
        self.used -= original_reservation;
        self.available += amount_with_pnl;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorResult {
    pub per_strategy: HashMap<String, BacktestResult>,
    pub portfolio_metrics: PerformanceMetrics,
    pub portfolio_equity_curve: Vec<(DateTime<Utc>, Decimal)>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn rejects_empty_symbols() {
        let cfg = BacktestConfig {
            symbols: vec![],
            start_date: NaiveDate::from_ymd_opt(2023, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2023, 12, 31).unwrap(),
            initial_capital: dec!(10000),
            commission_model: CommissionModel::ZERO,
            bar_interval: BarInterval::Day,
            skip_gaps: false,
        };
        assert_eq!(cfg.validate(), Err(BacktestConfigError::NoSymbols));
    }

    #[test]
    fn allocation_reserve_and_release_tracks_available() {
        let mut alloc = StrategyAllocation::new("A", dec!(0.6), dec!(100_000));
        assert_eq!(alloc.allocated, dec!(60_000));
        assert!(alloc.reserve(dec!(50_000)));
        assert_eq!(alloc.available, dec!(10_000));
        assert!(!alloc.reserve(dec!(20_000)));

        alloc.release(dec!(55_000), dec!(50_000));
        assert_eq!(alloc.used, dec!(0));
        assert_eq!(alloc.available, dec!(65_000));
    }
}
