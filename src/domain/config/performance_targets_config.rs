use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum PerformanceTargetsConfigError {
    #[error("min_win_rate {0} must be in [0.0, 1.0]")]
    InvalidWinRate(f64),
    #[error("min_profit_factor {0} must be >= 0.0")]
    InvalidProfitFactor(f64),
    #[error("max_drawdown_pct {0} must be in (0.0, 1.0]")]
    InvalidDrawdownCeiling(f64),
}

/// Targets `PerformanceTracker` (C11) evaluates after every closed trade, emitting
/// a `performance_alert` when breached (§4.11). Breaching a target never halts
/// trading on its own; it is a log-only signal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceTargetsConfig {
    pub min_win_rate: f64,
    pub min_profit_factor: f64,
    pub max_drawdown_pct: f64,
}

impl Default for PerformanceTargetsConfig {
    fn default() -> Self {
        Self {
            min_win_rate: 0.40,
            min_profit_factor: 1.2,
            max_drawdown_pct: 0.15,
        }
    }
}

impl PerformanceTargetsConfig {
    pub fn new(min_win_rate: f64, min_profit_factor: f64, max_drawdown_pct: f64) -> Result<Self, PerformanceTargetsConfigError> {
        if !(0.0..=1.0).contains(&min_win_rate) {
            return Err(PerformanceTargetsConfigError::InvalidWinRate(min_win_rate));
        }
        if min_profit_factor < 0.0 {
            return Err(PerformanceTargetsConfigError::InvalidProfitFactor(min_profit_factor));
        }
        if !(0.0..=1.0).contains(&max_drawdown_pct) || max_drawdown_pct <= 0.0 {
            return Err(PerformanceTargetsConfigError::InvalidDrawdownCeiling(max_drawdown_pct));
        }
        Ok(Self {
            min_win_rate,
            min_profit_factor,
            max_drawdown_pct,
        })
    }
}
