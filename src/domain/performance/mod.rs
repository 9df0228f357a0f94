//! Performance metrics data model (§3, §4.11) and the pure math behind them.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PerformanceMetrics {
    pub total_return: Decimal,
    pub annualized_return: f64,
    pub cagr: f64,
    pub sharpe: f64,
    pub max_drawdown: Decimal,
    pub drawdown_duration_days: i64,
    pub win_rate: f64,
    pub profit_factor: f64,
    pub avg_win: Decimal,
    pub avg_loss: Decimal,
    pub num_trades: usize,
}

/// Decimal-first statistics; floats appear only where §4.11 permits (Sharpe, report
/// rendering). Grounded on the donor codebase's `Stats` helper.
pub struct Stats;

impl Stats {
    /// Sharpe = mean(daily_returns) / stddev(daily_returns) * sqrt(252).
    pub fn sharpe_ratio(daily_returns: &[Decimal]) -> f64 {
        if daily_returns.len() < 2 {
            return 0.0;
        }
        let n = Decimal::from(daily_returns.len());
        let mean = daily_returns.iter().sum::<Decimal>() / n;
        let variance = daily_returns
            .iter()
            .map(|r| (r - mean) * (r - mean))
            .sum::<Decimal>()
            / Decimal::from(daily_returns.len() - 1);
        let std_dev = variance.to_f64().unwrap_or(0.0).sqrt();
        if std_dev <= 1e-12 {
            return 0.0;
        }
        let mean_f = mean.to_f64().unwrap_or(0.0);
        (mean_f / std_dev) * 252f64.sqrt()
    }

    /// Largest peak-to-trough decline in an equity curve, and the number of
    /// observations that drawdown persisted for.
    pub fn max_drawdown(equity_curve: &[Decimal]) -> (Decimal, i64) {
        if equity_curve.is_empty() {
            return (Decimal::ZERO, 0);
        }
        let mut peak = equity_curve[0];
        let mut max_dd = Decimal::ZERO;
        let mut peak_idx = 0usize;
        let mut max_dd_duration = 0i64;
        for (i, &equity) in equity_curve.iter().enumerate() {
            if equity > peak {
                peak = equity;
                peak_idx = i;
            }
            if peak > Decimal::ZERO {
                let dd = (peak - equity) / peak;
                if dd > max_dd {
                    max_dd = dd;
                    max_dd_duration = (i - peak_idx) as i64;
                }
            }
        }
        (max_dd, max_dd_duration)
    }

    pub fn returns_from_prices(prices: &[Decimal]) -> Vec<Decimal> {
        prices
            .windows(2)
            .filter(|w| w[0] > Decimal::ZERO)
            .map(|w| (w[1] - w[0]) / w[0])
            .collect()
    }

    /// win_rate = wins / (wins + losses + breakevens); profit_factor = gross_profit / |gross_loss|.
    pub fn win_rate_and_profit_factor(pnls: &[Decimal]) -> (f64, f64, Decimal, Decimal) {
        if pnls.is_empty() {
            return (0.0, 0.0, Decimal::ZERO, Decimal::ZERO);
        }
        let wins: Vec<Decimal> = pnls.iter().copied().filter(|p| *p > Decimal::ZERO).collect();
        let losses: Vec<Decimal> = pnls.iter().copied().filter(|p| *p < Decimal::ZERO).collect();
        let win_rate = wins.len() as f64 / pnls.len() as f64;
        let gross_profit: Decimal = wins.iter().sum();
        let gross_loss: Decimal = losses.iter().sum();
        let profit_factor = if gross_loss != Decimal::ZERO {
            (gross_profit / gross_loss.abs()).to_f64().unwrap_or(0.0)
        } else if gross_profit > Decimal::ZERO {
            f64::INFINITY
        } else {
            0.0
        };
        let avg_win = if !wins.is_empty() {
            gross_profit / Decimal::from(wins.len())
        } else {
            Decimal::ZERO
        };
        let avg_loss = if !losses.is_empty() {
            gross_loss / Decimal::from(losses.len())
        } else {
            Decimal::ZERO
        };
        (win_rate, profit_factor, avg_win, avg_loss)
    }

    /// CAGR over a span of calendar days, computed in floating point (report boundary only).
    pub fn cagr(total_return: Decimal, days: i64) -> f64 {
        if days <= 0 {
            return 0.0;
        }
        let years = days as f64 / 365.25;
        if years <= 0.0 {
            return 0.0;
        }
        let growth = (Decimal::ONE + total_return).to_f64().unwrap_or(1.0);
        if growth <= 0.0 {
            return -1.0;
        }
        growth.powf(1.0 / years) - 1.0
    }
}

impl PerformanceMetrics {
    /// Compute every metric from a trade list + equity curve (§4.11).
    pub fn calculate(
        trades: &[crate::domain::types::Trade],
        equity_curve: &[Decimal],
        days_elapsed: i64,
    ) -> Self {
        let num_trades = trades.len();
        if equity_curve.is_empty() {
            return Self::default();
        }
        let initial = equity_curve[0];
        let final_equity = *equity_curve.last().unwrap();
        let total_return = if initial > Decimal::ZERO {
            (final_equity - initial) / initial
        } else {
            Decimal::ZERO
        };

        let daily_returns = Stats::returns_from_prices(equity_curve);
        let sharpe = Stats::sharpe_ratio(&daily_returns);
        let (max_drawdown, drawdown_duration_days) = Stats::max_drawdown(equity_curve);

        let pnls: Vec<Decimal> = trades.iter().map(|t| t.pnl).collect();
        let (win_rate, profit_factor, avg_win, avg_loss) = Stats::win_rate_and_profit_factor(&pnls);

        let cagr = Stats::cagr(total_return, days_elapsed);
        let annualized_return = if days_elapsed > 0 {
            let years = days_elapsed as f64 / 365.25;
            if years > 0.0 {
                total_return.to_f64().unwrap_or(0.0) / years
            } else {
                0.0
            }
        } else {
            0.0
        };

        Self {
            total_return,
            annualized_return,
            cagr,
            sharpe,
            max_drawdown,
            drawdown_duration_days,
            win_rate,
            profit_factor,
            avg_win,
            avg_loss,
            num_trades,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sharpe_is_zero_with_constant_returns() {
        let returns = vec![dec!(0.01), dec!(0.01), dec!(0.01)];
        assert_eq!(Stats::sharpe_ratio(&returns), 0.0);
    }

    #[test]
    fn sharpe_positive_for_rising_positive_returns() {
        let returns = vec![dec!(0.01), dec!(0.02), dec!(0.01), dec!(0.03)];
        assert!(Stats::sharpe_ratio(&returns) > 0.0);
    }

    #[test]
    fn max_drawdown_finds_peak_to_trough() {
        let curve = vec![dec!(100), dec!(120), dec!(90), dec!(95), dec!(130)];
        let (dd, _) = Stats::max_drawdown(&curve);
        // (120 - 90) / 120 = 0.25
        assert_eq!(dd, dec!(0.25));
    }

    #[test]
    fn win_rate_and_profit_factor_basic() {
        let pnls = vec![dec!(100), dec!(-50), dec!(200), dec!(-50)];
        let (win_rate, pf, avg_win, avg_loss) = Stats::win_rate_and_profit_factor(&pnls);
        assert_eq!(win_rate, 0.5);
        assert_eq!(pf, 3.0); // 300 / 100
        assert_eq!(avg_win, dec!(150));
        assert_eq!(avg_loss, dec!(-50));
    }
}
