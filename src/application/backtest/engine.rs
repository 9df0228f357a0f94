//! BacktestEngine (C9): deterministic, chronological bar iteration with next-bar-open
//! fills and no look-ahead.
//!
//! Grounded on the donor codebase's backtest runner shape (iterate bars, maintain
//! cash/positions, snapshot equity), generalized to the multi-symbol merge, exit-then-
//! entry ordering, and insufficient-capital handling in §4.9.

use super::strategy::{OpenPosition, Signal, Strategy, StrategyState};
use crate::domain::backtest::{BacktestConfig, BacktestResult, CommissionModel};
use crate::domain::performance::PerformanceMetrics;
use crate::domain::types::{HistoricalBar, Trade};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use tracing::warn;

/// One entry in the deterministic merge order: which symbol's bar, and its index
/// within that symbol's own chronological series (so "is there a next bar" is a
/// simple local lookup).
struct MergedTick {
    symbol_idx: usize,
    bar_idx: usize,
}

pub struct BacktestEngine {
    commission_model: CommissionModel,
}

impl BacktestEngine {
    pub fn new(commission_model: CommissionModel) -> Self {
        Self { commission_model }
    }

    /// Runs `strategy` over every symbol in `config.symbols`, `bars_by_symbol` keyed
    /// by the same symbol strings. Simultaneous signals across symbols break ties by
    /// `config.symbols` declaration order (§4.9 determinism guarantee).
    pub fn run(
        &self,
        config: &BacktestConfig,
        bars_by_symbol: &HashMap<String, Vec<HistoricalBar>>,
        strategy: &mut dyn Strategy,
    ) -> BacktestResult {
        let mut warnings = Vec::new();
        let empty: Vec<HistoricalBar> = Vec::new();
        let symbol_series: Vec<&[HistoricalBar]> = config
            .symbols
            .iter()
            .map(|s| bars_by_symbol.get(s).map(Vec::as_slice).unwrap_or(&empty))
            .collect();

        let mut merged: Vec<MergedTick> = Vec::new();
        for (symbol_idx, bars) in symbol_series.iter().enumerate() {
            for bar_idx in 0..bars.len() {
                merged.push(MergedTick { symbol_idx, bar_idx });
            }
        }
        merged.sort_by(|a, b| {
            let ta = symbol_series[a.symbol_idx][a.bar_idx].timestamp_utc;
            let tb = symbol_series[b.symbol_idx][b.bar_idx].timestamp_utc;
            ta.cmp(&tb).then(a.symbol_idx.cmp(&b.symbol_idx))
        });

        let strategy_id = Some(strategy.id().to_string());
        let mut cash = config.initial_capital;
        let mut positions: HashMap<String, OpenPosition> = HashMap::new();
        let mut pending_entries: HashMap<String, Signal> = HashMap::new();
        let mut pending_exits: HashSet<String> = HashSet::new();
        let mut last_close: HashMap<String, Decimal> = HashMap::new();
        let mut trades: Vec<Trade> = Vec::new();
        let mut equity_curve: Vec<(chrono::DateTime<chrono::Utc>, Decimal)> = Vec::new();

        for tick in &merged {
            let symbol = &config.symbols[tick.symbol_idx];
            let bars = symbol_series[tick.symbol_idx];
            let bar = &bars[tick.bar_idx];
            let has_next = tick.bar_idx + 1 < bars.len();
            let state = StrategyState {
                bars_so_far: &bars[..=tick.bar_idx],
            };

            // 1 & 2: apply fills scheduled by the previous tick for this symbol, at
            // this bar's open (no look-ahead: the decision used only prior data).
            if let Some(signal) = pending_entries.remove(symbol) {
                let price = bar.open;
                let qty = strategy.position_size(&signal, cash, price);
                let notional = qty * price;
                if qty > Decimal::ZERO && notional <= cash {
                    let commission = self.commission_model.commission(notional);
                    cash -= notional + commission;
                    positions.insert(
                        symbol.clone(),
                        OpenPosition {
                            symbol: symbol.clone(),
                            side: signal.side,
                            quantity: qty,
                            entry_price: price,
                            entry_time: bar.timestamp_utc,
                            reserved: notional,
                        },
                    );
                } else {
                    warnings.push(format!("{symbol}: insufficient capital for entry at {price}, skipped"));
                }
            }

            if pending_exits.remove(symbol) {
                if let Some(pos) = positions.remove(symbol) {
                    self.close_position(&pos, bar.open, bar.timestamp_utc, &strategy_id, &mut cash, &mut trades);
                }
            }

            // 3: exits are decided from this bar's close-available fields only.
            let should_exit = positions
                .get(symbol)
                .map(|pos| strategy.should_exit(pos, bar, &state))
                .unwrap_or(false);
            if should_exit {
                if has_next {
                    pending_exits.insert(symbol.clone());
                } else {
                    // No next bar to fill at: close at this bar's own close, with a warning.
                    if let Some(pos) = positions.remove(symbol) {
                        warnings.push(format!("{symbol}: exit on final bar filled at close, not next open"));
                        self.close_position(&pos, bar.close, bar.timestamp_utc, &strategy_id, &mut cash, &mut trades);
                    }
                }
            }

            // 4: entries, scheduled for the next bar's open.
            if !positions.contains_key(symbol) && !pending_entries.contains_key(symbol) {
                if let Some(signal) = strategy.should_enter(bar, &state) {
                    if has_next {
                        pending_entries.insert(symbol.clone(), signal);
                    } else {
                        warnings.push(format!("{symbol}: entry signal on final bar ignored, no next bar to fill"));
                    }
                }
            }

            // 7: equity snapshot = cash + sum(position qty * latest known close).
            last_close.insert(symbol.clone(), bar.close);
            let position_value: Decimal = positions
                .values()
                .map(|p| p.quantity * last_close.get(&p.symbol).copied().unwrap_or(p.entry_price))
                .sum();
            equity_curve.push((bar.timestamp_utc, cash + position_value));
        }

        if cash < Decimal::ZERO {
            warn!("cash went negative during backtest, this should never happen");
        }

        let equity_values: Vec<Decimal> = equity_curve.iter().map(|(_, v)| *v).collect();
        let days_elapsed = (config.end_date - config.start_date).num_days();
        let metrics = PerformanceMetrics::calculate(&trades, &equity_values, days_elapsed);

        BacktestResult {
            config: config.clone(),
            trades,
            equity_curve,
            metrics,
            warnings,
        }
    }

    fn close_position(
        &self,
        pos: &OpenPosition,
        fill_price: Decimal,
        fill_time: chrono::DateTime<chrono::Utc>,
        strategy_id: &Option<String>,
        cash: &mut Decimal,
        trades: &mut Vec<Trade>,
    ) {
        let notional = pos.quantity * fill_price;
        let commission = self.commission_model.commission(notional);
        *cash += notional - commission;
        trades.push(Trade::close(
            pos.symbol.clone(),
            pos.side,
            pos.quantity,
            pos.entry_price,
            fill_price,
            pos.entry_time,
            fill_time,
            strategy_id.clone(),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::backtest::strategy::BuyAndHold;
    use crate::domain::backtest::BarInterval;
    use chrono::{TimeZone, Utc};
    use rust_decimal_macros::dec;

    fn bar(day: u32, open: Decimal, close: Decimal) -> HistoricalBar {
        HistoricalBar {
            symbol: "AAPL".into(),
            timestamp_utc: Utc.with_ymd_and_hms(2024, 1, day, 16, 0, 0).unwrap(),
            open,
            high: open.max(close) + dec!(1),
            low: open.min(close) - dec!(1),
            close,
            volume: dec!(1000),
        }
    }

    fn config() -> BacktestConfig {
        BacktestConfig {
            symbols: vec!["AAPL".to_string()],
            start_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: chrono::NaiveDate::from_ymd_opt(2024, 1, 10).unwrap(),
            initial_capital: dec!(10_000),
            commission_model: CommissionModel::ZERO,
            bar_interval: BarInterval::Day,
            skip_gaps: false,
        }
    }

    #[test]
    fn buy_and_hold_enters_next_bar_open_not_signal_bar() {
        let bars = vec![
            bar(1, dec!(100), dec!(105)),
            bar(2, dec!(106), dec!(110)),
            bar(3, dec!(111), dec!(115)),
        ];
        let mut bars_by_symbol = HashMap::new();
        bars_by_symbol.insert("AAPL".to_string(), bars);

        let engine = BacktestEngine::new(CommissionModel::ZERO);
        let mut strategy = BuyAndHold::default();
        let result = engine.run(&config(), &bars_by_symbol, &mut strategy);

        assert_eq!(result.trades.len(), 0, "buy and hold never exits on its own");
        assert_eq!(result.equity_curve.len(), 3);
        let last_equity = result.equity_curve.last().unwrap().1;
        assert!(last_equity > dec!(10_000), "position should be up given rising closes");
    }

    #[test]
    fn insufficient_capital_skips_entry_with_warning() {
        let bars = vec![bar(1, dec!(100), dec!(100)), bar(2, dec!(1_000_000), dec!(1_000_000))];
        let mut bars_by_symbol = HashMap::new();
        bars_by_symbol.insert("AAPL".to_string(), bars);

        let engine = BacktestEngine::new(CommissionModel::ZERO);
        let mut strategy = BuyAndHold::default();
        let result = engine.run(&config(), &bars_by_symbol, &mut strategy);

        assert!(result.warnings.iter().any(|w| w.contains("insufficient capital")));
    }

    #[test]
    fn deterministic_same_inputs_same_outputs() {
        let bars = vec![bar(1, dec!(100), dec!(105)), bar(2, dec!(106), dec!(110)), bar(3, dec!(111), dec!(108))];
        let mut bars_by_symbol = HashMap::new();
        bars_by_symbol.insert("AAPL".to_string(), bars);

        let engine = BacktestEngine::new(CommissionModel::ZERO);
        let result_a = engine.run(&config(), &bars_by_symbol, &mut BuyAndHold::default());
        let result_b = engine.run(&config(), &bars_by_symbol, &mut BuyAndHold::default());

        assert_eq!(result_a.equity_curve, result_b.equity_curve);
        assert_eq!(result_a.trades, result_b.trades);
    }
}
