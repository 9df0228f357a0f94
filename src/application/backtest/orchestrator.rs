//! StrategyOrchestrator (C10): runs N strategies over the same bar universe, each
//! confined to its own capital allocation.
//!
//! Grounded on `BacktestEngine`'s merged-tick iteration (§4.9), generalized so every
//! tick is offered to each strategy in declaration order against its own
//! `StrategyAllocation` rather than a single shared cash pool (§4.10).

use super::strategy::{OpenPosition, Signal, Strategy, StrategyState};
use crate::domain::backtest::{BacktestConfig, BacktestResult, CommissionModel, OrchestratorResult, StrategyAllocation};
use crate::domain::performance::PerformanceMetrics;
use crate::domain::types::{HistoricalBar, Trade};
use rust_decimal::Decimal;
use std::collections::{HashMap, HashSet};
use thiserror::Error;
use tracing::warn;

#[derive(Debug, Error, PartialEq)]
pub enum OrchestratorError {
    #[error("strategy weight for {strategy_id} must be > 0, got {weight}")]
    NonPositiveWeight { strategy_id: String, weight: Decimal },

    #[error("strategy weights sum to {total}, which exceeds 1.0")]
    WeightsExceedOne { total: Decimal },

    #[error("no strategies configured")]
    NoStrategies,
}

struct MergedTick {
    symbol_idx: usize,
    bar_idx: usize,
}

pub struct StrategyOrchestrator {
    commission_model: CommissionModel,
    entries: Vec<(String, Decimal, Box<dyn Strategy>)>,
}

impl StrategyOrchestrator {
    /// `entries` is `(strategy_id, weight, strategy)` in the declaration order that
    /// governs tie-breaking when multiple strategies act on the same bar.
    pub fn new(
        entries: Vec<(String, Decimal, Box<dyn Strategy>)>,
        commission_model: CommissionModel,
    ) -> Result<Self, OrchestratorError> {
        if entries.is_empty() {
            return Err(OrchestratorError::NoStrategies);
        }
        let mut total = Decimal::ZERO;
        for (strategy_id, weight, _) in &entries {
            if *weight <= Decimal::ZERO {
                return Err(OrchestratorError::NonPositiveWeight {
                    strategy_id: strategy_id.clone(),
                    weight: *weight,
                });
            }
            total += *weight;
        }
        if total > Decimal::ONE {
            return Err(OrchestratorError::WeightsExceedOne { total });
        }
        Ok(Self { commission_model, entries })
    }

    pub fn run(
        &mut self,
        config: &BacktestConfig,
        bars_by_symbol: &HashMap<String, Vec<HistoricalBar>>,
    ) -> OrchestratorResult {
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

        let mut allocations: HashMap<String, StrategyAllocation> = self
            .entries
            .iter()
            .map(|(id, weight, _)| (id.clone(), StrategyAllocation::new(id.clone(), *weight, config.initial_capital)))
            .collect();
        let mut positions: HashMap<(String, String), OpenPosition> = HashMap::new();
        let mut pending_entries: HashMap<(String, String), Signal> = HashMap::new();
        let mut pending_exits: HashSet<(String, String)> = HashSet::new();
        let mut last_close: HashMap<String, Decimal> = HashMap::new();
        let mut trades_by_strategy: HashMap<String, Vec<Trade>> = HashMap::new();
        let mut equity_by_strategy: HashMap<String, Vec<(chrono::DateTime<chrono::Utc>, Decimal)>> = HashMap::new();
        let mut warnings_by_strategy: HashMap<String, Vec<String>> = HashMap::new();
        for (id, _, _) in &self.entries {
            trades_by_strategy.insert(id.clone(), Vec::new());
            equity_by_strategy.insert(id.clone(), Vec::new());
            warnings_by_strategy.insert(id.clone(), Vec::new());
        }

        for tick in &merged {
            let symbol = &config.symbols[tick.symbol_idx];
            let bars = symbol_series[tick.symbol_idx];
            let bar = &bars[tick.bar_idx];
            let has_next = tick.bar_idx + 1 < bars.len();
            let state = StrategyState {
                bars_so_far: &bars[..=tick.bar_idx],
            };

            for (strategy_id, _, strategy) in self.entries.iter_mut() {
                let key = (strategy_id.clone(), symbol.clone());
                let allocation = allocations.get_mut(strategy_id).expect("allocation exists for every declared strategy");
                let trades = trades_by_strategy.get_mut(strategy_id).expect("trade list exists for every declared strategy");
                let warnings = warnings_by_strategy.get_mut(strategy_id).expect("warning list exists for every declared strategy");

                if let Some(signal) = pending_entries.remove(&key) {
                    let price = bar.open;
                    let qty = strategy.position_size(&signal, allocation.available, price);
                    let notional = qty * price;
                    if qty > Decimal::ZERO && allocation.reserve(notional) {
                        positions.insert(
                            key.clone(),
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
                        warn!(strategy_id = %strategy_id, symbol = %symbol, "capital_limit_hit");
                        warnings.push(format!("{strategy_id}/{symbol}: capital_limit_hit on entry at {price}"));
                    }
                }

                if pending_exits.remove(&key) {
                    if let Some(pos) = positions.remove(&key) {
                        Self::close(&self.commission_model, &pos, bar.open, bar.timestamp_utc, strategy_id, allocation, trades);
                    }
                }

                let should_exit = positions
                    .get(&key)
                    .map(|pos| strategy.should_exit(pos, bar, &state))
                    .unwrap_or(false);
                if should_exit {
                    if has_next {
                        pending_exits.insert(key.clone());
                    } else if let Some(pos) = positions.remove(&key) {
                        warnings.push(format!("{strategy_id}/{symbol}: exit on final bar filled at close, not next open"));
                        Self::close(&self.commission_model, &pos, bar.close, bar.timestamp_utc, strategy_id, allocation, trades);
                    }
                }

                if !positions.contains_key(&key) && !pending_entries.contains_key(&key) {
                    if let Some(signal) = strategy.should_enter(bar, &state) {
                        if has_next {
                            pending_entries.insert(key.clone(), signal);
                        } else {
                            warnings.push(format!("{strategy_id}/{symbol}: entry signal on final bar ignored, no next bar to fill"));
                        }
                    }
                }
            }

            last_close.insert(symbol.clone(), bar.close);
            for (strategy_id, _, _) in &self.entries {
                let allocation = &allocations[strategy_id];
                let position_value: Decimal = positions
                    .iter()
                    .filter(|((sid, _), _)| sid == strategy_id)
                    .map(|(_, p)| p.quantity * last_close.get(&p.symbol).copied().unwrap_or(p.entry_price))
                    .sum();
                equity_by_strategy
                    .get_mut(strategy_id)
                    .expect("equity curve exists for every declared strategy")
                    .push((bar.timestamp_utc, allocation.available + position_value));
            }
        }

        let mut per_strategy = HashMap::new();
        let mut portfolio_points: HashMap<chrono::DateTime<chrono::Utc>, Decimal> = HashMap::new();
        for (strategy_id, _, _) in &self.entries {
            let trades = trades_by_strategy.remove(strategy_id).unwrap_or_default();
            let equity_curve = equity_by_strategy.remove(strategy_id).unwrap_or_default();
            let warnings = warnings_by_strategy.remove(strategy_id).unwrap_or_default();
            for (ts, equity) in &equity_curve {
                *portfolio_points.entry(*ts).or_insert(Decimal::ZERO) += *equity;
            }
            let equity_values: Vec<Decimal> = equity_curve.iter().map(|(_, v)| *v).collect();
            let days_elapsed = (config.end_date - config.start_date).num_days();
            let metrics = PerformanceMetrics::calculate(&trades, &equity_values, days_elapsed);
            per_strategy.insert(
                strategy_id.clone(),
                BacktestResult {
                    config: config.clone(),
                    trades,
                    equity_curve,
                    metrics,
                    warnings,
                },
            );
        }

        let mut portfolio_equity_curve: Vec<(chrono::DateTime<chrono::Utc>, Decimal)> = portfolio_points.into_iter().collect();
        portfolio_equity_curve.sort_by_key(|(ts, _)| *ts);
        let all_trades: Vec<Trade> = per_strategy.values().flat_map(|r| r.trades.clone()).collect();
        let portfolio_values: Vec<Decimal> = portfolio_equity_curve.iter().map(|(_, v)| *v).collect();
        let days_elapsed = (config.end_date - config.start_date).num_days();
        let portfolio_metrics = PerformanceMetrics::calculate(&all_trades, &portfolio_values, days_elapsed);

        OrchestratorResult {
            per_strategy,
            portfolio_metrics,
            portfolio_equity_curve,
        }
    }

    fn close(
        commission_model: &CommissionModel,
        pos: &OpenPosition,
        fill_price: Decimal,
        fill_time: chrono::DateTime<chrono::Utc>,
        strategy_id: &str,
        allocation: &mut StrategyAllocation,
        trades: &mut Vec<Trade>,
    ) {
        let notional = pos.quantity * fill_price;
        let commission = commission_model.commission(notional);
        allocation.release(notional - commission, pos.reserved);
        trades.push(Trade::close(
            pos.symbol.clone(),
            pos.side,
            pos.quantity,
            pos.entry_price,
            fill_price,
            pos.entry_time,
            fill_time,
            Some(strategy_id.to_string()),
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
    fn rejects_weights_summing_above_one() {
        let entries: Vec<(String, Decimal, Box<dyn Strategy>)> = vec![
            ("a".into(), dec!(0.6), Box::new(BuyAndHold::default())),
            ("b".into(), dec!(0.6), Box::new(BuyAndHold::default())),
        ];
        let result = StrategyOrchestrator::new(entries, CommissionModel::ZERO);
        assert!(matches!(result, Err(OrchestratorError::WeightsExceedOne { .. })));
    }

    #[test]
    fn rejects_non_positive_weight() {
        let entries: Vec<(String, Decimal, Box<dyn Strategy>)> =
            vec![("a".into(), dec!(0), Box::new(BuyAndHold::default()))];
        let result = StrategyOrchestrator::new(entries, CommissionModel::ZERO);
        assert!(matches!(result, Err(OrchestratorError::NonPositiveWeight { .. })));
    }

    #[test]
    fn two_strategies_each_confined_to_their_own_allocation() {
        let bars = vec![bar(1, dec!(100), dec!(105)), bar(2, dec!(106), dec!(110)), bar(3, dec!(111), dec!(115))];
        let mut bars_by_symbol = HashMap::new();
        bars_by_symbol.insert("AAPL".to_string(), bars);

        let entries: Vec<(String, Decimal, Box<dyn Strategy>)> = vec![
            ("conservative".into(), dec!(0.3), Box::new(BuyAndHold::default())),
            ("aggressive".into(), dec!(0.7), Box::new(BuyAndHold::default())),
        ];
        let mut orchestrator = StrategyOrchestrator::new(entries, CommissionModel::ZERO).unwrap();
        let result = orchestrator.run(&config(), &bars_by_symbol);

        assert_eq!(result.per_strategy.len(), 2);
        let conservative = &result.per_strategy["conservative"];
        let aggressive = &result.per_strategy["aggressive"];
        let conservative_final = conservative.equity_curve.last().unwrap().1;
        let aggressive_final = aggressive.equity_curve.last().unwrap().1;
        assert!(aggressive_final > conservative_final, "larger allocation should compound to more equity");
        assert_eq!(result.portfolio_equity_curve.len(), 3);
    }

    #[test]
    fn tags_trades_with_strategy_id() {
        let bars = vec![
            bar(1, dec!(100), dec!(105)),
            bar(2, dec!(106), dec!(95)),
            bar(3, dec!(96), dec!(90)),
        ];
        let mut bars_by_symbol = HashMap::new();
        bars_by_symbol.insert("AAPL".to_string(), bars);

        struct EnterThenExit {
            entered: bool,
        }
        impl Strategy for EnterThenExit {
            fn id(&self) -> &str {
                "enter_then_exit"
            }
            fn should_enter(&mut self, _bar: &HistoricalBar, _state: &StrategyState) -> Option<Signal> {
                if self.entered {
                    None
                } else {
                    self.entered = true;
                    Some(Signal { side: crate::domain::types::OrderSide::Buy })
                }
            }
            fn should_exit(&mut self, _position: &OpenPosition, bar: &HistoricalBar, _state: &StrategyState) -> bool {
                bar.close < dec!(100)
            }
        }

        let entries: Vec<(String, Decimal, Box<dyn Strategy>)> =
            vec![("solo".into(), dec!(1.0), Box::new(EnterThenExit { entered: false }))];
        let mut orchestrator = StrategyOrchestrator::new(entries, CommissionModel::ZERO).unwrap();
        let result = orchestrator.run(&config(), &bars_by_symbol);

        let trades = &result.per_strategy["solo"].trades;
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].strategy_id.as_deref(), Some("solo"));
    }
}
