//! PerformanceCalculator / PerformanceTracker (C11).
//!
//! Grounded on the donor codebase's reporting pipeline: a stateless calculator over
//! a trade/equity series, plus a stateful tracker that updates windowed summaries as
//! trades close and raises log-only alerts when a configured target is breached (§4.11).

use crate::application::logger::{Stream, StructuredLogger};
use crate::domain::config::PerformanceTargetsConfig;
use crate::domain::performance::PerformanceMetrics;
use crate::domain::repositories::{PerformanceSummaryRepository, SummaryWindow};
use crate::domain::types::Trade;
use chrono::{DateTime, Datelike, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// Offline: pure function of a trade list + equity curve. No state, no I/O.
pub struct PerformanceCalculator;

impl PerformanceCalculator {
    pub fn calculate(trades: &[Trade], equity_curve: &[Decimal], days_elapsed: i64) -> PerformanceMetrics {
        PerformanceMetrics::calculate(trades, equity_curve, days_elapsed)
    }

    /// Per-strategy attribution: splits `trades` by `strategy_id` (untagged trades
    /// are grouped under `"unassigned"`) and computes metrics independently per group.
    pub fn calculate_by_strategy(trades: &[Trade], days_elapsed: i64) -> HashMap<String, PerformanceMetrics> {
        let mut by_strategy: HashMap<String, Vec<&Trade>> = HashMap::new();
        for trade in trades {
            let key = trade.strategy_id.clone().unwrap_or_else(|| "unassigned".to_string());
            by_strategy.entry(key).or_default().push(trade);
        }
        by_strategy
            .into_iter()
            .map(|(id, group)| {
                let owned: Vec<Trade> = group.into_iter().cloned().collect();
                let equity: Vec<Decimal> = running_equity(&owned);
                (id, PerformanceMetrics::calculate(&owned, &equity, days_elapsed))
            })
            .collect()
    }
}

/// Reconstructs a synthetic equity series from cumulative realized P&L, starting at
/// zero. Used only for per-strategy attribution, where no standalone equity curve
/// exists per group.
fn running_equity(trades: &[Trade]) -> Vec<Decimal> {
    let mut running = Decimal::ZERO;
    let mut curve = vec![running];
    for trade in trades {
        running += trade.pnl;
        curve.push(running);
    }
    curve
}

fn period_key(window: SummaryWindow, ts: DateTime<Utc>) -> String {
    match window {
        SummaryWindow::Daily => ts.format("%Y-%m-%d").to_string(),
        SummaryWindow::Weekly => format!("{}-W{:02}", ts.iso_week().year(), ts.iso_week().week()),
        SummaryWindow::Monthly => ts.format("%Y-%m").to_string(),
    }
}

/// Online: incrementally updates daily/weekly/monthly summaries as trades close,
/// persists each revision, and emits `performance_alert` when a configured target
/// is breached (§4.11). Alerts are log-only; nothing here blocks trading.
pub struct PerformanceTracker {
    targets: PerformanceTargetsConfig,
    repository: Arc<dyn PerformanceSummaryRepository>,
    logger: Arc<StructuredLogger>,
    trades_by_period: RwLock<HashMap<(SummaryWindow, String), Vec<Trade>>>,
}

impl PerformanceTracker {
    pub fn new(targets: PerformanceTargetsConfig, repository: Arc<dyn PerformanceSummaryRepository>, logger: Arc<StructuredLogger>) -> Self {
        Self {
            targets,
            repository,
            logger,
            trades_by_period: RwLock::new(HashMap::new()),
        }
    }

    /// Records a closed trade under each window's current period, recomputes and
    /// persists that window's summary, and alerts on any breached target.
    pub async fn record_trade(&self, trade: Trade) -> anyhow::Result<()> {
        for window in [SummaryWindow::Daily, SummaryWindow::Weekly, SummaryWindow::Monthly] {
            let period = period_key(window, trade.exit_time);
            let metrics = {
                let mut guard = self.trades_by_period.write().await;
                let entry = guard.entry((window, period.clone())).or_default();
                entry.push(trade.clone());
                let days_elapsed = (trade.exit_time - entry[0].entry_time).num_days().max(1);
                PerformanceMetrics::calculate(entry, &running_equity(entry), days_elapsed)
            };
            self.repository.save_summary(window, &period, &metrics).await?;
            self.check_targets(window, &period, &metrics).await;
        }
        Ok(())
    }

    async fn check_targets(&self, window: SummaryWindow, period: &str, metrics: &PerformanceMetrics) {
        if metrics.num_trades == 0 {
            return;
        }
        let mut breaches = Vec::new();
        if metrics.win_rate < self.targets.min_win_rate {
            breaches.push(format!("win_rate {:.3} below target {:.3}", metrics.win_rate, self.targets.min_win_rate));
        }
        if metrics.profit_factor < self.targets.min_profit_factor {
            breaches.push(format!(
                "profit_factor {:.3} below target {:.3}",
                metrics.profit_factor, self.targets.min_profit_factor
            ));
        }
        let max_drawdown_f64 = metrics.max_drawdown.to_f64().unwrap_or(0.0);
        if max_drawdown_f64 > self.targets.max_drawdown_pct {
            breaches.push(format!(
                "max_drawdown {:.3} exceeds ceiling {:.3}",
                max_drawdown_f64, self.targets.max_drawdown_pct
            ));
        }
        for reason in breaches {
            self.logger
                .log(
                    Stream::PerformanceAlerts,
                    "performance_alert",
                    json!({"window": format!("{window:?}"), "period": period, "reason": reason}),
                )
                .await;
        }
    }
}
