//! The strategy contract a `BacktestEngine`/`StrategyOrchestrator` runs against
//! (§4.9): pure functions of the current bar and the strategy's own state, no
//! future data.

use crate::domain::types::{HistoricalBar, OrderSide};
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Signal {
    pub side: OrderSide,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OpenPosition {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub entry_price: Decimal,
    pub entry_time: chrono::DateTime<chrono::Utc>,
    /// Capital reserved against the owning `StrategyAllocation`, if orchestrated.
    pub reserved: Decimal,
}

/// Bars observed so far for one symbol, up to and including the current one. A
/// strategy given this slice can never see a future bar (§4.9 no-look-ahead).
pub struct StrategyState<'a> {
    pub bars_so_far: &'a [HistoricalBar],
}

impl<'a> StrategyState<'a> {
    pub fn current(&self) -> &HistoricalBar {
        self.bars_so_far.last().expect("state always includes the current bar")
    }
}

pub trait Strategy: Send {
    fn id(&self) -> &str;

    fn should_enter(&mut self, bar: &HistoricalBar, state: &StrategyState) -> Option<Signal>;

    fn should_exit(&mut self, position: &OpenPosition, bar: &HistoricalBar, state: &StrategyState) -> bool;

    /// Default: as many whole shares as `portfolio_value` affords at `price`.
    fn position_size(&self, _signal: &Signal, portfolio_value: Decimal, price: Decimal) -> Decimal {
        if price <= Decimal::ZERO {
            return Decimal::ZERO;
        }
        (portfolio_value / price).floor()
    }
}

/// A trivial buy-and-hold strategy: enters once on the first bar, never exits on
/// its own. Used by the NFR-003 determinism/acceptance test (§8).
pub struct BuyAndHold {
    entered: bool,
}

impl Default for BuyAndHold {
    fn default() -> Self {
        Self { entered: false }
    }
}

impl Strategy for BuyAndHold {
    fn id(&self) -> &str {
        "buy_and_hold"
    }

    fn should_enter(&mut self, _bar: &HistoricalBar, _state: &StrategyState) -> Option<Signal> {
        if self.entered {
            None
        } else {
            self.entered = true;
            Some(Signal { side: OrderSide::Buy })
        }
    }

    fn should_exit(&mut self, _position: &OpenPosition, _bar: &HistoricalBar, _state: &StrategyState) -> bool {
        false
    }
}
