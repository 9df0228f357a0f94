//! Core data model (§3): quotes, bars, positions, orders, trades.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketState {
    Regular,
    Pre,
    Post,
    Closed,
}

/// A point-in-time price observation. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub symbol: String,
    pub price: Decimal,
    pub timestamp_utc: DateTime<Utc>,
    pub market_state: MarketState,
}

impl Quote {
    /// Fresh iff price is positive and the quote is no more than `max_age` old.
    pub fn is_fresh(&self, now: DateTime<Utc>, max_age: chrono::Duration) -> bool {
        self.price > Decimal::ZERO && (now - self.timestamp_utc) <= max_age
    }
}

/// A single OHLCV observation for a symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoricalBar {
    pub symbol: String,
    pub timestamp_utc: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

impl HistoricalBar {
    /// Validate OHLC/volume invariants for a single bar (§3).
    pub fn validate(&self) -> Result<(), String> {
        if self.open <= Decimal::ZERO
            || self.high <= Decimal::ZERO
            || self.low <= Decimal::ZERO
            || self.close <= Decimal::ZERO
        {
            return Err(format!("{}: OHLC must be > 0", self.symbol));
        }
        if self.low > self.open || self.low > self.close || self.open > self.high || self.close > self.high {
            return Err(format!(
                "{}: low <= open,close <= high violated ({:?})",
                self.symbol, self
            ));
        }
        if self.volume < Decimal::ZERO {
            return Err(format!("{}: volume must be >= 0", self.symbol));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderSide::Buy => write!(f, "buy"),
            OrderSide::Sell => write!(f, "sell"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Submitted,
    PartiallyFilled,
    Filled,
    Cancelled,
    Rejected,
}

impl OrderStatus {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            OrderStatus::Filled | OrderStatus::Cancelled | OrderStatus::Rejected
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Mode in which a computed `TradeRecord` was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExecutionMode {
    Live,
    Paper,
    Backtest,
}

/// A validated account position, recomputed on every cache refresh (never mutated in place).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub symbol: String,
    pub quantity: Decimal,
    pub avg_entry_price: Decimal,
    pub current_price: Decimal,
    pub unrealized_pl: Decimal,
    pub unrealized_pl_pct: Decimal,
}

impl Position {
    pub fn new(symbol: impl Into<String>, quantity: Decimal, avg_entry_price: Decimal, current_price: Decimal) -> Self {
        let unrealized_pl = (current_price - avg_entry_price) * quantity;
        let unrealized_pl_pct = if avg_entry_price > Decimal::ZERO {
            (current_price - avg_entry_price) / avg_entry_price
        } else {
            Decimal::ZERO
        };
        Self {
            symbol: symbol.into(),
            quantity,
            avg_entry_price,
            current_price,
            unrealized_pl,
            unrealized_pl_pct,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub buying_power: Decimal,
    pub cash: Decimal,
    pub total_equity: Decimal,
    pub day_trades_used: u8,
}

/// `quantity`/`reference_price` are validated on construction (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderRequest {
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub reference_price: Decimal,
    pub strategy_id: Option<String>,
}

impl OrderRequest {
    pub fn new(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: u32,
        reference_price: Decimal,
        strategy_id: Option<String>,
    ) -> Result<Self, crate::domain::errors::SafetyError> {
        let symbol = symbol.into();
        if symbol.is_empty()
            || symbol.len() > 5
            || !symbol.chars().all(|c| c.is_ascii_alphanumeric())
            || symbol.chars().any(|c| c.is_ascii_lowercase())
        {
            return Err(crate::domain::errors::SafetyError::InvalidInput {
                reason: format!("symbol must be alphanumeric, uppercase, <= 5 chars: {symbol}"),
            });
        }
        if !(1..=10_000).contains(&quantity) {
            return Err(crate::domain::errors::SafetyError::InvalidInput {
                reason: format!("quantity must be in [1, 10000]: {quantity}"),
            });
        }
        if reference_price <= Decimal::ZERO {
            return Err(crate::domain::errors::SafetyError::InvalidInput {
                reason: "reference_price must be > 0".to_string(),
            });
        }
        Ok(Self {
            symbol,
            side,
            quantity,
            reference_price,
            strategy_id,
        })
    }

    pub fn notional(&self) -> Decimal {
        self.reference_price * Decimal::from(self.quantity)
    }
}

/// An order the order manager is tracking, from submission through terminal status.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderEnvelope {
    pub order_id: String,
    pub request: OrderRequest,
    pub limit_price: Decimal,
    pub status: OrderStatus,
    pub submitted_at: DateTime<Utc>,
    pub last_status_at: DateTime<Utc>,
}

/// A closed round-trip trade (entry + exit), immutable once set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    pub symbol: String,
    pub entry_time: DateTime<Utc>,
    pub exit_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub exit_price: Decimal,
    pub quantity: Decimal,
    pub side: OrderSide,
    pub strategy_id: Option<String>,
    pub pnl: Decimal,
    pub pnl_pct: Decimal,
}

impl Trade {
    pub fn close(
        symbol: impl Into<String>,
        side: OrderSide,
        quantity: Decimal,
        entry_price: Decimal,
        exit_price: Decimal,
        entry_time: DateTime<Utc>,
        exit_time: DateTime<Utc>,
        strategy_id: Option<String>,
    ) -> Self {
        let pnl = match side {
            OrderSide::Buy => (exit_price - entry_price) * quantity,
            OrderSide::Sell => (entry_price - exit_price) * quantity,
        };
        let pnl_pct = if entry_price > Decimal::ZERO {
            pnl / (entry_price * quantity)
        } else {
            Decimal::ZERO
        };
        Self {
            symbol: symbol.into(),
            entry_time,
            exit_time,
            entry_price,
            exit_price,
            quantity,
            side,
            strategy_id,
            pnl,
            pnl_pct,
        }
    }
}

/// Canonical JSONL trade record (§6). Decimals serialize as strings to stay exact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub ts_utc: DateTime<Utc>,
    pub symbol: String,
    pub side: OrderSide,
    pub quantity: Decimal,
    pub price: Decimal,
    pub total_value: Decimal,
    pub order_id: Option<String>,
    pub execution_mode: ExecutionMode,
    pub strategy_id: Option<String>,
    pub pnl: Option<Decimal>,
    pub hold_duration_s: Option<i64>,
    pub session_id: String,
    pub config_hash: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn bar_validates_ohlc_invariants() {
        let bar = HistoricalBar {
            symbol: "AAPL".into(),
            timestamp_utc: Utc::now(),
            open: dec!(100),
            high: dec!(105),
            low: dec!(99),
            close: dec!(102),
            volume: dec!(1000),
        };
        assert!(bar.validate().is_ok());

        let bad = HistoricalBar {
            low: dec!(106),
            ..bar
        };
        assert!(bad.validate().is_err());
    }

    #[test]
    fn order_request_rejects_lowercase_or_long_symbol() {
        assert!(OrderRequest::new("aapl", OrderSide::Buy, 1, dec!(1), None).is_err());
        assert!(OrderRequest::new("TOOLONG", OrderSide::Buy, 1, dec!(1), None).is_err());
        assert!(OrderRequest::new("AAPL", OrderSide::Buy, 0, dec!(1), None).is_err());
        assert!(OrderRequest::new("AAPL", OrderSide::Buy, 10_001, dec!(1), None).is_err());
        assert!(OrderRequest::new("AAPL", OrderSide::Buy, 1, dec!(1), None).is_ok());
    }

    #[test]
    fn trade_pnl_matches_side() {
        let t = Trade::close(
            "AAPL",
            OrderSide::Buy,
            dec!(10),
            dec!(100),
            dec!(110),
            Utc::now(),
            Utc::now(),
            None,
        );
        assert_eq!(t.pnl, dec!(100));

        let t = Trade::close(
            "AAPL",
            OrderSide::Sell,
            dec!(10),
            dec!(100),
            dec!(110),
            Utc::now(),
            Utc::now(),
            None,
        );
        assert_eq!(t.pnl, dec!(-100));
    }
}
