//! PendingOrderRegistry (§3): at most one pending order per `(symbol, side)`.

use crate::domain::types::OrderSide;
use chrono::{DateTime, Utc};
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq)]
pub struct PendingOrder {
    pub order_id: String,
    pub side: OrderSide,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct PendingOrderRegistry {
    entries: HashMap<(String, OrderSide), PendingOrder>,
}

impl PendingOrderRegistry {
    pub fn is_pending(&self, symbol: &str, side: OrderSide) -> bool {
        self.entries.contains_key(&(symbol.to_string(), side))
    }

    pub fn register(&mut self, symbol: impl Into<String>, side: OrderSide, order_id: impl Into<String>, now: DateTime<Utc>) {
        self.entries.insert(
            (symbol.into(), side),
            PendingOrder {
                order_id: order_id.into(),
                side,
                submitted_at: now,
            },
        );
    }

    pub fn remove(&mut self, symbol: &str, side: OrderSide) -> Option<PendingOrder> {
        self.entries.remove(&(symbol.to_string(), side))
    }

    pub fn order_id_for(&self, symbol: &str, side: OrderSide) -> Option<&str> {
        self.entries.get(&(symbol.to_string(), side)).map(|p| p.order_id.as_str())
    }

    pub fn all_order_ids(&self) -> Vec<String> {
        self.entries.values().map(|p| p.order_id.clone()).collect()
    }

    /// Every pending entry as `(symbol, side, order_id)`, for callers that need to
    /// act on and then individually remove specific orders.
    pub fn entries(&self) -> Vec<(String, OrderSide, String)> {
        self.entries
            .iter()
            .map(|((symbol, side), order)| (symbol.clone(), *side, order.order_id.clone()))
            .collect()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registers_and_detects_duplicate_by_symbol_and_side() {
        let mut reg = PendingOrderRegistry::default();
        assert!(!reg.is_pending("AAPL", OrderSide::Buy));
        reg.register("AAPL", OrderSide::Buy, "ord-1", Utc::now());
        assert!(reg.is_pending("AAPL", OrderSide::Buy));
        assert!(!reg.is_pending("AAPL", OrderSide::Sell));
    }

    #[test]
    fn remove_clears_entry() {
        let mut reg = PendingOrderRegistry::default();
        reg.register("AAPL", OrderSide::Buy, "ord-1", Utc::now());
        reg.remove("AAPL", OrderSide::Buy);
        assert!(!reg.is_pending("AAPL", OrderSide::Buy));
    }
}
