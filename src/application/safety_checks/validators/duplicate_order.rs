//! Validator 7: reject if `(symbol, side)` already pending (§4.5).

use crate::domain::errors::SafetyError;
use crate::domain::risk::pending::PendingOrderRegistry;
use crate::domain::types::OrderSide;

pub fn check(registry: &PendingOrderRegistry, symbol: &str, side: OrderSide) -> Result<(), SafetyError> {
    if registry.is_pending(symbol, side) {
        return Err(SafetyError::InvalidInput {
            reason: format!("duplicate order: {symbol} {side} already pending"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn blocks_duplicate_pending_order() {
        let mut reg = PendingOrderRegistry::default();
        reg.register("AAPL", OrderSide::Buy, "ord-1", Utc::now());
        assert!(check(&reg, "AAPL", OrderSide::Buy).is_err());
        assert!(check(&reg, "AAPL", OrderSide::Sell).is_ok());
    }
}
