//! Validator 8: final well-formedness guard (§4.5). `OrderRequest::new` already
//! enforces most of this at construction; this re-checks at the point of trade so a
//! long-lived request object can't go stale between construction and validation.

use crate::domain::errors::SafetyError;
use crate::domain::types::{OrderRequest, OrderSide};
use rust_decimal::Decimal;

pub fn check(request: &OrderRequest) -> Result<(), SafetyError> {
    if request.quantity == 0 {
        return Err(SafetyError::InvalidInput {
            reason: "quantity must be > 0".to_string(),
        });
    }
    if request.reference_price <= Decimal::ZERO {
        return Err(SafetyError::InvalidInput {
            reason: "price must be > 0".to_string(),
        });
    }
    if request.symbol.is_empty()
        || !request.symbol.chars().all(|c| c.is_ascii_alphanumeric() && !c.is_ascii_lowercase())
    {
        return Err(SafetyError::InvalidInput {
            reason: format!("symbol must be alphanumeric uppercase: {}", request.symbol),
        });
    }
    match request.side {
        OrderSide::Buy | OrderSide::Sell => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn passes_well_formed_request() {
        let req = OrderRequest::new("AAPL", OrderSide::Buy, 1, dec!(100), None).unwrap();
        assert!(check(&req).is_ok());
    }
}
