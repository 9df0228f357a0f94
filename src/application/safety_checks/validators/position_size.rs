//! Validator 6: computed quantity notional <= `max_position_pct * portfolio` (§4.5).

use crate::domain::errors::SafetyError;
use rust_decimal::Decimal;

pub fn check(
    quantity: Decimal,
    price: Decimal,
    portfolio_value: Decimal,
    max_position_pct: f64,
) -> Result<(), SafetyError> {
    let notional = quantity * price;
    let cap_pct = Decimal::try_from(max_position_pct).unwrap_or(Decimal::ZERO) / Decimal::from(100);
    let cap = portfolio_value * cap_pct;
    if notional > cap {
        return Err(SafetyError::InvalidInput {
            reason: format!("position notional {notional} exceeds {max_position_pct}% cap ({cap})"),
        });
    }
    Ok(())
}
