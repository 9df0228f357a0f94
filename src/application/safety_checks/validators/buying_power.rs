//! Validator 3: `quantity * price <= buying_power` (§4.5).

use crate::domain::errors::SafetyError;
use rust_decimal::Decimal;

pub fn check(quantity: Decimal, price: Decimal, buying_power: Decimal) -> Result<(), SafetyError> {
    let notional = quantity * price;
    if notional > buying_power {
        return Err(SafetyError::InvalidInput {
            reason: format!(
                "order notional {notional} exceeds buying power {buying_power}"
            ),
        });
    }
    Ok(())
}
