//! Validator 4: `|daily_pnl| / portfolio_value <= max_daily_loss_pct` (§4.5).
//!
//! A breach both blocks the current order and signals the caller to trip the
//! circuit breaker with reason `daily_loss_limit` (the trip itself is a side effect
//! owned by `SafetyChecks`, not this pure check).

use crate::domain::errors::SafetyError;
use rust_decimal::Decimal;

pub const TRIP_REASON: &str = "daily_loss_limit";

pub fn check(daily_pnl: Decimal, portfolio_value: Decimal, max_daily_loss_pct: f64) -> Result<(), SafetyError> {
    if portfolio_value <= Decimal::ZERO {
        return Ok(());
    }
    let loss_pct = (daily_pnl.abs() / portfolio_value) * Decimal::from(100);
    let limit = Decimal::try_from(max_daily_loss_pct).unwrap_or(Decimal::ZERO);
    if daily_pnl < Decimal::ZERO && loss_pct > limit {
        return Err(SafetyError::CheckFailure {
            reason: format!("daily loss {loss_pct}% exceeds limit {max_daily_loss_pct}%"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn blocks_when_daily_loss_exceeds_limit() {
        assert!(check(dec!(-400), dec!(10_000), 3.0).is_err());
    }

    #[test]
    fn passes_when_within_limit() {
        assert!(check(dec!(-100), dec!(10_000), 3.0).is_ok());
    }

    #[test]
    fn gains_never_block() {
        assert!(check(dec!(10_000), dec!(10_000), 3.0).is_ok());
    }
}
