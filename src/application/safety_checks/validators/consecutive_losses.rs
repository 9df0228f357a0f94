//! Validator 5: trailing consecutive losses from the trade log (§4.5).
//!
//! `trades` is expected newest-first; counts the unbroken run of losses at the head.

use crate::domain::errors::SafetyError;
use rust_decimal::Decimal;

pub const TRIP_REASON: &str = "consecutive_losses";

pub fn trailing_loss_streak(trade_pnls_newest_first: &[Decimal]) -> usize {
    trade_pnls_newest_first
        .iter()
        .take_while(|pnl| **pnl < Decimal::ZERO)
        .count()
}

pub fn check(trade_pnls_newest_first: &[Decimal], limit: usize) -> Result<(), SafetyError> {
    if trailing_loss_streak(trade_pnls_newest_first) >= limit {
        return Err(SafetyError::CheckFailure {
            reason: format!("{limit} or more consecutive losses"),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn trips_at_limit() {
        let pnls = vec![dec!(-10), dec!(-5), dec!(-1), dec!(100)];
        assert!(check(&pnls, 3).is_err());
    }

    #[test]
    fn win_breaks_the_streak() {
        let pnls = vec![dec!(10), dec!(-5), dec!(-1)];
        assert_eq!(trailing_loss_streak(&pnls), 0);
        assert!(check(&pnls, 2).is_ok());
    }
}
