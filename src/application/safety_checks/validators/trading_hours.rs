//! Validator 2: trading window (§4.5, §4.4).

use crate::application::market_data::TradingHoursValidator;
use crate::domain::errors::SafetyError;
use chrono::{DateTime, Utc};

pub fn check(validator: &TradingHoursValidator, now: DateTime<Utc>) -> Result<(), SafetyError> {
    if validator.within_window(now) {
        Ok(())
    } else {
        Err(SafetyError::TradingHours)
    }
}
