//! Validator 1: circuit breaker active (§4.5).

use crate::domain::errors::SafetyError;

pub fn check(breaker_active: bool, reason: Option<&str>) -> Result<(), SafetyError> {
    if breaker_active {
        return Err(SafetyError::CircuitBreakerOpen {
            reason: reason.unwrap_or("unknown").to_string(),
        });
    }
    Ok(())
}
