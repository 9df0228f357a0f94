use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RiskManagementConfigError {
    #[error("{field} = {value} must be in (0.0, 100.0]")]
    InvalidPercentage { field: &'static str, value: f64 },
    #[error("consecutive_loss_limit must be > 0")]
    InvalidConsecutiveLossLimit,
    #[error("default_stop_pct {value} must be within bounds [{min}, {max}]")]
    StopOutOfBounds { value: f64, min: f64, max: f64 },
}

/// Risk-management thresholds (§4.5, §6, §9). Validated on construction so an
/// inconsistent config can never reach the safety checks at runtime.
///
/// `default_stop_pct` / `min_stop_pct` / `max_stop_pct` resolve the ambiguity noted
/// in §9: the codebase this was modeled on mentions both "2% default stop" and a
/// "0.7%-10% stop distance" bound. We take 0.7-10% as the validation range and 2%
/// as the fallback default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RiskManagementConfig {
    pub max_daily_loss_pct: f64,
    pub max_position_pct: f64,
    pub consecutive_loss_limit: usize,
    pub account_risk_pct: f64,
    pub min_risk_reward_ratio: f64,
    pub default_stop_pct: f64,
    pub min_stop_pct: f64,
    pub max_stop_pct: f64,
    pub trailing_enabled: bool,
}

impl Default for RiskManagementConfig {
    fn default() -> Self {
        Self {
            max_daily_loss_pct: 3.0,
            max_position_pct: 5.0,
            consecutive_loss_limit: 3,
            account_risk_pct: 1.0,
            min_risk_reward_ratio: 2.0,
            default_stop_pct: 2.0,
            min_stop_pct: 0.7,
            max_stop_pct: 10.0,
            trailing_enabled: true,
        }
    }
}

impl RiskManagementConfig {
    pub fn validate(&self) -> Result<(), RiskManagementConfigError> {
        for (field, value) in [
            ("max_daily_loss_pct", self.max_daily_loss_pct),
            ("max_position_pct", self.max_position_pct),
            ("account_risk_pct", self.account_risk_pct),
        ] {
            if !(0.0..=100.0).contains(&value) || value <= 0.0 {
                return Err(RiskManagementConfigError::InvalidPercentage { field, value });
            }
        }
        if self.consecutive_loss_limit == 0 {
            return Err(RiskManagementConfigError::InvalidConsecutiveLossLimit);
        }
        if self.default_stop_pct < self.min_stop_pct || self.default_stop_pct > self.max_stop_pct {
            return Err(RiskManagementConfigError::StopOutOfBounds {
                value: self.default_stop_pct,
                min: self.min_stop_pct,
                max: self.max_stop_pct,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(RiskManagementConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_stop_outside_bounds() {
        let mut c = RiskManagementConfig::default();
        c.default_stop_pct = 15.0;
        assert!(c.validate().is_err());
    }

    #[test]
    fn rejects_zero_consecutive_loss_limit() {
        let mut c = RiskManagementConfig::default();
        c.consecutive_loss_limit = 0;
        assert_eq!(
            c.validate(),
            Err(RiskManagementConfigError::InvalidConsecutiveLossLimit)
        );
    }
}
