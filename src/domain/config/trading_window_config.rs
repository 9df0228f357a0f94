use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TradingWindowConfigError {
    #[error("start_hour_et {0} must be in [0, 23]")]
    InvalidStartHour(u8),
    #[error("end_hour_et {0} must be in [0, 23]")]
    InvalidEndHour(u8),
    #[error("start_hour_et {start} must be before end_hour_et {end}")]
    StartNotBeforeEnd { start: u8, end: u8 },
}

/// Peak-volatility trading window bounds (§4.4). Upper bound is exclusive (§9).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingWindowConfig {
    pub start_hour_et: u8,
    pub end_hour_et: u8,
    pub timezone: String,
}

impl Default for TradingWindowConfig {
    fn default() -> Self {
        Self {
            start_hour_et: 7,
            end_hour_et: 10,
            timezone: "America/New_York".to_string(),
        }
    }
}

impl TradingWindowConfig {
    pub fn new(start_hour_et: u8, end_hour_et: u8, timezone: impl Into<String>) -> Result<Self, TradingWindowConfigError> {
        if start_hour_et > 23 {
            return Err(TradingWindowConfigError::InvalidStartHour(start_hour_et));
        }
        if end_hour_et > 23 {
            return Err(TradingWindowConfigError::InvalidEndHour(end_hour_et));
        }
        if start_hour_et >= end_hour_et {
            return Err(TradingWindowConfigError::StartNotBeforeEnd {
                start: start_hour_et,
                end: end_hour_et,
            });
        }
        Ok(Self {
            start_hour_et,
            end_hour_et,
            timezone: timezone.into(),
        })
    }
}
