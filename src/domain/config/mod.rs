//! Typed, self-validating configuration value objects (A1).
//!
//! Mirrors the donor codebase's pattern of one small value object per concern,
//! each validated on construction rather than scattered through call sites.

mod order_management_config;
mod performance_targets_config;
mod risk_management_config;
mod trading_window_config;

pub use order_management_config::{OffsetMode, OrderManagementConfig, StrategyOffsetOverride};
pub use performance_targets_config::PerformanceTargetsConfig;
pub use risk_management_config::RiskManagementConfig;
pub use trading_window_config::TradingWindowConfig;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AccountCacheConfig {
    pub volatile_ttl_s: i64,
    pub stable_ttl_s: i64,
}

impl Default for AccountCacheConfig {
    fn default() -> Self {
        Self {
            volatile_ttl_s: 60,
            stable_ttl_s: 300,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RetryPolicyConfig {
    pub max_attempts: u32,
    pub base_delay_s: f64,
    pub multiplier: f64,
}

impl Default for RetryPolicyConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_s: 1.0,
            multiplier: 2.0,
        }
    }
}

/// Top-level configuration aggregate (§6). Fields not modeled here (API credentials, log
/// destinations, CLI parsing) are deliberately out of scope per §1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub paper_trading: bool,
    pub trading_window: TradingWindowConfig,
    pub risk_management: RiskManagementConfig,
    pub order_management: OrderManagementConfig,
    pub account_cache: AccountCacheConfig,
    pub retry_policy: RetryPolicyConfig,
    pub performance_targets: PerformanceTargetsConfig,
    pub health_check_interval_s: i64,
    pub quote_staleness_threshold_s: i64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            paper_trading: true,
            trading_window: TradingWindowConfig::default(),
            risk_management: RiskManagementConfig::default(),
            order_management: OrderManagementConfig::default(),
            account_cache: AccountCacheConfig::default(),
            retry_policy: RetryPolicyConfig::default(),
            performance_targets: PerformanceTargetsConfig::default(),
            health_check_interval_s: 300,
            quote_staleness_threshold_s: 300,
        }
    }
}

impl Config {
    /// Stable hash of the resolved config; stamped onto every `TradeRecord` (§6) so a
    /// trade can always be traced back to the settings that produced it.
    pub fn config_hash(&self) -> String {
        let mut hasher = DefaultHasher::new();
        // serde_json gives us a stable key order for a struct with fixed fields.
        serde_json::to_string(self)
            .unwrap_or_default()
            .hash(&mut hasher);
        format!("{:016x}", hasher.finish())
    }

    pub fn max_position_notional(&self, portfolio_value: Decimal) -> Decimal {
        portfolio_value * Decimal::try_from(self.risk_management.max_position_pct / 100.0)
            .unwrap_or_default()
    }
}
