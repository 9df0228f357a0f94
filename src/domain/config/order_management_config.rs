use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OffsetMode {
    Bps,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StrategyOffsetOverride {
    pub buy_offset: f64,
    pub sell_offset: f64,
}

/// Limit-offset and slippage-guard configuration (§4.6, §6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderManagementConfig {
    pub offset_mode: OffsetMode,
    pub buy_offset: f64,
    pub sell_offset: f64,
    pub max_slippage_pct: f64,
    pub poll_interval_s: u64,
    pub strategy_overrides: HashMap<String, StrategyOffsetOverride>,
}

impl Default for OrderManagementConfig {
    fn default() -> Self {
        Self {
            offset_mode: OffsetMode::Bps,
            buy_offset: 0.0010,
            sell_offset: 0.0010,
            max_slippage_pct: 0.01,
            poll_interval_s: 15,
            strategy_overrides: HashMap::new(),
        }
    }
}

impl OrderManagementConfig {
    /// Per-strategy overrides take precedence over global offsets (§4.6).
    pub fn offsets_for(&self, strategy_id: Option<&str>) -> (f64, f64) {
        if let Some(id) = strategy_id {
            if let Some(o) = self.strategy_overrides.get(id) {
                return (o.buy_offset, o.sell_offset);
            }
        }
        (self.buy_offset, self.sell_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_override_takes_precedence() {
        let mut cfg = OrderManagementConfig::default();
        cfg.strategy_overrides.insert(
            "momentum".to_string(),
            StrategyOffsetOverride {
                buy_offset: 0.002,
                sell_offset: 0.003,
            },
        );
        assert_eq!(cfg.offsets_for(Some("momentum")), (0.002, 0.003));
        assert_eq!(cfg.offsets_for(Some("other")), (0.0010, 0.0010));
        assert_eq!(cfg.offsets_for(None), (0.0010, 0.0010));
    }
}
