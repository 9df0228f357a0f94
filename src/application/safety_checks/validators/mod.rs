//! One pure, independently testable function per pre-trade rule (§4.5). `mod.rs`
//! owns the ordering and the side effects (breaker trips); these stay pure.

pub mod buying_power;
pub mod circuit_breaker;
pub mod consecutive_losses;
pub mod daily_loss_limit;
pub mod duplicate_order;
pub mod input_validation;
pub mod position_size;
pub mod trading_hours;
