pub mod broker;
pub mod market_data;
pub mod persistence;
