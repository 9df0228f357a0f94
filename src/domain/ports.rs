//! Narrow service ports (A2/A3). Live implementations are thin adapters; only the
//! in-memory mocks are built out (the broker API client itself is out of scope, §1).

use crate::domain::errors::BrokerError;
use crate::domain::types::{AccountBalance, HistoricalBar, OrderEnvelope, OrderRequest, Position, Quote};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarketStatus {
    pub is_open: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoricalSpan {
    Day,
    Week,
    Month,
    ThreeMonth,
    Year,
    FiveYear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoricalInterval {
    FiveMinute,
    TenMinute,
    Day,
    Week,
}

/// The broker API surface (§6). HTTP status mapping to the C1 taxonomy happens at
/// the implementation boundary via `BrokerError::from_status`.
#[async_trait]
pub trait BrokerAdapter: Send + Sync {
    async fn get_latest_price(&self, symbol: &str) -> Result<Quote, BrokerError>;
    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError>;
    async fn get_historical(
        &self,
        symbol: &str,
        interval: HistoricalInterval,
        span: HistoricalSpan,
    ) -> Result<Vec<HistoricalBar>, BrokerError>;
    async fn get_market_hours(&self) -> Result<MarketStatus, BrokerError>;
    async fn submit_limit_buy(&self, request: &OrderRequest, limit_price: rust_decimal::Decimal) -> Result<OrderEnvelope, BrokerError>;
    async fn submit_limit_sell(&self, request: &OrderRequest, limit_price: rust_decimal::Decimal) -> Result<OrderEnvelope, BrokerError>;
    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError>;
    async fn cancel_all_orders(&self) -> Result<Vec<String>, BrokerError>;
    async fn fetch_order(&self, order_id: &str) -> Result<OrderEnvelope, BrokerError>;
    async fn load_account_profile(&self) -> Result<AccountBalance, BrokerError>;
    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError>;
    /// Lightweight authenticated probe used by SessionHealth (C7).
    async fn probe_session(&self) -> Result<(), BrokerError>;
    /// Single-shot reauthentication, attempted by SessionHealth on probe exhaustion.
    async fn reauthenticate(&self) -> Result<(), BrokerError>;
}

/// Historical bar source for the backtest engine (C9), with primary/secondary
/// fallback per §9 (Alpaca-primary/Yahoo-fallback shape).
#[async_trait]
pub trait HistoricalDataSource: Send + Sync {
    async fn fetch(
        &self,
        symbol: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HistoricalBar>>;

    fn name(&self) -> &'static str;
}
