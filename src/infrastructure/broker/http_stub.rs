//! A minimal HTTP-shaped `BrokerAdapter` stub marking where a real broker client
//! would plug in. Building out the real client is explicitly out of scope (§1,
//! §4.13); every method here maps connection failures onto the C1 taxonomy but does
//! not speak any particular broker's wire protocol.

use crate::domain::errors::BrokerError;
use crate::domain::ports::{BrokerAdapter, HistoricalInterval, HistoricalSpan, MarketStatus};
use crate::domain::types::{AccountBalance, HistoricalBar, OrderEnvelope, OrderRequest, Position, Quote};
use async_trait::async_trait;
use rust_decimal::Decimal;
use std::time::Duration;

pub struct HttpBrokerAdapter {
    base_url: String,
    client: reqwest::Client,
}

impl HttpBrokerAdapter {
    pub fn new(base_url: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()
            .expect("reqwest client builds with static config");
        Self {
            base_url: base_url.into(),
            client,
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, BrokerError> {
        let response = self
            .client
            .get(format!("{}{path}", self.base_url))
            .send()
            .await
            .map_err(|_| BrokerError::from_status(0, "network error"))?;
        let status = response.status().as_u16();
        if !response.status().is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BrokerError::from_status(status, body));
        }
        response
            .json()
            .await
            .map_err(|e| BrokerError::from_status(status, e.to_string()))
    }
}

#[async_trait]
impl BrokerAdapter for HttpBrokerAdapter {
    async fn get_latest_price(&self, symbol: &str) -> Result<Quote, BrokerError> {
        self.get_json(&format!("/quotes/{symbol}")).await
    }

    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError> {
        self.get_json(&format!("/quotes?symbols={}", symbols.join(","))).await
    }

    async fn get_historical(
        &self,
        symbol: &str,
        _interval: HistoricalInterval,
        _span: HistoricalSpan,
    ) -> Result<Vec<HistoricalBar>, BrokerError> {
        self.get_json(&format!("/historical/{symbol}")).await
    }

    async fn get_market_hours(&self) -> Result<MarketStatus, BrokerError> {
        self.get_json("/market/hours").await
    }

    async fn submit_limit_buy(&self, _request: &OrderRequest, _limit_price: Decimal) -> Result<OrderEnvelope, BrokerError> {
        Err(BrokerError::from_status(501, "order submission requires a real broker client"))
    }

    async fn submit_limit_sell(&self, _request: &OrderRequest, _limit_price: Decimal) -> Result<OrderEnvelope, BrokerError> {
        Err(BrokerError::from_status(501, "order submission requires a real broker client"))
    }

    async fn cancel_order(&self, _order_id: &str) -> Result<(), BrokerError> {
        Err(BrokerError::from_status(501, "order cancellation requires a real broker client"))
    }

    async fn cancel_all_orders(&self) -> Result<Vec<String>, BrokerError> {
        Err(BrokerError::from_status(501, "order cancellation requires a real broker client"))
    }

    async fn fetch_order(&self, order_id: &str) -> Result<OrderEnvelope, BrokerError> {
        self.get_json(&format!("/orders/{order_id}")).await
    }

    async fn load_account_profile(&self) -> Result<AccountBalance, BrokerError> {
        self.get_json("/account").await
    }

    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        self.get_json("/positions").await
    }

    async fn probe_session(&self) -> Result<(), BrokerError> {
        self.get_json::<serde_json::Value>("/ping").await.map(|_| ())
    }

    async fn reauthenticate(&self) -> Result<(), BrokerError> {
        Err(BrokerError::from_status(501, "reauthentication requires a real broker client"))
    }
}
