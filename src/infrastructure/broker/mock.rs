//! `MockBrokerAdapter`: an in-memory, scriptable `BrokerAdapter` (§4.13). Tests seed
//! `quotes`/`historical`/`positions`/`balance` and drive order-submission behavior
//! through `fail_next_submit` / `order_status_override`, mirroring the donor
//! codebase's pattern of an in-memory adapter double per external port.

use crate::domain::errors::BrokerError;
use crate::domain::ports::{BrokerAdapter, HistoricalInterval, HistoricalSpan, MarketStatus};
use crate::domain::types::{
    AccountBalance, HistoricalBar, OrderEnvelope, OrderRequest, OrderStatus, Position, Quote,
};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MockBrokerAdapter {
    pub quotes: RwLock<HashMap<String, Quote>>,
    pub historical: RwLock<HashMap<String, Vec<HistoricalBar>>>,
    pub positions: RwLock<Vec<Position>>,
    pub balance: RwLock<AccountBalance>,
    pub market_open: RwLock<bool>,
    pub orders: RwLock<HashMap<String, OrderEnvelope>>,
    pub next_order_error: RwLock<Option<BrokerError>>,
    pub session_probe_error: RwLock<Option<BrokerError>>,
    order_seq: AtomicU64,
}

impl MockBrokerAdapter {
    pub fn new() -> Self {
        Self {
            balance: RwLock::new(AccountBalance {
                buying_power: Default::default(),
                cash: Default::default(),
                total_equity: Default::default(),
                day_trades_used: 0,
            }),
            market_open: RwLock::new(true),
            ..Default::default()
        }
    }

    pub async fn set_quote(&self, quote: Quote) {
        self.quotes.write().await.insert(quote.symbol.clone(), quote);
    }

    pub async fn set_balance(&self, balance: AccountBalance) {
        *self.balance.write().await = balance;
    }

    async fn next_order_id(&self) -> String {
        format!("mock-{}", self.order_seq.fetch_add(1, Ordering::SeqCst))
    }

    async fn submit(&self, request: &OrderRequest, limit_price: rust_decimal::Decimal) -> Result<OrderEnvelope, BrokerError> {
        if let Some(err) = self.next_order_error.write().await.take() {
            return Err(err);
        }
        let order_id = self.next_order_id().await;
        let now = Utc::now();
        let envelope = OrderEnvelope {
            order_id: order_id.clone(),
            request: request.clone(),
            limit_price,
            status: OrderStatus::Submitted,
            submitted_at: now,
            last_status_at: now,
        };
        self.orders.write().await.insert(order_id, envelope.clone());
        Ok(envelope)
    }
}

#[async_trait]
impl BrokerAdapter for MockBrokerAdapter {
    async fn get_latest_price(&self, symbol: &str) -> Result<Quote, BrokerError> {
        self.quotes
            .read()
            .await
            .get(symbol)
            .cloned()
            .ok_or_else(|| BrokerError::from_status(404, format!("no quote seeded for {symbol}")))
    }

    async fn get_quotes(&self, symbols: &[String]) -> Result<Vec<Quote>, BrokerError> {
        let mut out = Vec::with_capacity(symbols.len());
        for s in symbols {
            out.push(self.get_latest_price(s).await?);
        }
        Ok(out)
    }

    async fn get_historical(
        &self,
        symbol: &str,
        _interval: HistoricalInterval,
        _span: HistoricalSpan,
    ) -> Result<Vec<HistoricalBar>, BrokerError> {
        Ok(self.historical.read().await.get(symbol).cloned().unwrap_or_default())
    }

    async fn get_market_hours(&self) -> Result<MarketStatus, BrokerError> {
        Ok(MarketStatus {
            is_open: *self.market_open.read().await,
        })
    }

    async fn submit_limit_buy(&self, request: &OrderRequest, limit_price: rust_decimal::Decimal) -> Result<OrderEnvelope, BrokerError> {
        self.submit(request, limit_price).await
    }

    async fn submit_limit_sell(&self, request: &OrderRequest, limit_price: rust_decimal::Decimal) -> Result<OrderEnvelope, BrokerError> {
        self.submit(request, limit_price).await
    }

    async fn cancel_order(&self, order_id: &str) -> Result<(), BrokerError> {
        let mut orders = self.orders.write().await;
        match orders.get_mut(order_id) {
            Some(order) => {
                order.status = OrderStatus::Cancelled;
                order.last_status_at = Utc::now();
                Ok(())
            }
            None => Err(BrokerError::from_status(404, "unknown order")),
        }
    }

    async fn cancel_all_orders(&self) -> Result<Vec<String>, BrokerError> {
        let mut orders = self.orders.write().await;
        let mut cancelled = Vec::new();
        for (id, order) in orders.iter_mut() {
            if !order.status.is_terminal() {
                order.status = OrderStatus::Cancelled;
                order.last_status_at = Utc::now();
                cancelled.push(id.clone());
            }
        }
        Ok(cancelled)
    }

    async fn fetch_order(&self, order_id: &str) -> Result<OrderEnvelope, BrokerError> {
        self.orders
            .read()
            .await
            .get(order_id)
            .cloned()
            .ok_or_else(|| BrokerError::from_status(404, "unknown order"))
    }

    async fn load_account_profile(&self) -> Result<AccountBalance, BrokerError> {
        Ok(self.balance.read().await.clone())
    }

    async fn get_positions(&self) -> Result<Vec<Position>, BrokerError> {
        Ok(self.positions.read().await.clone())
    }

    async fn probe_session(&self) -> Result<(), BrokerError> {
        if let Some(err) = self.session_probe_error.read().await.clone() {
            return Err(err);
        }
        Ok(())
    }

    async fn reauthenticate(&self) -> Result<(), BrokerError> {
        *self.session_probe_error.write().await = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{MarketState, OrderSide};
    use rust_decimal_macros::dec;

    #[tokio::test]
    async fn submit_then_fetch_round_trips() {
        let broker = MockBrokerAdapter::new();
        let request = OrderRequest::new("AAPL", OrderSide::Buy, 1, dec!(100), None).unwrap();
        let envelope = broker.submit_limit_buy(&request, dec!(99.9)).await.unwrap();
        let fetched = broker.fetch_order(&envelope.order_id).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Submitted);
    }

    #[tokio::test]
    async fn cancel_all_orders_only_affects_non_terminal() {
        let broker = MockBrokerAdapter::new();
        let request = OrderRequest::new("AAPL", OrderSide::Buy, 1, dec!(100), None).unwrap();
        let envelope = broker.submit_limit_buy(&request, dec!(99.9)).await.unwrap();
        let cancelled = broker.cancel_all_orders().await.unwrap();
        assert_eq!(cancelled, vec![envelope.order_id.clone()]);
        let fetched = broker.fetch_order(&envelope.order_id).await.unwrap();
        assert_eq!(fetched.status, OrderStatus::Cancelled);
    }

    #[tokio::test]
    async fn missing_quote_surfaces_as_broker_error() {
        let broker = MockBrokerAdapter::new();
        assert!(broker.get_latest_price("ZZZZ").await.is_err());
    }

    #[tokio::test]
    async fn seeded_quote_is_returned() {
        let broker = MockBrokerAdapter::new();
        broker
            .set_quote(Quote {
                symbol: "AAPL".into(),
                price: dec!(100),
                timestamp_utc: Utc::now(),
                market_state: MarketState::Regular,
            })
            .await;
        let quote = broker.get_latest_price("AAPL").await.unwrap();
        assert_eq!(quote.price, dec!(100));
    }
}
