//! OrderManager (C6): limit-price computation, submission, cancellation, status
//! reconciliation, and the pending-order registry.
//!
//! Grounded on the donor codebase's order-execution service, generalized from a
//! single-exchange order path to the offset-mode/slippage-guard/reconciliation loop
//! in §4.6.

pub mod limit_price;

use crate::application::account_cache::AccountDataCache;
use crate::application::logger::{Stream, StructuredLogger};
use crate::application::retry::{with_retry, RetryPolicy};
use crate::application::safety_checks::SharedPendingRegistry;
use crate::domain::config::OrderManagementConfig;
use crate::domain::errors::OrderError;
use crate::domain::ports::BrokerAdapter;
use crate::domain::types::{OrderEnvelope, OrderRequest, OrderStatus};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tracing::info;

pub struct OrderManager {
    broker: Arc<dyn BrokerAdapter>,
    retry_policy: RetryPolicy,
    config: OrderManagementConfig,
    pending: SharedPendingRegistry,
    account_cache: Arc<AccountDataCache>,
    logger: Arc<StructuredLogger>,
}

impl OrderManager {
    pub fn new(
        broker: Arc<dyn BrokerAdapter>,
        retry_policy: RetryPolicy,
        config: OrderManagementConfig,
        pending: SharedPendingRegistry,
        account_cache: Arc<AccountDataCache>,
        logger: Arc<StructuredLogger>,
    ) -> Self {
        Self {
            broker,
            retry_policy,
            config,
            pending,
            account_cache,
            logger,
        }
    }

    fn limit_price_for(&self, request: &OrderRequest) -> Result<rust_decimal::Decimal, OrderError> {
        let (buy_offset, sell_offset) = self.config.offsets_for(request.strategy_id.as_deref());
        limit_price::calculate(
            request.reference_price,
            request.side,
            self.config.offset_mode,
            buy_offset,
            sell_offset,
            self.config.max_slippage_pct,
        )
    }

    /// Builds the request, computes the limit, submits via `with_retry`, registers the
    /// pending order on success. On persistent failure the pending registry is left
    /// untouched (§4.6).
    pub async fn submit(&self, request: OrderRequest) -> Result<OrderEnvelope, OrderError> {
        let limit_price = self.limit_price_for(&request)?;
        let side = request.side;
        let symbol = request.symbol.clone();

        let envelope = with_retry(
            self.retry_policy,
            || async {
                match side {
                    crate::domain::types::OrderSide::Buy => {
                        self.broker.submit_limit_buy(&request, limit_price).await
                    }
                    crate::domain::types::OrderSide::Sell => {
                        self.broker.submit_limit_sell(&request, limit_price).await
                    }
                }
            },
            |_| {},
        )
        .await
        .map_err(OrderError::Broker)?;

        self.pending
            .lock()
            .await
            .register(&symbol, side, &envelope.order_id, Utc::now());
        self.account_cache.invalidate_all().await;
        self.logger
            .log(
                Stream::Orders,
                "order.submitted",
                json!({"order_id": envelope.order_id, "symbol": symbol, "side": side.to_string(), "limit_price": limit_price.to_string()}),
            )
            .await;

        Ok(envelope)
    }

    /// Issues per-order cancels for every pending order. Partial failures raise
    /// `OrderError::CancellationFailed` listing the ones that did not cancel;
    /// successes clear the registry and invalidate the cache (§4.6).
    pub async fn cancel_all_equity_orders(&self) -> Result<(), OrderError> {
        let entries = self.pending.lock().await.entries();
        let mut cancelled = Vec::new();
        let mut failed_order_ids = Vec::new();
        for (symbol, side, order_id) in entries {
            match self.broker.cancel_order(&order_id).await {
                Ok(()) => cancelled.push((symbol, side, order_id)),
                Err(_) => failed_order_ids.push(order_id),
            }
        }

        {
            let mut pending = self.pending.lock().await;
            for (symbol, side, _) in &cancelled {
                pending.remove(symbol, *side);
            }
        }
        self.account_cache.invalidate_all().await;
        self.logger
            .log(
                Stream::Orders,
                "order.cancel_all",
                json!({"order_ids": cancelled.iter().map(|(_, _, id)| id.clone()).collect::<Vec<_>>()}),
            )
            .await;

        if !failed_order_ids.is_empty() {
            return Err(OrderError::CancellationFailed { failed_order_ids });
        }
        Ok(())
    }

    /// Polls every pending order once, normalizing broker payloads and clearing
    /// terminal ones from the registry (§4.6). Callers loop this on `poll_interval_s`.
    pub async fn synchronize_open_orders(&self) -> Result<(), OrderError> {
        let order_ids = self.pending.lock().await.all_order_ids();
        for order_id in order_ids {
            let envelope = self.broker.fetch_order(&order_id).await.map_err(OrderError::Broker)?;
            if envelope.status.is_terminal() {
                self.pending
                    .lock()
                    .await
                    .remove(&envelope.request.symbol, envelope.request.side);
                self.account_cache.invalidate_all().await;
                let event = match envelope.status {
                    OrderStatus::Filled => "order.filled",
                    OrderStatus::Cancelled => "order.cancelled",
                    OrderStatus::Rejected => "order.rejected",
                    _ => unreachable!("is_terminal() only admits Filled/Cancelled/Rejected"),
                };
                info!(order_id = %order_id, status = ?envelope.status, "order reached terminal status");
                self.logger
                    .log(Stream::Orders, event, json!({"order_id": order_id}))
                    .await;
            }
        }
        Ok(())
    }

    /// Unsupported order types (stop, market) raise rather than silently coercing
    /// to a limit order (§4.6).
    pub async fn reject_unsupported(&self, order_type: &str) -> Result<(), OrderError> {
        self.logger
            .log(
                Stream::Orders,
                "order.rejected_unsupported",
                json!({"order_type": order_type}),
            )
            .await;
        Err(OrderError::UnsupportedOrderType {
            order_type: order_type.to_string(),
        })
    }
}
