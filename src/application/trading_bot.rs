//! TradingBot (C8): orchestrates C2-C7 per trading cycle.
//!
//! Grounded on the donor codebase's top-level bot loop (probe -> quote -> strategy ->
//! risk gate -> submit -> log), generalized to the paper-trading short-circuit and
//! explicit `start`/`stop`/`execute_trade` surface in §4.8.

use crate::application::account_cache::AccountDataCache;
use crate::application::logger::{Stream, StructuredLogger};
use crate::application::market_data::MarketData;
use crate::application::order_manager::OrderManager;
use crate::application::safety_checks::{SafetyChecks, SafetyContext};
use crate::application::session_health::SessionHealth;
use crate::domain::errors::OrderError;
use crate::domain::types::{ExecutionMode, OrderRequest, OrderSide, TradeRecord};
use chrono::Utc;
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

pub struct TradingBot {
    market_data: Arc<MarketData>,
    safety_checks: Arc<SafetyChecks>,
    order_manager: Arc<OrderManager>,
    account_cache: Arc<AccountDataCache>,
    session_health: Arc<SessionHealth>,
    logger: Arc<StructuredLogger>,
    paper_trading: bool,
    health_check_interval_s: u64,
    session_id: String,
    config_hash: String,
}

#[derive(Debug, Clone)]
pub enum TradeOutcome {
    Executed { order_id: Option<String> },
    PaperSimulated,
    Blocked { reason: String },
}

impl TradingBot {
    pub fn new(
        market_data: Arc<MarketData>,
        safety_checks: Arc<SafetyChecks>,
        order_manager: Arc<OrderManager>,
        account_cache: Arc<AccountDataCache>,
        session_health: Arc<SessionHealth>,
        logger: Arc<StructuredLogger>,
        paper_trading: bool,
        health_check_interval_s: u64,
        config_hash: String,
    ) -> Self {
        Self {
            market_data,
            safety_checks,
            order_manager,
            account_cache,
            session_health,
            logger,
            paper_trading,
            health_check_interval_s,
            session_id: Uuid::new_v4().to_string(),
            config_hash,
        }
    }

    pub async fn start(&self) {
        self.session_health.start(self.health_check_interval_s).await;
        info!(session_id = %self.session_id, "trading bot started");
    }

    /// Cooperative shutdown: cancels the health timer, cancels all equity orders
    /// best-effort, and flushes nothing else (the JSONL sink has no buffer to flush).
    pub async fn stop(&self) {
        self.session_health.stop().await;
        if let Err(err) = self.order_manager.cancel_all_equity_orders().await {
            info!(?err, "cancel_all_equity_orders failed during shutdown");
        }
        info!(session_id = %self.session_id, "trading bot stopped");
    }

    /// One trading cycle for a single symbol/side/quantity candidate, driven by the
    /// caller's strategy layer. Paper-trading mode short-circuits before submission,
    /// recording a simulated trade (§4.8).
    pub async fn execute_trade(
        &self,
        symbol: &str,
        side: OrderSide,
        quantity: u32,
        daily_pnl: Decimal,
        trailing_trade_pnls: Vec<Decimal>,
    ) -> Result<TradeOutcome, OrderError> {
        self.session_health.probe_once().await;

        let quote = self
            .market_data
            .get_quote(symbol)
            .await
            .map_err(|e| OrderError::Broker(crate::domain::errors::BrokerError::NonRetriable(
                crate::domain::errors::NonRetriableError::InvalidInput { reason: e.to_string() },
            )))?;

        let request = OrderRequest::new(symbol, side, quantity, quote.price, None)
            .map_err(|e| OrderError::Broker(crate::domain::errors::BrokerError::NonRetriable(
                crate::domain::errors::NonRetriableError::InvalidInput { reason: e.to_string() },
            )))?;

        let buying_power = self
            .account_cache
            .get_buying_power()
            .await
            .map_err(OrderError::Broker)?;
        let balance = self.account_cache.get_balance().await.map_err(OrderError::Broker)?;

        let ctx = SafetyContext {
            request: request.clone(),
            buying_power,
            portfolio_value: balance.total_equity,
            daily_pnl,
            trailing_trade_pnls,
            now: Utc::now(),
        };

        let verdict = self.safety_checks.validate(&ctx).await;
        if !verdict.is_safe {
            let reason = verdict.blocking_reason.unwrap_or_default();
            return Ok(TradeOutcome::Blocked { reason });
        }

        if self.paper_trading {
            self.record_trade(&request, None, ExecutionMode::Paper).await;
            return Ok(TradeOutcome::PaperSimulated);
        }

        let envelope = self.order_manager.submit(request.clone()).await?;
        self.account_cache.invalidate_all().await;
        self.safety_checks
            .register_pending(symbol, side, &envelope.order_id)
            .await;
        self.record_trade(&request, Some(envelope.order_id.clone()), ExecutionMode::Live)
            .await;

        Ok(TradeOutcome::Executed {
            order_id: Some(envelope.order_id),
        })
    }

    async fn record_trade(&self, request: &OrderRequest, order_id: Option<String>, mode: ExecutionMode) {
        let record = TradeRecord {
            ts_utc: Utc::now(),
            symbol: request.symbol.clone(),
            side: request.side,
            quantity: Decimal::from(request.quantity),
            price: request.reference_price,
            total_value: request.notional(),
            order_id,
            execution_mode: mode,
            strategy_id: request.strategy_id.clone(),
            pnl: None,
            hold_duration_s: None,
            session_id: self.session_id.clone(),
            config_hash: self.config_hash.clone(),
        };
        self.logger
            .log(Stream::Trades, "trade.executed", json!(record))
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::market_data::TradingHoursValidator;
    use crate::application::retry::{CircuitBreakerHandle, RetryPolicy};
    use crate::domain::config::RiskManagementConfig;
    use crate::domain::risk::pending::PendingOrderRegistry;
    use crate::domain::types::{AccountBalance, MarketState, Quote};
    use crate::infrastructure::broker::mock::MockBrokerAdapter;
    use crate::infrastructure::persistence::circuit_breaker::InMemoryCircuitBreakerStateRepository;
    use rust_decimal_macros::dec;
    use tokio::sync::Mutex;

    async fn bot(paper_trading: bool) -> TradingBot {
        let broker = Arc::new(MockBrokerAdapter::new());
        broker
            .set_quote(Quote {
                symbol: "AAPL".into(),
                price: dec!(100),
                timestamp_utc: Utc::now(),
                market_state: MarketState::Regular,
            })
            .await;
        broker
            .set_balance(AccountBalance {
                buying_power: dec!(10_000),
                cash: dec!(10_000),
                total_equity: dec!(10_000),
                day_trades_used: 0,
            })
            .await;

        let logger = Arc::new(StructuredLogger::new(std::env::temp_dir().join(format!(
            "tradewarden-bot-test-{}",
            uuid::Uuid::new_v4()
        ))));
        let account_cache = Arc::new(AccountDataCache::new(
            broker.clone(),
            logger.clone(),
            RetryPolicy::default(),
            60,
            300,
        ));
        let pending = Arc::new(Mutex::new(PendingOrderRegistry::default()));
        let market_data = Arc::new(MarketData::new(
            broker.clone(),
            RetryPolicy::default(),
            300,
            TradingHoursValidator::new(0, 24, "America/New_York"),
            Vec::new(),
        ));
        let safety_checks = Arc::new(
            SafetyChecks::load(
                RiskManagementConfig::default(),
                TradingHoursValidator::new(0, 24, "America/New_York"),
                CircuitBreakerHandle::new(3600, 3),
                Arc::new(InMemoryCircuitBreakerStateRepository::default()),
                pending.clone(),
                logger.clone(),
            )
            .await,
        );
        let order_manager = Arc::new(OrderManager::new(
            broker.clone(),
            RetryPolicy::default(),
            Default::default(),
            pending,
            account_cache.clone(),
            logger.clone(),
        ));
        let session_health = SessionHealth::new(broker, RetryPolicy::default(), CircuitBreakerHandle::new(3600, 3), logger.clone());

        TradingBot::new(
            market_data,
            safety_checks,
            order_manager,
            account_cache,
            session_health,
            logger,
            paper_trading,
            300,
            "testhash".to_string(),
        )
    }

    #[tokio::test]
    async fn paper_trading_short_circuits_before_submission() {
        let bot = bot(true).await;
        let outcome = bot
            .execute_trade("AAPL", OrderSide::Buy, 1, Decimal::ZERO, Vec::new())
            .await
            .unwrap();
        assert!(matches!(outcome, TradeOutcome::PaperSimulated));
    }

    #[tokio::test]
    async fn live_trading_submits_and_registers_pending() {
        let bot = bot(false).await;
        let outcome = bot
            .execute_trade("AAPL", OrderSide::Buy, 1, Decimal::ZERO, Vec::new())
            .await
            .unwrap();
        assert!(matches!(outcome, TradeOutcome::Executed { .. }));
    }

    #[tokio::test]
    async fn blocked_trade_returns_blocked_outcome() {
        let bot = bot(false).await;
        // quantity far beyond buying power at price 100
        let outcome = bot
            .execute_trade("AAPL", OrderSide::Buy, 10_000, Decimal::ZERO, Vec::new())
            .await
            .unwrap();
        assert!(matches!(outcome, TradeOutcome::Blocked { .. }));
    }
}
