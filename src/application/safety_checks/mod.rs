//! SafetyChecks (C5): composes the ordered pre-trade validator chain and owns the
//! circuit-breaker state file.
//!
//! Grounded on the donor codebase's risk-management module (an ordered chain of
//! independent checks backed by a persisted breaker file), generalized to the eight
//! validators and first-blocker-wins contract in §4.5.

pub mod validators;

use crate::application::logger::{Stream, StructuredLogger};
use crate::application::market_data::TradingHoursValidator;
use crate::application::retry::SharedCircuitBreaker;
use crate::domain::config::RiskManagementConfig;
use crate::domain::errors::SafetyError;
use crate::domain::repositories::CircuitBreakerStateRepository;
use crate::domain::risk::pending::PendingOrderRegistry;
use crate::domain::risk::state::CircuitBreakerState;
use crate::domain::types::{OrderRequest, OrderSide};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde_json::json;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::warn;

pub type SharedPendingRegistry = Arc<Mutex<PendingOrderRegistry>>;

#[derive(Debug, Clone, Default)]
pub struct SafetyResult {
    pub is_safe: bool,
    pub blocking_reason: Option<String>,
    pub warnings: Vec<String>,
}

impl SafetyResult {
    fn ok() -> Self {
        Self {
            is_safe: true,
            blocking_reason: None,
            warnings: Vec::new(),
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            is_safe: false,
            blocking_reason: Some(reason.into()),
            warnings: Vec::new(),
        }
    }
}

/// Everything a single candidate trade needs evaluated against. Built fresh by the
/// caller (TradingBot) for each `validate()` call.
pub struct SafetyContext {
    pub request: OrderRequest,
    pub buying_power: Decimal,
    pub portfolio_value: Decimal,
    pub daily_pnl: Decimal,
    /// Closed-trade P&L, newest first, used for the consecutive-loss check.
    pub trailing_trade_pnls: Vec<Decimal>,
    pub now: DateTime<Utc>,
}

pub struct SafetyChecks {
    risk_config: RiskManagementConfig,
    trading_hours: TradingHoursValidator,
    circuit_breaker: SharedCircuitBreaker,
    breaker_state: RwLock<CircuitBreakerState>,
    repository: Arc<dyn CircuitBreakerStateRepository>,
    pending: SharedPendingRegistry,
    logger: Arc<StructuredLogger>,
}

impl SafetyChecks {
    /// On startup, a malformed or unreadable state file trips the breaker (fail-safe, §4.5).
    pub async fn load(
        risk_config: RiskManagementConfig,
        trading_hours: TradingHoursValidator,
        circuit_breaker: SharedCircuitBreaker,
        repository: Arc<dyn CircuitBreakerStateRepository>,
        pending: SharedPendingRegistry,
        logger: Arc<StructuredLogger>,
    ) -> Self {
        let breaker_state = match repository.load().await {
            Ok(Some(state)) => state,
            Ok(None) => CircuitBreakerState::default(),
            Err(err) => {
                warn!(?err, "circuit breaker state file unreadable, tripping fail-safe");
                CircuitBreakerState::tripped("state_load_failure", Utc::now())
            }
        };
        Self {
            risk_config,
            trading_hours,
            circuit_breaker,
            breaker_state: RwLock::new(breaker_state),
            repository,
            pending,
            logger,
        }
    }

    /// Ordered evaluation, first blocker wins (§4.5).
    pub async fn validate(&self, ctx: &SafetyContext) -> SafetyResult {
        let breaker_state = self.breaker_state.read().await.clone();
        if let Err(e) = validators::circuit_breaker::check(
            breaker_state.active,
            breaker_state.reason.as_deref(),
        ) {
            return self.block(&e).await;
        }

        if let Err(e) = validators::trading_hours::check(&self.trading_hours, ctx.now) {
            return self.block(&e).await;
        }

        if let Err(e) = validators::buying_power::check(
            Decimal::from(ctx.request.quantity),
            ctx.request.reference_price,
            ctx.buying_power,
        ) {
            return self.block(&e).await;
        }

        if let Err(e) = validators::daily_loss_limit::check(
            ctx.daily_pnl,
            ctx.portfolio_value,
            self.risk_config.max_daily_loss_pct,
        ) {
            self.trigger_circuit_breaker(validators::daily_loss_limit::TRIP_REASON).await;
            return self.block(&e).await;
        }

        if let Err(e) = validators::consecutive_losses::check(
            &ctx.trailing_trade_pnls,
            self.risk_config.consecutive_loss_limit,
        ) {
            self.trigger_circuit_breaker(validators::consecutive_losses::TRIP_REASON).await;
            return self.block(&e).await;
        }

        if let Err(e) = validators::position_size::check(
            Decimal::from(ctx.request.quantity),
            ctx.request.reference_price,
            ctx.portfolio_value,
            self.risk_config.max_position_pct,
        ) {
            return self.block(&e).await;
        }

        {
            let pending = self.pending.lock().await;
            if let Err(e) = validators::duplicate_order::check(&pending, &ctx.request.symbol, ctx.request.side) {
                return self.block(&e).await;
            }
        }

        if let Err(e) = validators::input_validation::check(&ctx.request) {
            return self.block(&e).await;
        }

        SafetyResult::ok()
    }

    async fn block(&self, err: &SafetyError) -> SafetyResult {
        self.logger
            .log(
                Stream::RiskManagement,
                "safety_check.blocked",
                json!({"reason": err.to_string()}),
            )
            .await;
        SafetyResult::blocked(err.to_string())
    }

    pub async fn trigger_circuit_breaker(&self, reason: &str) {
        let now = Utc::now();
        let state = CircuitBreakerState::tripped(reason, now);
        *self.breaker_state.write().await = state.clone();
        if let Err(err) = self.repository.save(&state).await {
            warn!(?err, "failed to persist circuit breaker trip");
        }
        self.circuit_breaker.record_failure().await;
        self.logger
            .log(Stream::RiskManagement, "circuit_breaker.tripped", json!({"reason": reason}))
            .await;
    }

    pub async fn reset_circuit_breaker(&self) {
        let now = Utc::now();
        let state = CircuitBreakerState::reset(now);
        *self.breaker_state.write().await = state.clone();
        if let Err(err) = self.repository.save(&state).await {
            warn!(?err, "failed to persist circuit breaker reset");
        }
        self.circuit_breaker.reset().await;
        self.logger
            .log(Stream::RiskManagement, "circuit_breaker.reset", json!({}))
            .await;
    }

    pub async fn is_breaker_active(&self) -> bool {
        self.breaker_state.read().await.active
    }

    pub async fn register_pending(&self, symbol: &str, side: OrderSide, order_id: &str) {
        self.pending.lock().await.register(symbol, side, order_id, Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::persistence::circuit_breaker::InMemoryCircuitBreakerStateRepository;
    use rust_decimal_macros::dec;

    async fn make_checks() -> SafetyChecks {
        SafetyChecks::load(
            RiskManagementConfig::default(),
            TradingHoursValidator::new(0, 24, "America/New_York"),
            crate::application::retry::CircuitBreakerHandle::new(3600, 3),
            Arc::new(InMemoryCircuitBreakerStateRepository::default()),
            Arc::new(Mutex::new(PendingOrderRegistry::default())),
            Arc::new(StructuredLogger::new(std::env::temp_dir().join(format!(
                "tradewarden-safety-test-{}",
                uuid::Uuid::new_v4()
            )))),
        )
        .await
    }

    fn ctx(quantity: u32, price: Decimal, buying_power: Decimal) -> SafetyContext {
        SafetyContext {
            request: OrderRequest::new("AAPL", OrderSide::Buy, quantity, price, None).unwrap(),
            buying_power,
            portfolio_value: dec!(10_000),
            daily_pnl: Decimal::ZERO,
            trailing_trade_pnls: Vec::new(),
            now: Utc::now(),
        }
    }

    #[tokio::test]
    async fn passes_a_clean_request() {
        let checks = make_checks().await;
        let result = checks.validate(&ctx(1, dec!(10), dec!(1000))).await;
        assert!(result.is_safe);
    }

    #[tokio::test]
    async fn blocks_when_buying_power_insufficient() {
        let checks = make_checks().await;
        let result = checks.validate(&ctx(1000, dec!(10), dec!(100))).await;
        assert!(!result.is_safe);
    }

    #[tokio::test]
    async fn daily_loss_limit_breach_trips_breaker_for_subsequent_calls() {
        let checks = make_checks().await;
        let mut c = ctx(1, dec!(10), dec!(1000));
        c.daily_pnl = dec!(-500); // 5% of 10_000 > default 3%
        let result = checks.validate(&c).await;
        assert!(!result.is_safe);
        assert!(checks.is_breaker_active().await);

        let second = checks.validate(&ctx(1, dec!(10), dec!(1000))).await;
        assert!(!second.is_safe);
    }

    #[tokio::test]
    async fn reset_clears_breaker() {
        let checks = make_checks().await;
        checks.trigger_circuit_breaker("test").await;
        assert!(checks.is_breaker_active().await);
        checks.reset_circuit_breaker().await;
        assert!(!checks.is_breaker_active().await);
    }

    #[tokio::test]
    async fn duplicate_pending_order_blocks() {
        let checks = make_checks().await;
        checks.register_pending("AAPL", OrderSide::Buy, "ord-1").await;
        let result = checks.validate(&ctx(1, dec!(10), dec!(1000))).await;
        assert!(!result.is_safe);
    }
}
