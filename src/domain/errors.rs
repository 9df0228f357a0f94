//! Error taxonomy shared by every subsystem (C1).
//!
//! Every error that can cross a broker boundary is classified as
//! [`RetriableError`], [`NonRetriableError`], or [`FatalError`] so that
//! `with_retry` (see `application::retry`) can decide whether to back off
//! and try again without each call site re-deriving that judgment.

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors for which a retry (with backoff) may succeed.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RetriableError {
    #[error("network timeout")]
    NetworkTimeout,

    #[error("rate limited, retry after {retry_after_s:?}s")]
    RateLimit { retry_after_s: Option<u64> },

    #[error("server error: {status}")]
    ServerError5xx { status: u16 },

    #[error("session token expired")]
    TransientAuthExpired,
}

/// Errors that will never succeed on retry; the caller must change something first.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum NonRetriableError {
    #[error("client error: {status} {message}")]
    ClientError4xx { status: u16, message: String },

    #[error("invalid input: {reason}")]
    InvalidInput { reason: String },

    #[error("unsupported order type: {order_type}")]
    UnsupportedOrderType { order_type: String },

    #[error("insufficient funds: need ${need}, available ${available}")]
    InsufficientFunds { need: Decimal, available: Decimal },
}

/// Errors that should halt the bot outright.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FatalError {
    #[error("authentication permanently failed: {reason}")]
    AuthPermanentlyFailed { reason: String },

    #[error("invalid configuration: {reason}")]
    ConfigInvalid { reason: String },
}

/// Top-level broker error: the union `with_retry` dispatches on.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum BrokerError {
    #[error(transparent)]
    Retriable(#[from] RetriableError),

    #[error(transparent)]
    NonRetriable(#[from] NonRetriableError),

    #[error(transparent)]
    Fatal(#[from] FatalError),
}

impl BrokerError {
    pub fn is_retriable(&self) -> bool {
        matches!(self, BrokerError::Retriable(_))
    }

    /// Map an HTTP-ish status code onto the taxonomy per the external-interfaces contract:
    /// 401/403 -> NonRetriable, 429 -> RateLimit, 5xx -> Retriable.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => BrokerError::NonRetriable(NonRetriableError::ClientError4xx {
                status,
                message,
            }),
            429 => BrokerError::Retriable(RetriableError::RateLimit { retry_after_s: None }),
            500..=599 => BrokerError::Retriable(RetriableError::ServerError5xx { status }),
            400..=499 => BrokerError::NonRetriable(NonRetriableError::ClientError4xx {
                status,
                message,
            }),
            _ => BrokerError::Retriable(RetriableError::ServerError5xx { status }),
        }
    }
}

/// Errors raised while validating a pre-trade safety rule (C5).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SafetyError {
    #[error("trading window violated: now is outside the permitted window")]
    TradingHours,

    #[error("circuit breaker is open: {reason}")]
    CircuitBreakerOpen { reason: String },

    #[error("invalid trade input: {reason}")]
    InvalidInput { reason: String },

    /// A bug inside a check itself. Fail-fast: this trips the breaker (§7).
    #[error("safety check failed unexpectedly: {reason}")]
    CheckFailure { reason: String },
}

/// Errors raised by market-data validation (C4).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum MarketDataError {
    #[error("quote for {symbol} is stale or invalid: {reason}")]
    InvalidQuote { symbol: String, reason: String },

    #[error("data quality error: missing bars for {symbol} on {missing_dates:?}")]
    DataQuality {
        symbol: String,
        missing_dates: Vec<chrono::NaiveDate>,
    },

    #[error("outside trading window")]
    TradingHoursError,
}

/// Errors raised while managing orders (C6).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum OrderError {
    #[error("order cancellation failed for: {failed_order_ids:?}")]
    CancellationFailed { failed_order_ids: Vec<String> },

    #[error("unsupported order type: {order_type}")]
    UnsupportedOrderType { order_type: String },

    #[error(transparent)]
    Broker(#[from] BrokerError),
}
