//! Limit-price calculation (§4.6): offset the reference price by the configured
//! mode, round to the broker's tick, and enforce the slippage guard.

use crate::domain::errors::OrderError;
use crate::domain::config::OffsetMode;
use crate::domain::types::OrderSide;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

pub const DEFAULT_TICK: Decimal = dec!(0.01);

pub fn calculate(
    reference_price: Decimal,
    side: OrderSide,
    mode: OffsetMode,
    buy_offset: f64,
    sell_offset: f64,
    max_slippage_pct: f64,
) -> Result<Decimal, OrderError> {
    let offset = match side {
        OrderSide::Buy => buy_offset,
        OrderSide::Sell => sell_offset,
    };
    let offset_decimal = Decimal::try_from(offset).unwrap_or(Decimal::ZERO);

    let raw = match (mode, side) {
        (OffsetMode::Bps, OrderSide::Buy) => reference_price * (Decimal::ONE - offset_decimal),
        (OffsetMode::Bps, OrderSide::Sell) => reference_price * (Decimal::ONE + offset_decimal),
        (OffsetMode::Absolute, OrderSide::Buy) => reference_price - offset_decimal,
        (OffsetMode::Absolute, OrderSide::Sell) => reference_price + offset_decimal,
    };

    let limit = round_to_tick(raw, DEFAULT_TICK);

    let slippage_pct = ((limit - reference_price) / reference_price).abs() * Decimal::from(100);
    let max_slippage = Decimal::try_from(max_slippage_pct).unwrap_or(Decimal::ZERO);
    if slippage_pct > max_slippage {
        return Err(OrderError::Broker(crate::domain::errors::BrokerError::NonRetriable(
            crate::domain::errors::NonRetriableError::InvalidInput {
                reason: format!("limit price slippage {slippage_pct}% exceeds max {max_slippage_pct}%"),
            },
        )));
    }

    Ok(limit)
}

fn round_to_tick(price: Decimal, tick: Decimal) -> Decimal {
    if tick <= Decimal::ZERO {
        return price;
    }
    (price / tick).round() * tick
}
