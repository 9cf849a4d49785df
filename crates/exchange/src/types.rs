use chrono::{DateTime, Utc};
use perpbot_core::domain::{OrderSide, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One OHLCV bar. Wire values are decimal strings on every real exchange;
/// `rust_decimal::Decimal` is used end-to-end so nothing round-trips
/// through a binary float.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Kline {
    pub open_time: DateTime<Utc>,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Ticker24h {
    pub high: Decimal,
    pub low: Decimal,
    pub change_pct: f64,
    pub volume: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    pub order_id: String,
    pub filled_qty: Decimal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosePositionResult {
    pub order_id: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ExchangePosition {
    pub side: Side,
    pub amount: Decimal,
    pub entry_price: Decimal,
    pub leverage: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AccountBalance {
    pub available: Decimal,
    pub balance: Decimal,
    pub unrealized_pnl: Decimal,
}

#[must_use]
pub const fn side_str(side: OrderSide) -> &'static str {
    match side {
        OrderSide::Buy => "BUY",
        OrderSide::Sell => "SELL",
    }
}
