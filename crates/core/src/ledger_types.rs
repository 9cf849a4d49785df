use crate::domain::Side;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TradeStatus {
    Open,
    Closed,
}

/// Reason an exit was triggered; persisted on the closed ledger row and
/// fired alongside `onTrade(CLOSE, ...)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    #[serde(rename = "TP")]
    TakeProfit,
    #[serde(rename = "SL")]
    StopLoss,
    #[serde(rename = "TIME_CUT")]
    TimeCut,
    #[serde(rename = "MANUAL")]
    Manual,
    #[serde(rename = "END")]
    End,
}

impl ExitReason {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TakeProfit => "TP",
            Self::StopLoss => "SL",
            Self::TimeCut => "TIME_CUT",
            Self::Manual => "MANUAL",
            Self::End => "END",
        }
    }
}

/// A row of the trade-history ledger: created OPEN at entry, updated to
/// CLOSED exactly once at exit. This is the contract both the live loop
/// and the memory-context analytics queries agree on.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeLedgerRow {
    pub id: Uuid,
    pub bot_id: Uuid,
    pub symbol: String,
    pub side: Side,
    pub entry_time: DateTime<Utc>,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub leverage: u32,
    pub status: TradeStatus,

    pub exit_time: Option<DateTime<Utc>>,
    pub exit_price: Option<Decimal>,
    pub exit_reason: Option<ExitReason>,
    pub pnl: Option<Decimal>,
    pub pnl_pct: Option<f64>,
    pub duration_minutes: Option<i64>,

    /// RSI-14 reading at entry, when available. Carried so the memory
    /// builder can bucket historical trades by RSI zone; not part of
    /// the minimal contract in §4.6 but needed to satisfy its own
    /// "per-RSI-zone aggregates" query shape.
    pub entry_rsi: Option<f64>,
}

impl TradeLedgerRow {
    #[must_use]
    pub fn open(
        bot_id: Uuid,
        symbol: String,
        side: Side,
        entry_price: Decimal,
        quantity: Decimal,
        leverage: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            bot_id,
            symbol,
            side,
            entry_time: Utc::now(),
            entry_price,
            quantity,
            leverage,
            status: TradeStatus::Open,
            exit_time: None,
            exit_price: None,
            exit_reason: None,
            pnl: None,
            pnl_pct: None,
            duration_minutes: None,
            entry_rsi: None,
        }
    }

    #[must_use]
    pub const fn with_entry_rsi(mut self, rsi: f64) -> Self {
        self.entry_rsi = Some(rsi);
        self
    }

    /// Closes this row in place. Idempotency (exactly-once close) is the
    /// ledger store's responsibility, not this value type's.
    pub fn close(
        &mut self,
        exit_price: Decimal,
        exit_reason: ExitReason,
        exit_time: DateTime<Utc>,
    ) {
        let pnl_pct = match self.side {
            Side::Long => {
                ((exit_price / self.entry_price) - Decimal::ONE) * Decimal::from(100)
            }
            Side::Short => {
                (Decimal::ONE - (exit_price / self.entry_price)) * Decimal::from(100)
            }
        };
        let pnl = (exit_price - self.entry_price) * self.quantity
            * match self.side {
                Side::Long => Decimal::ONE,
                Side::Short => Decimal::NEGATIVE_ONE,
            };

        self.exit_time = Some(exit_time);
        self.exit_price = Some(exit_price);
        self.exit_reason = Some(exit_reason);
        self.pnl = Some(pnl);
        self.pnl_pct = Some(pnl_pct.to_string().parse().unwrap_or(0.0));
        self.duration_minutes = Some((exit_time - self.entry_time).num_minutes());
        self.status = TradeStatus::Closed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn close_computes_duration_and_pnl_for_long() {
        let mut row = TradeLedgerRow::open(
            Uuid::new_v4(),
            "BTCUSDT".into(),
            Side::Long,
            Decimal::from(100_000),
            Decimal::ONE,
            10,
        );
        let exit_time = row.entry_time + Duration::minutes(42);
        row.close(Decimal::from(100_400), ExitReason::TakeProfit, exit_time);
        assert_eq!(row.status, TradeStatus::Closed);
        assert_eq!(row.duration_minutes, Some(42));
        assert!(row.pnl_pct.unwrap() > 0.0);
    }

    #[test]
    fn close_computes_negative_pnl_for_short_losing_trade() {
        let mut row = TradeLedgerRow::open(
            Uuid::new_v4(),
            "BTCUSDT".into(),
            Side::Short,
            Decimal::from(50_000),
            Decimal::ONE,
            10,
        );
        let exit_time = row.entry_time + Duration::minutes(5);
        row.close(Decimal::from(50_500), ExitReason::StopLoss, exit_time);
        assert!(row.pnl_pct.unwrap() < 0.0);
    }
}
