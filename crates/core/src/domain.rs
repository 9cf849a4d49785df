use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

/// Direction a signal (or a position) points in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalKind {
    Long,
    Short,
    Wait,
}

impl SignalKind {
    /// Parses a provider/webhook-supplied string, case-insensitively.
    /// Anything unrecognized coerces to `Wait` — callers are expected to
    /// log that coercion themselves so it's visible in context.
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "LONG" => Self::Long,
            "SHORT" => Self::Short,
            _ => Self::Wait,
        }
    }
}

/// A position side. Distinct from `SignalKind::Wait`, which has no
/// corresponding side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Long,
    Short,
}

impl Side {
    #[must_use]
    pub const fn from_signal(kind: SignalKind) -> Option<Self> {
        match kind {
            SignalKind::Long => Some(Self::Long),
            SignalKind::Short => Some(Self::Short),
            SignalKind::Wait => None,
        }
    }

    /// Order side Binance/Hyperliquid-style terminology: a LONG entry
    /// buys, a SHORT entry sells; closing reverses it.
    #[must_use]
    pub const fn entry_order_side(self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Buy,
            Self::Short => OrderSide::Sell,
        }
    }

    #[must_use]
    pub const fn closing_order_side(self) -> OrderSide {
        match self {
            Self::Long => OrderSide::Sell,
            Self::Short => OrderSide::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

/// A pure value-type signal: just a direction. Individual signal
/// sources and the ensemble both ultimately reduce to one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signal {
    pub kind: SignalKind,
}

impl Signal {
    #[must_use]
    pub const fn new(kind: SignalKind) -> Self {
        Self { kind }
    }

    #[must_use]
    pub const fn wait() -> Self {
        Self {
            kind: SignalKind::Wait,
        }
    }
}

/// One ensemble voter's opinion, carrying enough to compute a weighted
/// vote and enough to explain itself in logs/prompts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndividualSignal {
    pub source: String,
    pub kind: SignalKind,
    pub confidence: f64,
    pub weight: f64,
    pub reason: String,
}

impl IndividualSignal {
    /// `LONG -> +weight*confidence`, `SHORT -> -weight*confidence`, `WAIT -> 0`.
    #[must_use]
    pub fn weighted_vote(&self) -> f64 {
        match self.kind {
            SignalKind::Long => self.weight * self.confidence,
            SignalKind::Short => -self.weight * self.confidence,
            SignalKind::Wait => 0.0,
        }
    }
}

/// The ensemble's final decision plus the voters that produced it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnsembleResult {
    pub final_signal: Signal,
    pub individual_signals: Vec<IndividualSignal>,
    pub consensus_ratio: f64,
    pub weighted_score: f64,
    pub metadata: HashMap<String, String>,
}

/// A single open position, at most one per bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub side: Side,
    pub entry_price: Decimal,
    pub quantity: Decimal,
    pub entry_time: DateTime<Utc>,
    pub leverage: u32,
    pub trade_id: Uuid,
    pub order_id: String,
}

impl Position {
    /// PnL percentage relative to entry, sign-adjusted for side.
    #[must_use]
    pub fn pnl_pct(&self, current_price: Decimal) -> f64 {
        if self.entry_price.is_zero() {
            return 0.0;
        }
        let raw = ((current_price / self.entry_price) - Decimal::ONE)
            .to_string()
            .parse::<f64>()
            .unwrap_or(0.0)
            * 100.0;
        match self.side {
            Side::Long => raw,
            Side::Short => -raw,
        }
    }

    #[must_use]
    pub fn held_minutes(&self, now: DateTime<Utc>) -> i64 {
        (now - self.entry_time).num_minutes()
    }
}

/// Per-bot mutable runtime state, owned exclusively by the `BotInstance`
/// that created it. Observable elsewhere only through a snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotRuntimeState {
    pub is_running: bool,
    pub is_paused: bool,
    pub emergency_close: bool,
    pub uptime_start: Option<DateTime<Utc>>,
    pub loop_count: u64,
    pub current_price: Option<Decimal>,
    pub last_signal: Option<SignalKind>,
    pub last_signal_time: Option<DateTime<Utc>>,
    pub position: Option<Position>,
}

impl Default for BotRuntimeState {
    fn default() -> Self {
        Self {
            is_running: false,
            is_paused: false,
            emergency_close: false,
            uptime_start: None,
            loop_count: 0,
            current_price: None,
            last_signal: None,
            last_signal_time: None,
            position: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn long_position_gains_on_price_increase() {
        let pos = Position {
            side: Side::Long,
            entry_price: Decimal::from(100_000),
            quantity: Decimal::ONE,
            entry_time: Utc::now(),
            leverage: 10,
            trade_id: Uuid::new_v4(),
            order_id: "o1".into(),
        };
        let pnl = pos.pnl_pct(Decimal::from(100_400));
        assert!((pnl - 0.4).abs() < 1e-6);
    }

    #[test]
    fn short_position_gains_on_price_decrease() {
        let pos = Position {
            side: Side::Short,
            entry_price: Decimal::from(50_000),
            quantity: Decimal::ONE,
            entry_time: Utc::now(),
            leverage: 10,
            trade_id: Uuid::new_v4(),
            order_id: "o1".into(),
        };
        let pnl = pos.pnl_pct(Decimal::from(49_500));
        assert!(pnl > 0.0);
    }

    #[test]
    fn unrecognized_signal_string_coerces_to_wait() {
        assert_eq!(SignalKind::parse_lenient("banana"), SignalKind::Wait);
        assert_eq!(SignalKind::parse_lenient("long"), SignalKind::Long);
    }
}
