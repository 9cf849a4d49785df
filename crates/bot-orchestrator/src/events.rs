use perpbot_core::domain::{EnsembleResult, Side};
use perpbot_core::ExitReason;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Fired once per tick when a position is opened or closed, passed to
/// whichever `onTrade` callback the manager has registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TradeEvent {
    Open {
        trade_id: Uuid,
        side: Side,
        entry_price: Decimal,
        quantity: Decimal,
    },
    Close {
        trade_id: Uuid,
        reason: ExitReason,
        exit_price: Decimal,
        pnl_pct: f64,
    },
}

pub type SignalCallback = Arc<dyn Fn(&str, &EnsembleResult) + Send + Sync>;
pub type TradeCallback = Arc<dyn Fn(&str, &TradeEvent) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&str, &str) + Send + Sync>;

/// A shared, swappable set of observer callbacks. `BotManager` owns one
/// `Arc<RwLock<Callbacks>>` and hands a clone of the `Arc` to every
/// `BotInstance` it spawns, so `setOnXCallback` takes effect for
/// existing and future bots alike without a per-bot round trip.
#[derive(Default, Clone)]
pub struct Callbacks {
    pub on_signal: Option<SignalCallback>,
    pub on_trade: Option<TradeCallback>,
    pub on_error: Option<ErrorCallback>,
}

impl Callbacks {
    pub fn fire_signal(&self, bot_name: &str, result: &EnsembleResult) {
        if let Some(f) = &self.on_signal {
            f(bot_name, result);
        }
    }

    pub fn fire_trade(&self, bot_name: &str, event: &TradeEvent) {
        if let Some(f) = &self.on_trade {
            f(bot_name, event);
        }
    }

    pub fn fire_error(&self, bot_name: &str, message: &str) {
        if let Some(f) = &self.on_error {
            f(bot_name, message);
        }
    }
}
