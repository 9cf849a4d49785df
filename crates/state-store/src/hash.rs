//! Converts domain types to/from the tagged-string hash representation
//! persisted at `<prefix>:bot:<name>:state` / `:position`.

use crate::encoding::Value;
use perpbot_core::domain::{Position, Side, SignalKind};
use perpbot_core::BotRuntimeState;
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::str::FromStr;
use uuid::Uuid;

pub type StateHash = HashMap<String, String>;

fn get_str(hash: &StateHash, key: &str) -> Option<String> {
    hash.get(key).map(|raw| match Value::decode(raw) {
        Value::Str(s) => s,
        other => other.encode(),
    })
}

fn get_bool(hash: &StateHash, key: &str) -> bool {
    hash.get(key)
        .map(|raw| matches!(Value::decode(raw), Value::Bool(true)))
        .unwrap_or(false)
}

fn get_u64(hash: &StateHash, key: &str) -> u64 {
    hash.get(key)
        .and_then(|raw| match Value::decode(raw) {
            Value::Integer(n) => u64::try_from(n).ok(),
            _ => None,
        })
        .unwrap_or(0)
}

fn get_decimal(hash: &StateHash, key: &str) -> Option<Decimal> {
    get_str(hash, key).and_then(|s| Decimal::from_str(&s).ok())
}

fn get_datetime(hash: &StateHash, key: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    hash.get(key).and_then(|raw| match Value::decode(raw) {
        Value::DateTime(dt) => Some(dt),
        _ => None,
    })
}

#[must_use]
pub fn runtime_state_to_hash(state: &BotRuntimeState) -> StateHash {
    let mut hash = StateHash::new();
    hash.insert(
        "is_running".into(),
        Value::Bool(state.is_running).encode(),
    );
    hash.insert("is_paused".into(), Value::Bool(state.is_paused).encode());
    hash.insert(
        "emergency_close".into(),
        Value::Bool(state.emergency_close).encode(),
    );
    hash.insert(
        "uptime_start".into(),
        state
            .uptime_start
            .map_or_else(|| Value::Null, Value::DateTime)
            .encode(),
    );
    hash.insert(
        "loop_count".into(),
        Value::Integer(state.loop_count as i64).encode(),
    );
    hash.insert(
        "current_price".into(),
        state
            .current_price
            .map_or_else(|| Value::Null, |p| Value::Str(p.to_string()))
            .encode(),
    );
    hash.insert(
        "last_signal".into(),
        match state.last_signal {
            Some(SignalKind::Long) => Value::Str("LONG".into()),
            Some(SignalKind::Short) => Value::Str("SHORT".into()),
            Some(SignalKind::Wait) => Value::Str("WAIT".into()),
            None => Value::Null,
        }
        .encode(),
    );
    hash.insert(
        "last_signal_time".into(),
        state
            .last_signal_time
            .map_or_else(|| Value::Null, Value::DateTime)
            .encode(),
    );
    hash.insert(
        "last_updated".into(),
        Value::DateTime(chrono::Utc::now()).encode(),
    );
    hash
}

#[must_use]
pub fn hash_to_runtime_state(hash: &StateHash) -> BotRuntimeState {
    BotRuntimeState {
        is_running: get_bool(hash, "is_running"),
        is_paused: get_bool(hash, "is_paused"),
        emergency_close: get_bool(hash, "emergency_close"),
        uptime_start: get_datetime(hash, "uptime_start"),
        loop_count: get_u64(hash, "loop_count"),
        current_price: get_decimal(hash, "current_price"),
        last_signal: get_str(hash, "last_signal").and_then(|s| match s.as_str() {
            "LONG" => Some(SignalKind::Long),
            "SHORT" => Some(SignalKind::Short),
            "WAIT" => Some(SignalKind::Wait),
            _ => None,
        }),
        last_signal_time: get_datetime(hash, "last_signal_time"),
        position: None,
    }
}

#[must_use]
pub fn position_to_hash(position: &Position) -> StateHash {
    let mut hash = StateHash::new();
    hash.insert(
        "side".into(),
        Value::Str(match position.side {
            Side::Long => "LONG".into(),
            Side::Short => "SHORT".into(),
        })
        .encode(),
    );
    hash.insert(
        "entry_price".into(),
        Value::Str(position.entry_price.to_string()).encode(),
    );
    hash.insert(
        "quantity".into(),
        Value::Str(position.quantity.to_string()).encode(),
    );
    hash.insert(
        "entry_time".into(),
        Value::DateTime(position.entry_time).encode(),
    );
    hash.insert(
        "leverage".into(),
        Value::Integer(i64::from(position.leverage)).encode(),
    );
    hash.insert(
        "trade_id".into(),
        Value::Str(position.trade_id.to_string()).encode(),
    );
    hash.insert(
        "order_id".into(),
        Value::Str(position.order_id.clone()).encode(),
    );
    hash.insert(
        "last_updated".into(),
        Value::DateTime(chrono::Utc::now()).encode(),
    );
    hash
}

#[must_use]
pub fn hash_to_position(hash: &StateHash) -> Option<Position> {
    let side = match get_str(hash, "side")?.as_str() {
        "LONG" => Side::Long,
        "SHORT" => Side::Short,
        _ => return None,
    };
    Some(Position {
        side,
        entry_price: get_decimal(hash, "entry_price")?,
        quantity: get_decimal(hash, "quantity")?,
        entry_time: get_datetime(hash, "entry_time")?,
        leverage: u32::try_from(get_u64(hash, "leverage")).ok()?,
        trade_id: Uuid::parse_str(&get_str(hash, "trade_id")?).ok()?,
        order_id: get_str(hash, "order_id")?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_runtime_state_with_a_position_placeholder() {
        let mut state = BotRuntimeState::default();
        state.is_running = true;
        state.loop_count = 7;
        state.last_signal = Some(SignalKind::Long);
        state.last_signal_time = Some(chrono::Utc::now());

        let hash = runtime_state_to_hash(&state);
        let restored = hash_to_runtime_state(&hash);
        assert_eq!(restored.is_running, state.is_running);
        assert_eq!(restored.loop_count, state.loop_count);
        assert_eq!(restored.last_signal, state.last_signal);
    }

    #[test]
    fn round_trips_a_position() {
        let pos = Position {
            side: Side::Short,
            entry_price: Decimal::from(50_000),
            quantity: Decimal::ONE,
            entry_time: chrono::Utc::now(),
            leverage: 10,
            trade_id: Uuid::new_v4(),
            order_id: "ord-1".into(),
        };
        let hash = position_to_hash(&pos);
        let restored = hash_to_position(&hash).unwrap();
        assert_eq!(restored.side, pos.side);
        assert_eq!(restored.entry_price, pos.entry_price);
        assert_eq!(restored.trade_id, pos.trade_id);
    }
}
