use crate::analytics::{HourStats, OverallStats, StreakInfo, StreakKind, ZoneStats};
use crate::store::LedgerStore;
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use perpbot_core::TradeLedgerRow;
use uuid::Uuid;

/// Used when the ledger connection is unreachable at startup (§7 "fatal
/// init: ledger unreachable — trading continues without history"). All
/// writes succeed silently (they're dropped) and all reads come back
/// empty, which makes the memory builder behave as if AI has no memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyLedgerStore;

#[async_trait]
impl LedgerStore for DummyLedgerStore {
    async fn open_trade(&self, _row: &TradeLedgerRow) -> Result<()> {
        Ok(())
    }

    async fn close_trade(&self, _row: &TradeLedgerRow) -> Result<()> {
        Ok(())
    }

    async fn overall_stats(&self, _bot_id: Uuid, _since: DateTime<Utc>) -> Result<OverallStats> {
        Ok(OverallStats::default())
    }

    async fn rsi_zone_stats(&self, _bot_id: Uuid, _since: DateTime<Utc>) -> Result<Vec<ZoneStats>> {
        Ok(Vec::new())
    }

    async fn hourly_stats(&self, _bot_id: Uuid, _since: DateTime<Utc>) -> Result<Vec<HourStats>> {
        Ok(Vec::new())
    }

    async fn recent_closed(&self, _bot_id: Uuid, _limit: i64) -> Result<Vec<TradeLedgerRow>> {
        Ok(Vec::new())
    }

    async fn current_streak(&self, _bot_id: Uuid) -> Result<StreakInfo> {
        Ok(StreakInfo {
            kind: StreakKind::None,
            count: 0,
        })
    }

    async fn ping(&self) -> bool {
        false
    }
}
