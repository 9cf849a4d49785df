use crate::analytics::{HourStats, OverallStats, StreakInfo, ZoneStats};
use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use perpbot_core::TradeLedgerRow;
use uuid::Uuid;

/// The trade-history ledger contract: write paths for open/close, and
/// the query shapes the memory builder needs. Implementations are free
/// to be backed by Postgres, SQLite, or nothing at all (see
/// `DummyLedgerStore`); the ensemble only ever talks to this trait.
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Inserts a new OPEN row.
    ///
    /// # Errors
    /// Returns an error if the write fails. Per §7, a write failure at
    /// entry does not undo the exchange-side fill; the caller retries
    /// at the next tick boundary on a best-effort basis.
    async fn open_trade(&self, row: &TradeLedgerRow) -> Result<()>;

    /// Updates exactly one OPEN row to CLOSED. `row` must already carry
    /// the close fields (see `TradeLedgerRow::close`).
    ///
    /// # Errors
    /// Returns an error if the write fails or no matching OPEN row exists.
    async fn close_trade(&self, row: &TradeLedgerRow) -> Result<()>;

    /// # Errors
    /// Returns an error if the query fails.
    async fn overall_stats(&self, bot_id: Uuid, since: DateTime<Utc>) -> Result<OverallStats>;

    /// # Errors
    /// Returns an error if the query fails.
    async fn rsi_zone_stats(&self, bot_id: Uuid, since: DateTime<Utc>) -> Result<Vec<ZoneStats>>;

    /// # Errors
    /// Returns an error if the query fails.
    async fn hourly_stats(&self, bot_id: Uuid, since: DateTime<Utc>) -> Result<Vec<HourStats>>;

    /// # Errors
    /// Returns an error if the query fails.
    async fn recent_closed(&self, bot_id: Uuid, limit: i64) -> Result<Vec<TradeLedgerRow>>;

    /// # Errors
    /// Returns an error if the query fails.
    async fn current_streak(&self, bot_id: Uuid) -> Result<StreakInfo>;

    async fn ping(&self) -> bool;
}
