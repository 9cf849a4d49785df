use crate::analytics::{HourStats, OverallStats, StreakInfo, StreakKind, ZoneStats};
use crate::store::LedgerStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use perpbot_core::domain::Side;
use perpbot_core::{rsi_zone, ExitReason, TradeLedgerRow, TradeStatus};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashMap;
use uuid::Uuid;

/// Flat row shape matching the `trades` table; `TradeLedgerRow`'s
/// nested enums don't map directly onto `sqlx::FromRow`, so this is the
/// wire shape and `TradeLedgerRow` is the domain shape.
#[derive(Debug, FromRow)]
struct TradeRow {
    id: Uuid,
    bot_id: Uuid,
    symbol: String,
    side: String,
    entry_time: DateTime<Utc>,
    entry_price: Decimal,
    quantity: Decimal,
    leverage: i32,
    status: String,
    exit_time: Option<DateTime<Utc>>,
    exit_price: Option<Decimal>,
    exit_reason: Option<String>,
    pnl: Option<Decimal>,
    pnl_pct: Option<f64>,
    duration_minutes: Option<i64>,
    entry_rsi: Option<f64>,
}

impl TryFrom<TradeRow> for TradeLedgerRow {
    type Error = anyhow::Error;

    fn try_from(r: TradeRow) -> Result<Self> {
        let side = match r.side.as_str() {
            "LONG" => Side::Long,
            "SHORT" => Side::Short,
            other => anyhow::bail!("unknown side in ledger row: {other}"),
        };
        let status = match r.status.as_str() {
            "OPEN" => TradeStatus::Open,
            "CLOSED" => TradeStatus::Closed,
            other => anyhow::bail!("unknown status in ledger row: {other}"),
        };
        let exit_reason = match r.exit_reason.as_deref() {
            Some("TP") => Some(ExitReason::TakeProfit),
            Some("SL") => Some(ExitReason::StopLoss),
            Some("TIME_CUT") => Some(ExitReason::TimeCut),
            Some("MANUAL") => Some(ExitReason::Manual),
            Some("END") => Some(ExitReason::End),
            Some(other) => anyhow::bail!("unknown exit reason in ledger row: {other}"),
            None => None,
        };
        Ok(Self {
            id: r.id,
            bot_id: r.bot_id,
            symbol: r.symbol,
            side,
            entry_time: r.entry_time,
            entry_price: r.entry_price,
            quantity: r.quantity,
            leverage: u32::try_from(r.leverage).unwrap_or(1),
            status,
            exit_time: r.exit_time,
            exit_price: r.exit_price,
            exit_reason,
            pnl: r.pnl,
            pnl_pct: r.pnl_pct,
            duration_minutes: r.duration_minutes,
            entry_rsi: r.entry_rsi,
        })
    }
}

/// Postgres-backed ledger. The `trades` table is expected to exist
/// (created by the process's migration set, out of scope here); this
/// store only issues the query shapes §4.6 names.
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn open_trade(&self, row: &TradeLedgerRow) -> Result<()> {
        let side = match row.side {
            Side::Long => "LONG",
            Side::Short => "SHORT",
        };
        sqlx::query(
            r"
            INSERT INTO trades
                (id, bot_id, symbol, side, entry_time, entry_price, quantity, leverage, status, entry_rsi)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'OPEN', $9)
            ",
        )
        .bind(row.id)
        .bind(row.bot_id)
        .bind(&row.symbol)
        .bind(side)
        .bind(row.entry_time)
        .bind(row.entry_price)
        .bind(row.quantity)
        .bind(i32::try_from(row.leverage).unwrap_or(1))
        .bind(row.entry_rsi)
        .execute(&self.pool)
        .await
        .context("failed to insert open ledger row")?;
        Ok(())
    }

    async fn close_trade(&self, row: &TradeLedgerRow) -> Result<()> {
        let exit_reason = row.exit_reason.map(ExitReason::as_str);
        let result = sqlx::query(
            r"
            UPDATE trades
            SET exit_time = $2, exit_price = $3, exit_reason = $4,
                pnl = $5, pnl_pct = $6, duration_minutes = $7, status = 'CLOSED'
            WHERE id = $1 AND status = 'OPEN'
            ",
        )
        .bind(row.id)
        .bind(row.exit_time)
        .bind(row.exit_price)
        .bind(exit_reason)
        .bind(row.pnl)
        .bind(row.pnl_pct)
        .bind(row.duration_minutes)
        .execute(&self.pool)
        .await
        .context("failed to close ledger row")?;

        if result.rows_affected() == 0 {
            anyhow::bail!("no OPEN ledger row found for id {}", row.id);
        }
        Ok(())
    }

    async fn overall_stats(&self, bot_id: Uuid, since: DateTime<Utc>) -> Result<OverallStats> {
        let rows: Vec<(Option<Decimal>, Option<f64>)> = sqlx::query_as(
            r"
            SELECT pnl, pnl_pct FROM trades
            WHERE bot_id = $1 AND status = 'CLOSED' AND entry_time >= $2
            ",
        )
        .bind(bot_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("failed to query overall stats")?;

        let total_trades = rows.len() as i64;
        let wins = rows
            .iter()
            .filter(|(_, pct)| pct.unwrap_or(0.0) > 0.0)
            .count() as i64;
        let losses = total_trades - wins;
        let win_rate = if total_trades > 0 {
            wins as f64 / total_trades as f64
        } else {
            0.0
        };
        let total_pnl = rows
            .iter()
            .filter_map(|(pnl, _)| *pnl)
            .fold(Decimal::ZERO, |acc, v| acc + v);
        let pcts: Vec<f64> = rows.iter().filter_map(|(_, pct)| *pct).collect();
        let avg_pnl_pct = if pcts.is_empty() {
            0.0
        } else {
            pcts.iter().sum::<f64>() / pcts.len() as f64
        };
        let best_pnl_pct = pcts.iter().copied().fold(None, |acc, v| {
            Some(acc.map_or(v, |a: f64| a.max(v)))
        });
        let worst_pnl_pct = pcts.iter().copied().fold(None, |acc, v| {
            Some(acc.map_or(v, |a: f64| a.min(v)))
        });

        Ok(OverallStats {
            total_trades,
            wins,
            losses,
            win_rate,
            total_pnl,
            avg_pnl_pct,
            best_pnl_pct,
            worst_pnl_pct,
        })
    }

    async fn rsi_zone_stats(&self, bot_id: Uuid, since: DateTime<Utc>) -> Result<Vec<ZoneStats>> {
        let rows: Vec<(Option<f64>, Option<f64>)> = sqlx::query_as(
            r"
            SELECT entry_rsi, pnl_pct FROM trades
            WHERE bot_id = $1 AND status = 'CLOSED' AND entry_time >= $2 AND entry_rsi IS NOT NULL
            ",
        )
        .bind(bot_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("failed to query rsi zone stats")?;

        let mut by_zone: HashMap<&'static str, (i64, i64)> = HashMap::new();
        for (rsi, pct) in rows {
            let Some(rsi) = rsi else { continue };
            let zone = rsi_zone(rsi);
            let entry = by_zone.entry(zone).or_insert((0, 0));
            entry.0 += 1;
            if pct.unwrap_or(0.0) > 0.0 {
                entry.1 += 1;
            }
        }

        Ok(by_zone
            .into_iter()
            .map(|(zone, (n, wins))| ZoneStats {
                zone: zone.to_string(),
                n,
                win_rate: if n > 0 { wins as f64 / n as f64 } else { 0.0 },
            })
            .collect())
    }

    async fn hourly_stats(&self, bot_id: Uuid, since: DateTime<Utc>) -> Result<Vec<HourStats>> {
        let rows: Vec<(i32, i64, f64)> = sqlx::query_as(
            r"
            SELECT EXTRACT(HOUR FROM entry_time)::int AS hour,
                   COUNT(*)::bigint AS n,
                   (COUNT(*) FILTER (WHERE pnl_pct > 0))::float8 / COUNT(*)::float8 AS win_rate
            FROM trades
            WHERE bot_id = $1 AND status = 'CLOSED' AND entry_time >= $2
            GROUP BY hour
            ",
        )
        .bind(bot_id)
        .bind(since)
        .fetch_all(&self.pool)
        .await
        .context("failed to query hourly stats")?;

        Ok(rows
            .into_iter()
            .map(|(hour, n, win_rate)| HourStats {
                hour: u32::try_from(hour).unwrap_or(0),
                n,
                win_rate,
            })
            .collect())
    }

    async fn recent_closed(&self, bot_id: Uuid, limit: i64) -> Result<Vec<TradeLedgerRow>> {
        let rows: Vec<TradeRow> = sqlx::query_as(
            r"
            SELECT id, bot_id, symbol, side, entry_time, entry_price, quantity, leverage,
                   status, exit_time, exit_price, exit_reason, pnl, pnl_pct, duration_minutes, entry_rsi
            FROM trades
            WHERE bot_id = $1 AND status = 'CLOSED'
            ORDER BY exit_time DESC
            LIMIT $2
            ",
        )
        .bind(bot_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .context("failed to query recent closed trades")?;

        rows.into_iter().map(TryInto::try_into).collect()
    }

    async fn current_streak(&self, bot_id: Uuid) -> Result<StreakInfo> {
        let rows: Vec<(Option<f64>,)> = sqlx::query_as(
            r"
            SELECT pnl_pct FROM trades
            WHERE bot_id = $1 AND status = 'CLOSED'
            ORDER BY exit_time DESC
            LIMIT 50
            ",
        )
        .bind(bot_id)
        .fetch_all(&self.pool)
        .await
        .context("failed to query streak")?;

        let Some((first,)) = rows.first() else {
            return Ok(StreakInfo {
                kind: StreakKind::None,
                count: 0,
            });
        };
        let first_is_win = first.unwrap_or(0.0) > 0.0;
        let count = rows
            .iter()
            .take_while(|(pct,)| (pct.unwrap_or(0.0) > 0.0) == first_is_win)
            .count() as i64;

        Ok(StreakInfo {
            kind: if first_is_win {
                StreakKind::Win
            } else {
                StreakKind::Loss
            },
            count,
        })
    }

    async fn ping(&self) -> bool {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await.is_ok()
    }
}
