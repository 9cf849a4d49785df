use crate::analytics::StreakKind;
use crate::store::LedgerStore;
use chrono::{Duration, Utc};
use perpbot_core::MemoryContext;
use uuid::Uuid;

const BEST_WIN_RATE: f64 = 0.70;
const WORST_WIN_RATE: f64 = 0.40;
const ZONE_MIN_N: i64 = 5;
const HOUR_BEST_WIN_RATE: f64 = 0.75;
const HOUR_WORST_WIN_RATE: f64 = 0.35;
const HOUR_MIN_N: i64 = 3;
const RECENT_TRADE_LIMIT: i64 = 10;

/// Queries the ledger-analytics surface and produces a `MemoryContext`
/// ready to splice into the AI prompt. On any analytics error, returns
/// an empty context rather than propagating — the ensemble then
/// behaves as if AI has no memory (§4.4).
pub struct MemoryContextBuilder<'a> {
    ledger: &'a dyn LedgerStore,
    lookback_days: i64,
}

impl<'a> MemoryContextBuilder<'a> {
    #[must_use]
    pub const fn new(ledger: &'a dyn LedgerStore) -> Self {
        Self {
            ledger,
            lookback_days: 7,
        }
    }

    #[must_use]
    pub const fn with_lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = days;
        self
    }

    pub async fn build(&self, bot_id: Uuid) -> MemoryContext {
        match self.try_build(bot_id).await {
            Ok(ctx) => ctx,
            Err(err) => {
                tracing::warn!(bot_id = %bot_id, error = %err, "memory context build failed, using empty context");
                MemoryContext::default()
            }
        }
    }

    async fn try_build(&self, bot_id: Uuid) -> anyhow::Result<MemoryContext> {
        let since = Utc::now() - Duration::days(self.lookback_days);

        let overall = self.ledger.overall_stats(bot_id, since).await?;
        if overall.total_trades == 0 {
            return Ok(MemoryContext::default());
        }

        let zones = self.ledger.rsi_zone_stats(bot_id, since).await?;
        let hours = self.ledger.hourly_stats(bot_id, since).await?;
        let recent = self.ledger.recent_closed(bot_id, RECENT_TRADE_LIMIT).await?;
        let streak = self.ledger.current_streak(bot_id).await?;

        let overall_summary = format!(
            "{} closed trades in the last {} days, {:.0}% win rate, total PnL {}",
            overall.total_trades, self.lookback_days, overall.win_rate * 100.0, overall.total_pnl
        );

        let recent_performance = if recent.is_empty() {
            "no recent trades".to_string()
        } else {
            let recent_wins = recent
                .iter()
                .filter(|t| t.pnl_pct.unwrap_or(0.0) > 0.0)
                .count();
            format!(
                "last {} trades: {} wins, {} losses, avg PnL {:.2}%",
                recent.len(),
                recent_wins,
                recent.len() - recent_wins,
                overall.avg_pnl_pct
            )
        };

        let best_zone = zones
            .iter()
            .filter(|z| z.n >= ZONE_MIN_N && z.win_rate >= BEST_WIN_RATE)
            .max_by(|a, b| a.win_rate.partial_cmp(&b.win_rate).unwrap());
        let worst_zone = zones
            .iter()
            .filter(|z| z.n >= ZONE_MIN_N && z.win_rate <= WORST_WIN_RATE)
            .min_by(|a, b| a.win_rate.partial_cmp(&b.win_rate).unwrap());

        let best_hour = hours
            .iter()
            .filter(|h| h.n >= HOUR_MIN_N && h.win_rate >= HOUR_BEST_WIN_RATE)
            .max_by(|a, b| a.win_rate.partial_cmp(&b.win_rate).unwrap());
        let worst_hour = hours
            .iter()
            .filter(|h| h.n >= HOUR_MIN_N && h.win_rate <= HOUR_WORST_WIN_RATE)
            .min_by(|a, b| a.win_rate.partial_cmp(&b.win_rate).unwrap());

        let best_conditions = match (best_zone, best_hour) {
            (Some(z), Some(h)) => format!(
                "RSI zone '{}' wins {:.0}% (n={}); hour {}:00 UTC wins {:.0}% (n={})",
                z.zone, z.win_rate * 100.0, z.n, h.hour, h.win_rate * 100.0, h.n
            ),
            (Some(z), None) => format!(
                "RSI zone '{}' wins {:.0}% of the time (n={})",
                z.zone, z.win_rate * 100.0, z.n
            ),
            (None, Some(h)) => format!(
                "hour {}:00 UTC wins {:.0}% of the time (n={})",
                h.hour, h.win_rate * 100.0, h.n
            ),
            (None, None) => "no conditions stand out as clearly favorable yet".to_string(),
        };

        let worst_conditions = match (worst_zone, worst_hour) {
            (Some(z), Some(h)) => format!(
                "RSI zone '{}' only wins {:.0}% (n={}); hour {}:00 UTC only wins {:.0}% (n={})",
                z.zone, z.win_rate * 100.0, z.n, h.hour, h.win_rate * 100.0, h.n
            ),
            (Some(z), None) => format!(
                "RSI zone '{}' only wins {:.0}% of the time (n={})",
                z.zone, z.win_rate * 100.0, z.n
            ),
            (None, Some(h)) => format!(
                "hour {}:00 UTC only wins {:.0}% of the time (n={})",
                h.hour, h.win_rate * 100.0, h.n
            ),
            (None, None) => "no conditions stand out as clearly unfavorable yet".to_string(),
        };

        let timing_insights = match streak.kind {
            StreakKind::Win if streak.count >= 2 => {
                format!("currently on a {}-trade winning streak", streak.count)
            }
            StreakKind::Loss if streak.count >= 2 => {
                format!("currently on a {}-trade losing streak, consider reduced size", streak.count)
            }
            _ => "no notable streak right now".to_string(),
        };

        let recommendations = if overall.win_rate < WORST_WIN_RATE {
            "overall win rate is low; favor WAIT unless conviction is high".to_string()
        } else if overall.win_rate > BEST_WIN_RATE {
            "overall win rate is strong; current approach is working".to_string()
        } else {
            "overall performance is middling; no strong bias either way".to_string()
        };

        Ok(MemoryContext {
            overall_summary,
            recent_performance,
            best_conditions,
            worst_conditions,
            timing_insights,
            recommendations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dummy_store::DummyLedgerStore;

    #[tokio::test]
    async fn no_closed_trades_yields_empty_context() {
        let ledger = DummyLedgerStore;
        let builder = MemoryContextBuilder::new(&ledger);
        let ctx = builder.build(Uuid::new_v4()).await;
        assert!(ctx.is_empty());
    }
}
