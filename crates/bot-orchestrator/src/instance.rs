//! The per-bot decision loop. A `BotInstance` owns exactly one
//! `BotRuntimeState`, talks to the exchange/ledger/state-store through
//! trait objects, and is driven by two independent clocks: an interval
//! timer (the trading tick) and a command mailbox (lifecycle control).
//! Both are serviced from the same `tokio::select!`, so a tick never
//! runs concurrently with a command and a command is never delayed
//! past the current tick's completion.

use crate::commands::BotCommand;
use crate::events::{Callbacks, TradeEvent};
use crate::handle::BotHandle;
use crate::sizing;
use crate::status::BotStatusSnapshot;
use chrono::Utc;
use perpbot_core::config_loader::ProcessConfig;
use perpbot_core::domain::{EnsembleResult, IndividualSignal, Position, Side};
use perpbot_core::symbol::quantity_precision;
use perpbot_core::{BotConfig, BotRuntimeState, ExitReason, TradeLedgerRow, TradeStatus};
use perpbot_exchange::{Exchange, ExchangePosition};
use perpbot_ledger::LedgerStore;
use perpbot_signals::{AiProvider, AiSignal, MarketIndicators, RuleSignal, SignalEnsemble, SignalGenerator};
use perpbot_state_store::StateStore;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::{Arc, RwLock as StdRwLock};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use uuid::Uuid;

pub struct BotInstance {
    config: BotConfig,
    process: Arc<ProcessConfig>,
    exchange: Arc<dyn Exchange>,
    ledger: Arc<dyn LedgerStore>,
    state_store: Arc<dyn StateStore>,
    ai_provider: Option<Arc<dyn AiProvider>>,
    callbacks: Arc<StdRwLock<Callbacks>>,
    rx: mpsc::Receiver<BotCommand>,
    status_tx: watch::Sender<BotStatusSnapshot>,
    runtime: BotRuntimeState,
    status: BotStatusSnapshot,
    last_error: Option<String>,
    external_signal: Option<IndividualSignal>,
}

impl BotInstance {
    /// Builds a new instance/handle pair. The instance is not yet
    /// running — call `run` on a spawned task, then `BotHandle::start`
    /// to begin ticking.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: BotConfig,
        process: Arc<ProcessConfig>,
        exchange: Arc<dyn Exchange>,
        ledger: Arc<dyn LedgerStore>,
        state_store: Arc<dyn StateStore>,
        ai_provider: Option<Arc<dyn AiProvider>>,
        callbacks: Arc<StdRwLock<Callbacks>>,
    ) -> (Self, BotHandle) {
        let (tx, rx) = mpsc::channel(32);
        let status = BotStatusSnapshot::initial(config.bot_id, config.bot_name.clone(), config.symbol.clone());
        let (status_tx, status_rx) = watch::channel(status.clone());
        let handle = BotHandle::new(tx, status_rx);
        let instance = Self {
            config,
            process,
            exchange,
            ledger,
            state_store,
            ai_provider,
            callbacks,
            rx,
            status_tx,
            runtime: BotRuntimeState::default(),
            status,
            last_error: None,
            external_signal: None,
        };
        (instance, handle)
    }

    /// Runs until a `Shutdown` command arrives or the mailbox closes.
    /// Intended to be handed to `tokio::spawn`.
    pub async fn run(mut self) {
        self.restore().await;
        self.state_store.register_bot(&self.config.bot_name).await;
        self.publish_status();

        let interval_secs = self.process.loop_interval_secs.max(1);
        let mut ticker = tokio::time::interval(Duration::from_secs(interval_secs));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                cmd = self.rx.recv() => {
                    match cmd {
                        Some(BotCommand::Start) => {
                            if !self.runtime.is_running {
                                self.runtime.is_running = true;
                                self.runtime.uptime_start = Some(Utc::now());
                                ticker.reset_immediately();
                                self.state_store.set_bot_running(&self.config.bot_name).await;
                            }
                        }
                        Some(BotCommand::Stop(ack)) => {
                            self.runtime.is_running = false;
                            self.state_store.set_bot_stopped(&self.config.bot_name).await;
                            let _ = ack.send(());
                        }
                        Some(BotCommand::Pause) => self.runtime.is_paused = true,
                        Some(BotCommand::Resume) => self.runtime.is_paused = false,
                        Some(BotCommand::EmergencyClose) => self.runtime.emergency_close = true,
                        Some(BotCommand::UpdateConfig(cfg)) => {
                            self.status.symbol = cfg.symbol.clone();
                            self.config = *cfg;
                        }
                        Some(BotCommand::ExternalSignal(signal)) => {
                            self.external_signal = Some(signal);
                        }
                        Some(BotCommand::Shutdown(ack)) => {
                            self.teardown().await;
                            self.publish_status();
                            let _ = ack.send(());
                            return;
                        }
                        None => {
                            self.teardown().await;
                            return;
                        }
                    }
                    self.publish_status();
                }
                _ = ticker.tick(), if self.runtime.is_running => {
                    self.run_tick().await;
                    self.publish_status();
                }
            }
        }
    }

    async fn restore(&mut self) {
        if let Some(state) = self.state_store.load_bot_state(&self.config.bot_name).await {
            self.runtime = state;
            // A restored process never silently resumes live trading;
            // `Start` must be issued explicitly again.
            self.runtime.is_running = false;
        }
        if let Some(position) = self.state_store.load_position(&self.config.bot_name).await {
            self.runtime.position = Some(position);
        }
    }

    async fn teardown(&mut self) {
        self.runtime.is_running = false;
        self.state_store.set_bot_stopped(&self.config.bot_name).await;
        self.state_store.unregister_bot(&self.config.bot_name).await;
    }

    fn publish_status(&mut self) {
        self.status.refresh(&self.runtime, self.last_error.clone());
        let _ = self.status_tx.send(self.status.clone());
    }

    fn callbacks_snapshot(&self) -> Callbacks {
        self.callbacks.read().map(|cb| cb.clone()).unwrap_or_default()
    }

    async fn run_tick(&mut self) {
        self.runtime.loop_count += 1;
        match self.try_tick().await {
            Ok(()) => self.last_error = None,
            Err(err) => {
                tracing::error!(bot_name = %self.config.bot_name, error = %err, "tick failed");
                let message = err.to_string();
                self.callbacks_snapshot().fire_error(&self.config.bot_name, &message);
                self.last_error = Some(message);
            }
        }
    }

    /// One full pass of §4.2's decision loop: snapshot, signal, the
    /// one-shot emergency-close branch, reconcile-then-exit-check, the
    /// entry gate, and a final persist.
    async fn try_tick(&mut self) -> anyhow::Result<()> {
        let symbol = self.config.symbol.clone();

        let price = self.exchange.get_current_price(&symbol).await?;
        let candles = self.exchange.get_klines(&symbol, "5m", 24).await?;
        let change_24h_pct = self.exchange.get_ticker_24h(&symbol).await.ok().map_or(0.0, |t| t.change_pct);
        let indicators = MarketIndicators::compute(price.to_f64().unwrap_or(0.0), &candles, change_24h_pct);
        self.runtime.current_price = Some(price);

        let ensemble = self.generate_signal(&symbol, &indicators).await;
        self.runtime.last_signal = Some(ensemble.final_signal.kind);
        self.runtime.last_signal_time = Some(Utc::now());
        let cb = self.callbacks_snapshot();
        cb.fire_signal(&self.config.bot_name, &ensemble);

        if self.runtime.emergency_close {
            self.runtime.emergency_close = false;
            if self.runtime.position.is_some() {
                self.close_position(ExitReason::Manual, price, &cb).await?;
            }
            self.runtime.is_paused = true;
            self.persist().await;
            return Ok(());
        }

        let exchange_position = self.exchange.get_position(&symbol).await?;
        self.reconcile_position(exchange_position);
        if let Some(position) = self.runtime.position.clone() {
            if let Some(reason) = check_exit(&position, &self.config, price, Utc::now()) {
                self.close_position(reason, price, &cb).await?;
            }
        }

        if self.runtime.position.is_none() && !self.runtime.is_paused {
            if let Some(side) = Side::from_signal(ensemble.final_signal.kind) {
                self.open_position(side, price, indicators.rsi_14, &cb).await?;
            }
        }

        self.persist().await;
        Ok(())
    }

    async fn generate_signal(&mut self, symbol: &str, indicators: &MarketIndicators) -> EnsembleResult {
        let rule = RuleSignal::new(
            self.config.effective_rsi_oversold(),
            self.config.effective_rsi_overbought(),
            self.config.effective_volume_threshold(),
        );
        let result = match &self.ai_provider {
            Some(provider) => {
                let ai_signal = AiSignal::new(provider.as_ref(), self.process.ai.model.clone());
                let generator = SignalGenerator::new(rule).with_ai(ai_signal);
                generator
                    .generate(symbol, self.config.bot_id, self.ledger.as_ref(), indicators)
                    .await
            }
            None => SignalGenerator::new(rule).generate_rule_only(indicators),
        };

        // A webhook-sourced signal (§6.3) is folded in as one more
        // voter and consumed, never carried past this tick.
        match self.external_signal.take() {
            Some(external) => {
                let mut signals = result.individual_signals;
                signals.push(external);
                SignalEnsemble::default().combine(signals)
            }
            None => result,
        }
    }

    /// Adopts the exchange's view of the position as canonical: a
    /// local position the exchange no longer reports is cleared; a
    /// position the exchange reports that we have no local record of
    /// is adopted defensively, with a fresh trade id that cannot be
    /// correlated back to a ledger row.
    fn reconcile_position(&mut self, exchange_position: Option<ExchangePosition>) {
        self.runtime.position = match (exchange_position, self.runtime.position.take()) {
            (None, _) => None,
            (Some(ep), Some(local)) => Some(Position {
                side: ep.side,
                entry_price: ep.entry_price,
                quantity: ep.amount,
                entry_time: local.entry_time,
                leverage: ep.leverage,
                trade_id: local.trade_id,
                order_id: local.order_id,
            }),
            (Some(ep), None) => {
                tracing::warn!(
                    bot_name = %self.config.bot_name,
                    "exchange reports a position with no local record; adopting without a ledger correlation"
                );
                Some(Position {
                    side: ep.side,
                    entry_price: ep.entry_price,
                    quantity: ep.amount,
                    entry_time: Utc::now(),
                    leverage: ep.leverage,
                    trade_id: Uuid::new_v4(),
                    order_id: String::new(),
                })
            }
        };
    }

    async fn resolve_notional_capital(&self) -> Decimal {
        if self.process.exchange.use_real_balance {
            match self.exchange.get_account_balance().await {
                Ok(balance) => return balance.available,
                Err(err) => {
                    tracing::warn!(
                        bot_name = %self.config.bot_name,
                        error = %err,
                        "failed to fetch live balance, falling back to fixed notional capital"
                    );
                }
            }
        }
        self.process.exchange.fixed_notional_capital
    }

    async fn open_position(
        &mut self,
        side: Side,
        price: Decimal,
        entry_rsi: f64,
        cb: &Callbacks,
    ) -> anyhow::Result<()> {
        let notional = self.resolve_notional_capital().await;
        let leverage = self.config.effective_leverage();
        let precision = quantity_precision(&self.config.symbol);
        let quantity = sizing::position_quantity(
            notional,
            self.config.effective_position_size_pct(),
            leverage,
            price,
            precision,
        );
        if quantity <= Decimal::ZERO {
            tracing::warn!(bot_name = %self.config.bot_name, "computed zero order quantity, skipping entry");
            return Ok(());
        }

        self.exchange.set_leverage(&self.config.symbol, leverage).await?;
        let order = self
            .exchange
            .create_market_order(&self.config.symbol, side.entry_order_side(), quantity)
            .await?;

        let row = TradeLedgerRow::open(
            self.config.bot_id,
            self.config.symbol.clone(),
            side,
            price,
            order.filled_qty,
            leverage,
        )
        .with_entry_rsi(entry_rsi);
        if let Err(err) = self.ledger.open_trade(&row).await {
            tracing::error!(
                bot_name = %self.config.bot_name,
                trade_id = %row.id,
                error = %err,
                "ledger open-trade write failed; the exchange fill stands regardless"
            );
        }

        self.runtime.position = Some(Position {
            side,
            entry_price: price,
            quantity: order.filled_qty,
            entry_time: Utc::now(),
            leverage,
            trade_id: row.id,
            order_id: order.order_id.clone(),
        });

        cb.fire_trade(
            &self.config.bot_name,
            &TradeEvent::Open {
                trade_id: row.id,
                side,
                entry_price: price,
                quantity: order.filled_qty,
            },
        );
        Ok(())
    }

    async fn close_position(&mut self, reason: ExitReason, current_price: Decimal, cb: &Callbacks) -> anyhow::Result<()> {
        let Some(position) = self.runtime.position.take() else {
            return Ok(());
        };
        self.exchange.close_position(&self.config.symbol).await?;

        let mut row = TradeLedgerRow {
            id: position.trade_id,
            bot_id: self.config.bot_id,
            symbol: self.config.symbol.clone(),
            side: position.side,
            entry_time: position.entry_time,
            entry_price: position.entry_price,
            quantity: position.quantity,
            leverage: position.leverage,
            status: TradeStatus::Open,
            exit_time: None,
            exit_price: None,
            exit_reason: None,
            pnl: None,
            pnl_pct: None,
            duration_minutes: None,
            entry_rsi: None,
        };
        row.close(current_price, reason, Utc::now());
        if let Err(err) = self.ledger.close_trade(&row).await {
            tracing::error!(
                bot_name = %self.config.bot_name,
                trade_id = %position.trade_id,
                error = %err,
                "ledger close-trade write failed; the position is flat on the exchange regardless"
            );
        }

        self.state_store.delete_position(&self.config.bot_name).await;

        cb.fire_trade(
            &self.config.bot_name,
            &TradeEvent::Close {
                trade_id: position.trade_id,
                reason,
                exit_price: current_price,
                pnl_pct: row.pnl_pct.unwrap_or(0.0),
            },
        );
        Ok(())
    }

    async fn persist(&self) {
        self.state_store.save_bot_state(&self.config.bot_name, &self.runtime).await;
        match &self.runtime.position {
            Some(position) => {
                self.state_store.save_position(&self.config.bot_name, position).await;
            }
            None => {
                self.state_store.delete_position(&self.config.bot_name).await;
            }
        }
    }
}

/// First-match-wins exit check: a time-cut always takes precedence over
/// take-profit/stop-loss, which are themselves mutually exclusive at
/// any given price.
fn check_exit(
    position: &Position,
    config: &BotConfig,
    price: Decimal,
    now: chrono::DateTime<Utc>,
) -> Option<ExitReason> {
    if position.held_minutes(now) >= config.effective_time_cut_minutes() {
        return Some(ExitReason::TimeCut);
    }
    let pnl_pct = position.pnl_pct(price);
    if pnl_pct >= config.effective_take_profit_pct() * 100.0 {
        return Some(ExitReason::TakeProfit);
    }
    if pnl_pct <= -(config.effective_stop_loss_pct() * 100.0) {
        return Some(ExitReason::StopLoss);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use perpbot_core::domain::Side;
    use perpbot_core::RiskLevel;

    fn config() -> BotConfig {
        let mut cfg = BotConfig::new("bot1".into(), "BTCUSDT".into(), RiskLevel::Low).unwrap();
        cfg.time_cut_minutes = Some(180);
        cfg.take_profit_pct = Some(0.003);
        cfg.stop_loss_pct = Some(0.003);
        cfg
    }

    fn position(entry_price: Decimal, entry_time: chrono::DateTime<Utc>) -> Position {
        Position {
            side: Side::Long,
            entry_price,
            quantity: Decimal::ONE,
            entry_time,
            leverage: 10,
            trade_id: Uuid::new_v4(),
            order_id: "o1".into(),
        }
    }

    #[test]
    fn time_cut_takes_precedence_over_take_profit() {
        let cfg = config();
        let entry_time = Utc::now() - chrono::Duration::minutes(200);
        let pos = position(Decimal::from(100_000), entry_time);
        // price is also above take-profit, but the time-cut must win.
        let reason = check_exit(&pos, &cfg, Decimal::from(100_500), Utc::now());
        assert_eq!(reason, Some(ExitReason::TimeCut));
    }

    #[test]
    fn take_profit_triggers_at_configured_threshold() {
        let cfg = config();
        let pos = position(Decimal::from(100_000), Utc::now());
        let reason = check_exit(&pos, &cfg, Decimal::from(100_300), Utc::now());
        assert_eq!(reason, Some(ExitReason::TakeProfit));
    }

    #[test]
    fn stop_loss_triggers_at_configured_threshold() {
        let cfg = config();
        let pos = position(Decimal::from(100_000), Utc::now());
        let reason = check_exit(&pos, &cfg, Decimal::from(99_700), Utc::now());
        assert_eq!(reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn no_exit_within_bounds() {
        let cfg = config();
        let pos = position(Decimal::from(100_000), Utc::now());
        let reason = check_exit(&pos, &cfg, Decimal::from(100_050), Utc::now());
        assert_eq!(reason, None);
    }
}
