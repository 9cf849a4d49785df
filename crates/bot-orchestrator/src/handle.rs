use crate::commands::BotCommand;
use crate::status::BotStatusSnapshot;
use anyhow::{bail, Result};
use perpbot_core::domain::{IndividualSignal, SignalKind};
use perpbot_core::BotConfig;
use tokio::sync::{mpsc, oneshot, watch};

/// Vote weight given to a webhook-sourced signal, between the rule
/// (0.3) and AI (0.4) defaults — an external source carries conviction
/// but isn't automatically trusted over the bot's own voters.
const EXTERNAL_SIGNAL_WEIGHT: f64 = 0.35;

/// A cheap, cloneable front for a running `BotInstance`'s mailbox.
///
/// Every mutating call sends a `BotCommand` and returns once the
/// instance has accepted it (or, for `stop`/`shutdown`, once the
/// instance has acknowledged the transition completed). `status` never
/// touches the mailbox: it reads the latest published snapshot straight
/// off a `watch` channel, so polling status never queues behind a slow
/// tick.
#[derive(Clone)]
pub struct BotHandle {
    tx: mpsc::Sender<BotCommand>,
    status_rx: watch::Receiver<BotStatusSnapshot>,
}

impl BotHandle {
    #[must_use]
    pub const fn new(tx: mpsc::Sender<BotCommand>, status_rx: watch::Receiver<BotStatusSnapshot>) -> Self {
        Self { tx, status_rx }
    }

    /// # Errors
    /// Returns an error if the instance's mailbox has already closed.
    pub async fn start(&self) -> Result<()> {
        self.send(BotCommand::Start).await
    }

    /// Requests a graceful stop and waits for the instance to
    /// acknowledge it has left the running state.
    ///
    /// # Errors
    /// Returns an error if the mailbox is closed or the instance drops
    /// the acknowledgement channel without responding.
    pub async fn stop(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx.send(BotCommand::Stop(ack_tx)).await?;
        ack_rx.await?;
        Ok(())
    }

    /// # Errors
    /// Returns an error if the instance's mailbox has already closed.
    pub async fn pause(&self) -> Result<()> {
        self.send(BotCommand::Pause).await
    }

    /// # Errors
    /// Returns an error if the instance's mailbox has already closed.
    pub async fn resume(&self) -> Result<()> {
        self.send(BotCommand::Resume).await
    }

    /// # Errors
    /// Returns an error if the instance's mailbox has already closed.
    pub async fn emergency_close(&self) -> Result<()> {
        self.send(BotCommand::EmergencyClose).await
    }

    /// # Errors
    /// Returns an error if the instance's mailbox has already closed.
    pub async fn update_config(&self, config: BotConfig) -> Result<()> {
        self.send(BotCommand::UpdateConfig(Box::new(config))).await
    }

    /// Queues a webhook-sourced signal (§6.3) as an additional ensemble
    /// voter for the next tick.
    ///
    /// # Errors
    /// Returns an error if the instance's mailbox has already closed.
    pub async fn external_signal(&self, kind: SignalKind, source: String, confidence: f64) -> Result<()> {
        let signal = IndividualSignal {
            source: source.clone(),
            kind,
            confidence: confidence.clamp(0.0, 1.0),
            weight: EXTERNAL_SIGNAL_WEIGHT,
            reason: format!("webhook signal from {source}"),
        };
        self.send(BotCommand::ExternalSignal(signal)).await
    }

    /// Requests shutdown and waits for the instance's task to finish
    /// tearing down before returning.
    ///
    /// # Errors
    /// Returns an error if the mailbox is closed or the instance drops
    /// the acknowledgement channel without responding.
    pub async fn shutdown(&self) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.tx.send(BotCommand::Shutdown(ack_tx)).await?;
        ack_rx.await?;
        Ok(())
    }

    /// The latest published status snapshot. Never blocks on the
    /// mailbox or the instance's tick loop.
    #[must_use]
    pub fn status(&self) -> BotStatusSnapshot {
        self.status_rx.borrow().clone()
    }

    async fn send(&self, cmd: BotCommand) -> Result<()> {
        if self.tx.send(cmd).await.is_err() {
            bail!("bot instance mailbox closed");
        }
        Ok(())
    }
}
