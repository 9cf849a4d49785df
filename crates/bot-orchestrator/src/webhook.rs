//! §6.3's webhook ingress contract. Authentication and HTTP framing are
//! an out-of-scope header check (§1) — this module only covers what
//! the core does once a payload has already been validated: parse it
//! leniently, resolve which bot(s) it targets, and apply it.

use crate::manager::BotManager;
use perpbot_core::domain::SignalKind;
use perpbot_core::AppError;
use serde::{Deserialize, Serialize};

/// The webhook signal vocabulary is a superset of `domain::SignalKind`:
/// `CLOSE` has no ensemble-voter meaning and is instead routed straight
/// to an emergency close.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum WebhookSignalKind {
    Long,
    Short,
    Wait,
    Close,
}

impl WebhookSignalKind {
    /// Parses a webhook-supplied string, case-insensitively. Unrecognized
    /// input coerces to `WAIT`, per §7's "signal webhooks default to WAIT
    /// on any malformed input."
    #[must_use]
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_uppercase().as_str() {
            "LONG" => Self::Long,
            "SHORT" => Self::Short,
            "CLOSE" => Self::Close,
            _ => Self::Wait,
        }
    }

    const fn as_vote(self) -> Option<SignalKind> {
        match self {
            Self::Long => Some(SignalKind::Long),
            Self::Short => Some(SignalKind::Short),
            Self::Wait => Some(SignalKind::Wait),
            Self::Close => None,
        }
    }
}

/// `{botName?, signal, source, confidence, metadata?}` from §6.3.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookSignalPayload {
    pub bot_name: Option<String>,
    pub signal: WebhookSignalKind,
    pub source: String,
    pub confidence: f64,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WebhookCommandKind {
    Start,
    Stop,
    Pause,
    Resume,
    EmergencyClose,
}

/// `{botName?, command, parameters?}` from §6.3. `parameters` is
/// accepted but unused — no command in §6.2's control surface takes
/// arguments beyond the target bot.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookCommandPayload {
    pub bot_name: Option<String>,
    pub command: WebhookCommandKind,
    #[serde(default)]
    pub parameters: Option<serde_json::Value>,
}

impl BotManager {
    /// Applies a validated signal payload. `LONG`/`SHORT`/`WAIT` are
    /// folded into the named bot's next tick as one more ensemble
    /// voter; `CLOSE` requests an emergency close instead. A missing
    /// `bot_name` applies to every registered bot (§6.3).
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if `bot_name` names an unregistered
    /// bot.
    pub async fn dispatch_webhook_signal(&self, payload: &WebhookSignalPayload) -> Result<(), AppError> {
        for name in self.resolve_webhook_targets(payload.bot_name.as_deref()).await? {
            let Some(handle) = self.get_bot(&name).await else {
                continue;
            };
            let outcome = match payload.signal.as_vote() {
                Some(kind) => {
                    handle
                        .external_signal(kind, payload.source.clone(), payload.confidence)
                        .await
                }
                None => handle.emergency_close().await,
            };
            if let Err(err) = outcome {
                tracing::warn!(bot_name = %name, error = %err, "webhook signal delivery failed");
            }
        }
        Ok(())
    }

    /// Applies a validated command payload, reusing the same per-bot
    /// operations §6.2's admin surface exposes. A missing `bot_name`
    /// applies to every registered bot.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if `bot_name` names an unregistered
    /// bot.
    pub async fn dispatch_webhook_command(&self, payload: &WebhookCommandPayload) -> Result<(), AppError> {
        for name in self.resolve_webhook_targets(payload.bot_name.as_deref()).await? {
            let outcome = match payload.command {
                WebhookCommandKind::Start => self.start_bot(&name).await,
                WebhookCommandKind::Stop => self.stop_bot(&name).await,
                WebhookCommandKind::Pause => self.pause_bot(&name).await,
                WebhookCommandKind::Resume => self.resume_bot(&name).await,
                WebhookCommandKind::EmergencyClose => self.emergency_close_bot(&name).await,
            };
            if let Err(err) = outcome {
                tracing::warn!(bot_name = %name, error = %err, "webhook command delivery failed");
            }
        }
        Ok(())
    }

    async fn resolve_webhook_targets(&self, bot_name: Option<&str>) -> Result<Vec<String>, AppError> {
        match bot_name {
            Some(name) if self.get_bot(name).await.is_some() => Ok(vec![name.to_string()]),
            Some(name) => Err(AppError::NotFound(name.to_string())),
            None => Ok(self.list_bots().await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::Collaborators;
    use perpbot_core::config_loader::{AiConfig, ExchangeConfig, LedgerConfig, ProcessConfig, ServerConfig, StateStoreConfig};
    use perpbot_core::RiskLevel;
    use perpbot_exchange::DummyExchange;
    use perpbot_ledger::DummyLedgerStore;
    use perpbot_state_store::DummyStateStore;
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn malformed_signal_string_coerces_to_wait() {
        assert_eq!(WebhookSignalKind::parse_lenient("bogus"), WebhookSignalKind::Wait);
        assert_eq!(WebhookSignalKind::parse_lenient("close"), WebhookSignalKind::Close);
    }

    #[test]
    fn close_has_no_ensemble_vote() {
        assert_eq!(WebhookSignalKind::Close.as_vote(), None);
        assert_eq!(WebhookSignalKind::Long.as_vote(), Some(SignalKind::Long));
    }

    fn collaborators() -> Collaborators {
        Collaborators {
            process: Arc::new(ProcessConfig {
                loop_interval_secs: 300,
                server: ServerConfig { host: "127.0.0.1".into(), port: 8080 },
                state_store: StateStoreConfig { url: "redis://localhost".into(), key_prefix: "perpbot".into() },
                ledger: LedgerConfig { url: "postgres://localhost".into() },
                ai: AiConfig::default(),
                exchange: ExchangeConfig::default(),
            }),
            exchange: Arc::new(DummyExchange),
            ledger: Arc::new(DummyLedgerStore),
            state_store: Arc::new(DummyStateStore),
            ai_provider: None,
        }
    }

    #[tokio::test]
    async fn command_payload_with_no_bot_name_fans_out_to_every_bot() {
        let manager = BotManager::new(collaborators());
        manager
            .add_bot(perpbot_core::BotConfig::new("bot1".into(), "BTCUSDT".into(), RiskLevel::Low).unwrap())
            .await
            .unwrap();
        manager
            .add_bot(perpbot_core::BotConfig::new("bot2".into(), "BTCUSDT".into(), RiskLevel::Low).unwrap())
            .await
            .unwrap();

        manager
            .dispatch_webhook_command(&WebhookCommandPayload {
                bot_name: None,
                command: WebhookCommandKind::Start,
                parameters: None,
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        for name in ["bot1", "bot2"] {
            assert!(manager.get_bot(name).await.unwrap().status().runtime.is_running);
        }
    }

    #[tokio::test]
    async fn command_payload_naming_unknown_bot_is_not_found() {
        let manager = BotManager::new(collaborators());
        let err = manager
            .dispatch_webhook_command(&WebhookCommandPayload {
                bot_name: Some("ghost".into()),
                command: WebhookCommandKind::Stop,
                parameters: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn signal_payload_queues_an_external_voter_for_the_named_bot() {
        let manager = BotManager::new(collaborators());
        manager
            .add_bot(perpbot_core::BotConfig::new("bot1".into(), "BTCUSDT".into(), RiskLevel::Low).unwrap())
            .await
            .unwrap();

        manager
            .dispatch_webhook_signal(&WebhookSignalPayload {
                bot_name: Some("bot1".into()),
                signal: WebhookSignalKind::Long,
                source: "tradingview".into(),
                confidence: 0.9,
                metadata: None,
            })
            .await
            .unwrap();

        // Delivery succeeds (mailbox accepted the command); the voter
        // itself is consumed on the instance's next tick, which this
        // test doesn't drive.
    }

    #[tokio::test]
    async fn close_signal_emergency_closes_instead_of_voting() {
        let manager = BotManager::new(collaborators());
        manager
            .add_bot(perpbot_core::BotConfig::new("bot1".into(), "BTCUSDT".into(), RiskLevel::Low).unwrap())
            .await
            .unwrap();
        manager.start_bot("bot1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        manager
            .dispatch_webhook_signal(&WebhookSignalPayload {
                bot_name: Some("bot1".into()),
                signal: WebhookSignalKind::Close,
                source: "tradingview".into(),
                confidence: 1.0,
                metadata: None,
            })
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;

        assert!(manager.get_bot("bot1").await.unwrap().status().runtime.emergency_close);
        manager.stop_bot("bot1").await.unwrap();
        manager.remove_bot("bot1").await.unwrap();
    }
}
