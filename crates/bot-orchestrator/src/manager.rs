//! `BotManager`: the single registry that owns every `BotInstance`'s
//! lifecycle. One `RwLock<HashMap<...>>` over the bot table is the only
//! lock in this crate's concurrency model (§5) — instances themselves
//! are single-owner tasks reached only through their `BotHandle`.

use crate::events::{Callbacks, ErrorCallback, SignalCallback, TradeCallback};
use crate::handle::BotHandle;
use crate::instance::BotInstance;
use crate::status::BotStatusSnapshot;
use perpbot_core::config_loader::ProcessConfig;
use perpbot_core::{AppError, BotConfig};
use perpbot_exchange::Exchange;
use perpbot_ledger::LedgerStore;
use perpbot_signals::AiProvider;
use perpbot_state_store::StateStore;
use std::collections::HashMap;
use std::sync::{Arc, RwLock as StdRwLock};
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

struct ManagedBot {
    handle: BotHandle,
    task: JoinHandle<()>,
}

/// Shared collaborators every spawned `BotInstance` is wired with.
/// Constructed once at process start and handed to every bot the
/// manager creates; none of these carry per-bot state.
#[derive(Clone)]
pub struct Collaborators {
    pub process: Arc<ProcessConfig>,
    pub exchange: Arc<dyn Exchange>,
    pub ledger: Arc<dyn LedgerStore>,
    pub state_store: Arc<dyn StateStore>,
    pub ai_provider: Option<Arc<dyn AiProvider>>,
}

pub struct BotManager {
    bots: RwLock<HashMap<String, ManagedBot>>,
    collaborators: Collaborators,
    callbacks: Arc<StdRwLock<Callbacks>>,
}

impl BotManager {
    #[must_use]
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            bots: RwLock::new(HashMap::new()),
            collaborators,
            callbacks: Arc::new(StdRwLock::new(Callbacks::default())),
        }
    }

    /// Registers a new bot and spawns its (initially stopped) decision
    /// loop. The caller must call `startBot` separately to begin
    /// ticking.
    ///
    /// # Errors
    /// Returns `AppError::AlreadyExists` if `config.bot_name` is
    /// already registered.
    pub async fn add_bot(&self, config: BotConfig) -> Result<BotHandle, AppError> {
        let name = config.bot_name.clone();
        let mut bots = self.bots.write().await;
        if bots.contains_key(&name) {
            return Err(AppError::AlreadyExists(name));
        }

        let (instance, handle) = BotInstance::new(
            config,
            self.collaborators.process.clone(),
            self.collaborators.exchange.clone(),
            self.collaborators.ledger.clone(),
            self.collaborators.state_store.clone(),
            self.collaborators.ai_provider.clone(),
            self.callbacks.clone(),
        );
        let task = tokio::spawn(instance.run());
        bots.insert(
            name,
            ManagedBot {
                handle: handle.clone(),
                task,
            },
        );
        Ok(handle)
    }

    /// Removes a bot, shutting down its decision loop and waiting for
    /// its task to finish.
    ///
    /// # Errors
    /// Returns `AppError::NotFound` if no such bot exists, or
    /// `AppError::Conflict` if the bot is currently running.
    pub async fn remove_bot(&self, name: &str) -> Result<(), AppError> {
        let managed = {
            let mut bots = self.bots.write().await;
            let Some(managed) = bots.get(name) else {
                return Err(AppError::NotFound(name.to_string()));
            };
            if managed.handle.status().runtime.is_running {
                return Err(AppError::Conflict(format!(
                    "bot {name} is running; stop it before removing"
                )));
            }
            bots.remove(name).expect("presence checked above")
        };
        let _ = managed.handle.shutdown().await;
        let _ = managed.task.await;
        Ok(())
    }

    #[must_use]
    pub async fn get_bot(&self, name: &str) -> Option<BotHandle> {
        self.bots.read().await.get(name).map(|b| b.handle.clone())
    }

    #[must_use]
    pub async fn list_bots(&self) -> Vec<String> {
        self.bots.read().await.keys().cloned().collect()
    }

    #[must_use]
    pub async fn list_statuses(&self) -> Vec<BotStatusSnapshot> {
        self.bots
            .read()
            .await
            .values()
            .map(|b| b.handle.status())
            .collect()
    }

    /// # Errors
    /// Returns `AppError::NotFound` if no such bot exists.
    pub async fn start_bot(&self, name: &str) -> Result<(), AppError> {
        self.with_handle(name, |h| async move {
            h.start().await.map_err(|e| AppError::Conflict(e.to_string()))
        })
        .await
    }

    /// # Errors
    /// Returns `AppError::NotFound` if no such bot exists.
    pub async fn stop_bot(&self, name: &str) -> Result<(), AppError> {
        self.with_handle(name, |h| async move {
            h.stop().await.map_err(|e| AppError::Conflict(e.to_string()))
        })
        .await
    }

    /// # Errors
    /// Returns `AppError::NotFound` if no such bot exists.
    pub async fn pause_bot(&self, name: &str) -> Result<(), AppError> {
        self.with_handle(name, |h| async move {
            h.pause().await.map_err(|e| AppError::Conflict(e.to_string()))
        })
        .await
    }

    /// # Errors
    /// Returns `AppError::NotFound` if no such bot exists.
    pub async fn resume_bot(&self, name: &str) -> Result<(), AppError> {
        self.with_handle(name, |h| async move {
            h.resume().await.map_err(|e| AppError::Conflict(e.to_string()))
        })
        .await
    }

    /// # Errors
    /// Returns `AppError::NotFound` if no such bot exists.
    pub async fn emergency_close_bot(&self, name: &str) -> Result<(), AppError> {
        self.with_handle(name, |h| async move {
            h.emergency_close().await.map_err(|e| AppError::Conflict(e.to_string()))
        })
        .await
    }

    /// # Errors
    /// Returns `AppError::NotFound` if no such bot exists, or
    /// `AppError::BadRequest` if `config` fails validation.
    pub async fn update_bot_config(&self, name: &str, config: BotConfig) -> Result<(), AppError> {
        config.validate()?;
        self.with_handle(name, |h| async move {
            h.update_config(config).await.map_err(|e| AppError::Conflict(e.to_string()))
        })
        .await
    }

    /// Starts every registered bot. Per-bot failures are logged and
    /// skipped rather than aborting the fan-out.
    pub async fn start_all(&self) {
        let handles: Vec<BotHandle> = self.bots.read().await.values().map(|b| b.handle.clone()).collect();
        let starts = handles.into_iter().map(|handle| async move {
            if let Err(err) = handle.start().await {
                tracing::error!(error = %err, "failed to start bot during start_all");
            }
        });
        futures_util::future::join_all(starts).await;
    }

    /// Stops every registered bot and waits for each to acknowledge.
    /// Returns only once every bot has stopped (or failed to, which is
    /// logged but does not block the others).
    pub async fn stop_all(&self) {
        let handles: Vec<BotHandle> = self.bots.read().await.values().map(|b| b.handle.clone()).collect();
        let stops = handles.into_iter().map(|handle| async move {
            if let Err(err) = handle.stop().await {
                tracing::error!(error = %err, "failed to stop bot during stop_all");
            }
        });
        futures_util::future::join_all(stops).await;
    }

    pub fn set_on_signal_callback(&self, callback: Option<SignalCallback>) {
        if let Ok(mut cb) = self.callbacks.write() {
            cb.on_signal = callback;
        }
    }

    pub fn set_on_trade_callback(&self, callback: Option<TradeCallback>) {
        if let Ok(mut cb) = self.callbacks.write() {
            cb.on_trade = callback;
        }
    }

    pub fn set_on_error_callback(&self, callback: Option<ErrorCallback>) {
        if let Ok(mut cb) = self.callbacks.write() {
            cb.on_error = callback;
        }
    }

    async fn with_handle<F, Fut>(&self, name: &str, f: F) -> Result<(), AppError>
    where
        F: FnOnce(BotHandle) -> Fut,
        Fut: std::future::Future<Output = Result<(), AppError>>,
    {
        let handle = self
            .bots
            .read()
            .await
            .get(name)
            .map(|b| b.handle.clone())
            .ok_or_else(|| AppError::NotFound(name.to_string()))?;
        f(handle).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perpbot_core::config_loader::{AiConfig, ExchangeConfig, LedgerConfig, ServerConfig, StateStoreConfig};
    use perpbot_core::RiskLevel;
    use perpbot_exchange::DummyExchange;
    use perpbot_ledger::DummyLedgerStore;
    use perpbot_state_store::DummyStateStore;
    use std::time::Duration;

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

    fn bot_config(name: &str) -> BotConfig {
        BotConfig::new(name.into(), "BTCUSDT".into(), RiskLevel::Low).unwrap()
    }

    #[tokio::test]
    async fn add_then_remove_bot_round_trips() {
        let manager = BotManager::new(collaborators());
        manager.add_bot(bot_config("bot1")).await.unwrap();
        assert_eq!(manager.list_bots().await, vec!["bot1".to_string()]);
        manager.remove_bot("bot1").await.unwrap();
        assert!(manager.list_bots().await.is_empty());
    }

    #[tokio::test]
    async fn adding_duplicate_name_is_rejected() {
        let manager = BotManager::new(collaborators());
        manager.add_bot(bot_config("bot1")).await.unwrap();
        let err = manager.add_bot(bot_config("bot1")).await.unwrap_err();
        assert!(matches!(err, AppError::AlreadyExists(_)));
        manager.remove_bot("bot1").await.unwrap();
    }

    #[tokio::test]
    async fn removing_unknown_bot_is_not_found() {
        let manager = BotManager::new(collaborators());
        let err = manager.remove_bot("ghost").await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn start_stop_pause_resume_round_trip() {
        let manager = BotManager::new(collaborators());
        manager.add_bot(bot_config("bot1")).await.unwrap();
        manager.start_bot("bot1").await.unwrap();
        manager.pause_bot("bot1").await.unwrap();
        let handle = manager.get_bot("bot1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(handle.status().runtime.is_paused);
        manager.resume_bot("bot1").await.unwrap();
        manager.stop_bot("bot1").await.unwrap();
        manager.remove_bot("bot1").await.unwrap();
    }

    #[tokio::test]
    async fn cannot_remove_a_running_bot() {
        let manager = BotManager::new(collaborators());
        manager.add_bot(bot_config("bot1")).await.unwrap();
        manager.start_bot("bot1").await.unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        let err = manager.remove_bot("bot1").await.unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        manager.stop_bot("bot1").await.unwrap();
        manager.remove_bot("bot1").await.unwrap();
    }

    #[tokio::test]
    async fn start_all_and_stop_all_fan_out() {
        let manager = BotManager::new(collaborators());
        manager.add_bot(bot_config("bot1")).await.unwrap();
        manager.add_bot(bot_config("bot2")).await.unwrap();
        manager.start_all().await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        for name in ["bot1", "bot2"] {
            let handle = manager.get_bot(name).await.unwrap();
            assert!(handle.status().runtime.is_running);
        }
        manager.stop_all().await;
        for name in ["bot1", "bot2"] {
            manager.remove_bot(name).await.unwrap();
        }
    }

    #[tokio::test]
    async fn rejects_invalid_config_update() {
        let manager = BotManager::new(collaborators());
        manager.add_bot(bot_config("bot1")).await.unwrap();
        let mut bad = bot_config("bot1");
        bad.leverage = Some(500);
        let err = manager.update_bot_config("bot1", bad).await.unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
        manager.remove_bot("bot1").await.unwrap();
    }
}
