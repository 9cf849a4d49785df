use perpbot_core::BotRuntimeState;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Coarse lifecycle state, derived from `BotRuntimeState` plus whether
/// the last tick recorded an error. Distinct from the finer-grained
/// fields on `runtime`, which this snapshot also carries in full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotState {
    Stopped,
    Running,
    Paused,
    Error,
}

/// The only way `BotRuntimeState` is observed from outside the
/// `BotInstance` that owns it: published to a `watch` channel at the
/// end of every command handled and every tick run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotStatusSnapshot {
    pub bot_id: Uuid,
    pub bot_name: String,
    pub symbol: String,
    pub state: BotState,
    pub runtime: BotRuntimeState,
    pub last_error: Option<String>,
}

impl BotStatusSnapshot {
    #[must_use]
    pub fn initial(bot_id: Uuid, bot_name: String, symbol: String) -> Self {
        Self {
            bot_id,
            bot_name,
            symbol,
            state: BotState::Stopped,
            runtime: BotRuntimeState::default(),
            last_error: None,
        }
    }

    pub fn refresh(&mut self, runtime: &BotRuntimeState, last_error: Option<String>) {
        self.state = if last_error.is_some() {
            BotState::Error
        } else if runtime.is_running && runtime.is_paused {
            BotState::Paused
        } else if runtime.is_running {
            BotState::Running
        } else {
            BotState::Stopped
        };
        self.runtime = runtime.clone();
        self.last_error = last_error;
    }
}
