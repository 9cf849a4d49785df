use crate::store::StateStore;
use async_trait::async_trait;
use perpbot_core::domain::Position;
use perpbot_core::BotRuntimeState;

/// Persists nothing. Used when the backing service is unreachable and
/// fallback is enabled, or in tests that don't care about durability.
/// Crash-recovery becomes lossy but the live loop is unaffected — the
/// same interface as the real store, so callers never branch on which
/// one they hold.
#[derive(Debug, Default, Clone, Copy)]
pub struct DummyStateStore;

#[async_trait]
impl StateStore for DummyStateStore {
    async fn save_bot_state(&self, _name: &str, _state: &BotRuntimeState) -> bool {
        false
    }

    async fn load_bot_state(&self, _name: &str) -> Option<BotRuntimeState> {
        None
    }

    async fn save_position(&self, _name: &str, _position: &Position) -> bool {
        false
    }

    async fn load_position(&self, _name: &str) -> Option<Position> {
        None
    }

    async fn delete_position(&self, _name: &str) -> bool {
        false
    }

    async fn register_bot(&self, _name: &str) -> bool {
        false
    }

    async fn unregister_bot(&self, _name: &str) -> bool {
        false
    }

    async fn get_registered_bots(&self) -> Vec<String> {
        Vec::new()
    }

    async fn set_bot_running(&self, _name: &str) -> bool {
        false
    }

    async fn set_bot_stopped(&self, _name: &str) -> bool {
        false
    }

    async fn get_running_bots(&self) -> Vec<String> {
        Vec::new()
    }

    async fn clear_running_bots(&self) -> bool {
        false
    }

    async fn ping(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn every_operation_degrades_quietly() {
        let store = DummyStateStore;
        let state = BotRuntimeState::default();
        assert!(!store.save_bot_state("bot1", &state).await);
        assert!(store.load_bot_state("bot1").await.is_none());
        assert!(!store.ping().await);
        assert!(store.get_registered_bots().await.is_empty());
    }
}
