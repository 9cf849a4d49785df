use async_trait::async_trait;
use perpbot_core::domain::Position;
use perpbot_core::BotRuntimeState;

/// Durable key/value snapshot store. Every method is non-throwing: a
/// backend outage degrades to a `false`/`None` result, never a panic or
/// propagated error, so a StateStore failure can never take the live
/// decision loop down with it (§7).
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn save_bot_state(&self, name: &str, state: &BotRuntimeState) -> bool;
    async fn load_bot_state(&self, name: &str) -> Option<BotRuntimeState>;

    async fn save_position(&self, name: &str, position: &Position) -> bool;
    async fn load_position(&self, name: &str) -> Option<Position>;
    async fn delete_position(&self, name: &str) -> bool;

    async fn register_bot(&self, name: &str) -> bool;
    /// Cascades: deletes the state/position hashes and clears the
    /// running mark for `name`.
    async fn unregister_bot(&self, name: &str) -> bool;
    async fn get_registered_bots(&self) -> Vec<String>;

    async fn set_bot_running(&self, name: &str) -> bool;
    async fn set_bot_stopped(&self, name: &str) -> bool;
    async fn get_running_bots(&self) -> Vec<String>;
    /// Resets all stale running marks; called once at process start.
    async fn clear_running_bots(&self) -> bool;

    async fn ping(&self) -> bool;
}
