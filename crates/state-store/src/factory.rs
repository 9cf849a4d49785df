use crate::dummy_store::DummyStateStore;
use crate::redis_store::RedisStateStore;
use crate::store::StateStore;
use std::sync::Arc;

/// Connects to Redis and pings it; falls back to `DummyStateStore` if
/// either step fails, so a process can still start trading (with lossy
/// crash-recovery) when the state-store backend is down.
pub async fn connect_or_fallback(url: &str, key_prefix: &str) -> Arc<dyn StateStore> {
    match RedisStateStore::connect(url, key_prefix).await {
        Ok(store) => {
            if store.ping().await {
                Arc::new(store)
            } else {
                tracing::warn!("state store unreachable (ping failed), falling back to dummy store");
                Arc::new(DummyStateStore)
            }
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to connect to state store, falling back to dummy store");
            Arc::new(DummyStateStore)
        }
    }
}
