use crate::hash::{
    hash_to_position, hash_to_runtime_state, position_to_hash, runtime_state_to_hash, StateHash,
};
use crate::store::StateStore;
use anyhow::{Context, Result};
use async_trait::async_trait;
use perpbot_core::domain::Position;
use perpbot_core::BotRuntimeState;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

/// Redis-backed implementation of `StateStore`. Connects eagerly at
/// construction (via `ConnectionManager`, which reconnects transparently
/// on transient drops) and maps every internal error to the non-throwing
/// boolean/`Option` contract the trait promises.
pub struct RedisStateStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisStateStore {
    /// # Errors
    /// Returns an error if the initial connection cannot be established.
    pub async fn connect(url: &str, key_prefix: &str) -> Result<Self> {
        let client = redis::Client::open(url).context("invalid redis URL")?;
        let conn = client
            .get_connection_manager()
            .await
            .context("failed to connect to redis")?;
        Ok(Self {
            conn,
            prefix: key_prefix.to_string(),
        })
    }

    fn state_key(&self, name: &str) -> String {
        format!("{}:bot:{}:state", self.prefix, name)
    }

    fn position_key(&self, name: &str) -> String {
        format!("{}:bot:{}:position", self.prefix, name)
    }

    fn bots_key(&self) -> String {
        format!("{}:manager:bots", self.prefix)
    }

    fn running_key(&self) -> String {
        format!("{}:manager:running", self.prefix)
    }

    async fn try_save_bot_state(&self, name: &str, state: &BotRuntimeState) -> Result<()> {
        let hash = runtime_state_to_hash(state);
        let mut conn = self.conn.clone();
        let _: () = conn.hset_multiple(self.state_key(name), &hash_pairs(&hash)).await?;
        Ok(())
    }

    async fn try_load_bot_state(&self, name: &str) -> Result<Option<BotRuntimeState>> {
        let mut conn = self.conn.clone();
        let hash: StateHash = conn.hgetall(self.state_key(name)).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        Ok(Some(hash_to_runtime_state(&hash)))
    }

    async fn try_save_position(&self, name: &str, position: &Position) -> Result<()> {
        let hash = position_to_hash(position);
        let mut conn = self.conn.clone();
        let _: () = conn
            .hset_multiple(self.position_key(name), &hash_pairs(&hash))
            .await?;
        Ok(())
    }

    async fn try_load_position(&self, name: &str) -> Result<Option<Position>> {
        let mut conn = self.conn.clone();
        let hash: StateHash = conn.hgetall(self.position_key(name)).await?;
        if hash.is_empty() {
            return Ok(None);
        }
        Ok(hash_to_position(&hash))
    }
}

fn hash_pairs(hash: &StateHash) -> Vec<(String, String)> {
    hash.iter().map(|(k, v)| (k.clone(), v.clone())).collect()
}

#[async_trait]
impl StateStore for RedisStateStore {
    async fn save_bot_state(&self, name: &str, state: &BotRuntimeState) -> bool {
        match self.try_save_bot_state(name, state).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to save bot state");
                false
            }
        }
    }

    async fn load_bot_state(&self, name: &str) -> Option<BotRuntimeState> {
        match self.try_load_bot_state(name).await {
            Ok(state) => state,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to load bot state");
                None
            }
        }
    }

    async fn save_position(&self, name: &str, position: &Position) -> bool {
        match self.try_save_position(name, position).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to save position");
                false
            }
        }
    }

    async fn load_position(&self, name: &str) -> Option<Position> {
        match self.try_load_position(name).await {
            Ok(position) => position,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to load position");
                None
            }
        }
    }

    async fn delete_position(&self, name: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(self.position_key(name)).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to delete position");
                false
            }
        }
    }

    async fn register_bot(&self, name: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.sadd::<_, _, ()>(self.bots_key(), name).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to register bot");
                false
            }
        }
    }

    async fn unregister_bot(&self, name: &str) -> bool {
        let mut conn = self.conn.clone();
        let result: Result<(), redis::RedisError> = async {
            conn.srem(self.bots_key(), name).await?;
            conn.srem(self.running_key(), name).await?;
            conn.del(self.state_key(name)).await?;
            conn.del(self.position_key(name)).await?;
            Ok(())
        }
        .await;
        match result {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to unregister bot");
                false
            }
        }
    }

    async fn get_registered_bots(&self) -> Vec<String> {
        let mut conn = self.conn.clone();
        conn.smembers(self.bots_key()).await.unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to list registered bots");
            Vec::new()
        })
    }

    async fn set_bot_running(&self, name: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.sadd::<_, _, ()>(self.running_key(), name).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to mark bot running");
                false
            }
        }
    }

    async fn set_bot_stopped(&self, name: &str) -> bool {
        let mut conn = self.conn.clone();
        match conn.srem::<_, _, ()>(self.running_key(), name).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(bot = name, error = %err, "failed to mark bot stopped");
                false
            }
        }
    }

    async fn get_running_bots(&self) -> Vec<String> {
        let mut conn = self.conn.clone();
        conn.smembers(self.running_key()).await.unwrap_or_else(|err| {
            tracing::error!(error = %err, "failed to list running bots");
            Vec::new()
        })
    }

    async fn clear_running_bots(&self) -> bool {
        let mut conn = self.conn.clone();
        match conn.del::<_, ()>(self.running_key()).await {
            Ok(()) => true,
            Err(err) => {
                tracing::error!(error = %err, "failed to clear running bots");
                false
            }
        }
    }

    async fn ping(&self) -> bool {
        let mut conn = self.conn.clone();
        redis::cmd("PING")
            .query_async::<_, String>(&mut conn)
            .await
            .is_ok()
    }
}
