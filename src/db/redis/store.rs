use redis::AsyncCommands;
use redis::{Client, Expiry};

use crate::db::{SessionKey, SessionStore};
use crate::error::AppResult;

/// Creates a Redis client for session state
///
/// Connections are multiplexed, so one client serves every request.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Session store backed by Redis
///
/// Reads and writes both reset a slot's TTL: a slot expires only after
/// `ttl` seconds in which its session neither read nor wrote it.
#[derive(Clone)]
pub struct RedisSessionStore {
    redis_client: Client,
    ttl: u64,
}

impl RedisSessionStore {
    pub fn new(redis_client: Client, ttl: u64) -> Self {
        Self { redis_client, ttl }
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn get(&self, key: &SessionKey) -> AppResult<Option<String>> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let value: Option<String> = conn.get_ex(format!("{}", key), Expiry::EX(self.ttl)).await?;
        Ok(value)
    }

    /// Writes synchronously: the next request of the same session must see it
    async fn set(&self, key: &SessionKey, value: String) -> AppResult<()> {
        let mut conn = self.redis_client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(format!("{}", key), value, self.ttl).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}
