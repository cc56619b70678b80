use std::fmt::Display;

use crate::error::AppResult;

pub mod memory;
pub mod redis;

pub use self::memory::MemorySessionStore;
pub use self::redis::{create_redis_client, RedisSessionStore};

/// Named per-session slots in the key-value store
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum SessionKey {
    Profile(String),
    LastOutfit(String),
    TryOn(String),
}

impl Display for SessionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionKey::Profile(session) => write!(f, "profile:{}", session),
            SessionKey::LastOutfit(session) => write!(f, "last_outfit:{}", session),
            SessionKey::TryOn(session) => write!(f, "tryon:{}", session),
        }
    }
}

/// Session-scoped key-value store holding serialized state
///
/// Values are JSON documents; typed access lives in
/// `services::preferences`.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    async fn get(&self, key: &SessionKey) -> AppResult<Option<String>>;

    async fn set(&self, key: &SessionKey, value: String) -> AppResult<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}
