use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::db::{SessionKey, SessionStore};
use crate::error::AppResult;

/// Process-local session store
///
/// State is lost on restart and not shared between instances.
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    inner: Arc<RwLock<HashMap<SessionKey, String>>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn get(&self, key: &SessionKey) -> AppResult<Option<String>> {
        let inner = self.inner.read().await;
        Ok(inner.get(key).cloned())
    }

    async fn set(&self, key: &SessionKey, value: String) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        inner.insert(key.clone(), value);
        Ok(())
    }

    fn name(&self) -> &'static str {
        "memory"
    }
}
