use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// One async mutex per session id
///
/// Holding a session's guard serializes its read-modify-write flows. Idle
/// entries are dropped the next time any lock is taken.
#[derive(Clone, Default)]
pub struct SessionLocks {
    inner: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no other flow holds `session`, then holds it
    pub async fn lock(&self, session: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut inner = self.inner.lock().await;
            inner.retain(|_, slot| Arc::strong_count(slot) > 1);
            inner
                .entry(session.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(())))
                .clone()
        };
        slot.lock_owned().await
    }

    /// Number of sessions with a live lock entry
    pub async fn tracked(&self) -> usize {
        self.inner.lock().await.len()
    }
}
