//! Per-session lock registry.
//!
//! Guarantees the single-writer-per-session contract: turns for the same
//! session id are serialized for their whole load-process-save span, while
//! different sessions proceed independently.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Registry of per-key async mutexes.
#[derive(Debug, Default)]
pub struct SessionLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire the lock for a session id, waiting if another turn for the
    /// same session is in flight. The guard is owned so it can be held
    /// across await points.
    pub async fn acquire(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut map = match self.inner.lock() {
                Ok(map) => map,
                Err(poisoned) => poisoned.into_inner(),
            };
            Arc::clone(
                map.entry(session_id.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        lock.lock_owned().await
    }
}
