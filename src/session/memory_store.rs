use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tokio::time::Instant;

use super::SessionStore;
use crate::error::StoreError;

struct Entry {
    value: String,
    expires_at: Instant,
}

/// Process-local session store with per-key expiry.
///
/// Expiry follows the tokio clock, so paused-time tests can advance past a TTL.
#[derive(Default)]
pub struct InMemorySessionStore {
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of unexpired entries.
    pub async fn len(&self) -> usize {
        let now = Instant::now();
        self.entries
            .read()
            .await
            .values()
            .filter(|entry| entry.expires_at > now)
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn contains(&self, key: &str) -> bool {
        matches!(self.get(key).await, Ok(Some(_)))
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        // sweep entries that lapsed without ever being read again
        entries.retain(|_, entry| entry.expires_at > now);
        entries.insert(
            key.to_string(),
            Entry {
                value: value.to_string(),
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let now = Instant::now();
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return Ok(None),
                Some(entry) if entry.expires_at > now => return Ok(Some(entry.value.clone())),
                Some(_) => {}
            }
        }

        // lapsed: evict lazily
        let mut entries = self.entries.write().await;
        if entries.get(key).is_some_and(|entry| entry.expires_at <= now) {
            entries.remove(key);
        }
        Ok(None)
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}
