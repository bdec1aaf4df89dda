use std::time::Duration;

use async_trait::async_trait;

use crate::error::StoreError;

/// Key-value store holding active sessions.
///
/// Values are opaque strings; entries disappear on their own once `ttl` lapses.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}
