use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{Identity, UserDirectory, UserId};
use crate::error::DirectoryError;

struct AccountRecord {
    identity: Identity,
    withdrawn: bool,
}

/// Process-local user directory for tests and local development.
pub struct InMemoryUserDirectory {
    accounts: RwLock<HashMap<UserId, AccountRecord>>,
    next_id: AtomicI64,
}

impl Default for InMemoryUserDirectory {
    fn default() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
        }
    }
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a user with an already-hashed password and return its id.
    pub async fn insert(&self, email: impl Into<String>, password_hash: impl Into<String>) -> UserId {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let mut accounts = self.accounts.write().await;
        accounts.insert(
            id,
            AccountRecord {
                identity: Identity {
                    id,
                    email: email.into(),
                    password_hash: password_hash.into(),
                },
                withdrawn: false,
            },
        );
        id
    }

    /// Drop a user entirely, as if the account was deleted out of band.
    pub async fn remove(&self, id: UserId) {
        self.accounts.write().await.remove(&id);
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, DirectoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .values()
            .find(|record| !record.withdrawn && record.identity.email == email)
            .map(|record| record.identity.clone()))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, DirectoryError> {
        let accounts = self.accounts.read().await;
        Ok(accounts
            .get(&id)
            .filter(|record| !record.withdrawn)
            .map(|record| record.identity.clone()))
    }

    async fn deactivate(&self, id: UserId) -> Result<(), DirectoryError> {
        let mut accounts = self.accounts.write().await;
        if let Some(record) = accounts.get_mut(&id) {
            record.withdrawn = true;
        }
        Ok(())
    }
}
