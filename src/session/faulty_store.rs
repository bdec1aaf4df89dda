use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use super::{InMemorySessionStore, SessionStore};
use crate::error::StoreError;

pub(crate) enum WriteFault {
    Error,
    Panic,
}

/// In-memory store whose operations can be made to fail on demand.
#[derive(Default)]
pub(crate) struct FaultyStore {
    pub(crate) inner: InMemorySessionStore,
    reads_fail: AtomicBool,
    deletes_fail: AtomicBool,
    write_fault: Mutex<Option<(&'static str, WriteFault)>>,
}

impl FaultyStore {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn fail_reads(&self) {
        self.reads_fail.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_deletes(&self) {
        self.deletes_fail.store(true, Ordering::SeqCst);
    }

    /// Writes to keys containing `fragment` fail the given way.
    pub(crate) fn fail_writes_to(&self, fragment: &'static str, fault: WriteFault) {
        *self.write_fault.lock().unwrap() = Some((fragment, fault));
    }

    fn unavailable() -> StoreError {
        StoreError::Unavailable("connection reset".to_string())
    }
}

#[async_trait]
impl SessionStore for FaultyStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        let fault = match &*self.write_fault.lock().unwrap() {
            Some((fragment, WriteFault::Error)) if key.contains(fragment) => Some(false),
            Some((fragment, WriteFault::Panic)) if key.contains(fragment) => Some(true),
            _ => None,
        };
        match fault {
            Some(true) => panic!("store write crashed"),
            Some(false) => Err(Self::unavailable()),
            None => self.inner.set(key, value, ttl).await,
        }
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        if self.reads_fail.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout(Duration::from_millis(10)));
        }
        self.inner.get(key).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        if self.deletes_fail.load(Ordering::SeqCst) {
            return Err(Self::unavailable());
        }
        self.inner.delete(key).await
    }
}
