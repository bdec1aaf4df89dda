use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;

use super::SessionStore;
use crate::configuration::RedisSettings;
use crate::error::StoreError;

/// One extra attempt for connectivity faults; never for application outcomes.
const MAX_RETRIES: u32 = 1;

/// Session store backed by Redis (`SET .. EX`, `GET`, `DEL`).
#[derive(Clone)]
pub struct RedisSessionStore {
    connection: ConnectionManager,
    timeout: Duration,
}

impl RedisSessionStore {
    /// Connect to the server named in the settings.
    ///
    /// # Errors
    /// Returns error if the URL is invalid or the initial connection fails
    pub async fn connect(settings: &RedisSettings) -> Result<Self, StoreError> {
        let client = redis::Client::open(settings.url.as_str())?;
        let timeout = settings.timeout();
        let connection = tokio::time::timeout(timeout, ConnectionManager::new(client))
            .await
            .map_err(|_| StoreError::Timeout(timeout))??;

        tracing::info!("Connected to session store");
        Ok(Self {
            connection,
            timeout,
        })
    }

    async fn execute<T, F, Fut>(&self, operation: &'static str, command: F) -> Result<T, StoreError>
    where
        F: Fn(ConnectionManager) -> Fut + Send + Sync,
        Fut: Future<Output = Result<T, redis::RedisError>> + Send,
        T: Send,
    {
        with_retry(operation, self.timeout, || command(self.connection.clone())).await
    }
}

/// Run `attempt` under `timeout`, trying once more after a timeout or a
/// connectivity fault. Any other error is returned straight away.
async fn with_retry<T, F, Fut>(
    operation: &'static str,
    timeout: Duration,
    mut attempt: F,
) -> Result<T, StoreError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, redis::RedisError>>,
{
    let mut retries = 0;
    loop {
        let (error, transient) = match tokio::time::timeout(timeout, attempt()).await {
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                let transient = is_transient(&e);
                (StoreError::from(e), transient)
            }
            Err(_) => (StoreError::Timeout(timeout), true),
        };

        if transient && retries < MAX_RETRIES {
            retries += 1;
            tracing::warn!(operation, error = %error, "Session store call failed, retrying once");
            continue;
        }
        return Err(error);
    }
}

fn is_transient(error: &redis::RedisError) -> bool {
    error.is_io_error()
        || error.is_connection_dropped()
        || error.is_connection_refusal()
        || error.is_timeout()
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), StoreError> {
        // EX takes whole seconds; never round a sub-second TTL down to "no expiry"
        let seconds = ttl.as_secs().max(1);
        self.execute("set", |mut conn| async move {
            redis::cmd("SET")
                .arg(key)
                .arg(value)
                .arg("EX")
                .arg(seconds)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.execute("get", |mut conn| async move {
            redis::cmd("GET")
                .arg(key)
                .query_async::<_, Option<String>>(&mut conn)
                .await
        })
        .await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.execute("delete", |mut conn| async move {
            redis::cmd("DEL")
                .arg(key)
                .query_async::<_, ()>(&mut conn)
                .await
        })
        .await
    }
}
