use async_trait::async_trait;
use sqlx::PgPool;

use super::{Identity, UserDirectory, UserId};
use crate::error::DirectoryError;

const STATE_WITHDRAWN: &str = "WITHDRAWN";

/// User directory backed by the `users` table.
///
/// Expected columns: `id BIGINT`, `email TEXT UNIQUE`, `password TEXT` (bcrypt hash),
/// `state TEXT` (`ACTIVE` / `WITHDRAWN`), `updated_at TIMESTAMPTZ`.
#[derive(Clone)]
pub struct PgUserDirectory {
    pool: PgPool,
}

impl PgUserDirectory {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserDirectory for PgUserDirectory {
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, DirectoryError> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, email, password FROM users WHERE email = $1 AND state <> $2",
        )
        .bind(email)
        .bind(STATE_WITHDRAWN)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, password_hash)| Identity {
            id,
            email,
            password_hash,
        }))
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, DirectoryError> {
        let row = sqlx::query_as::<_, (i64, String, String)>(
            "SELECT id, email, password FROM users WHERE id = $1 AND state <> $2",
        )
        .bind(id)
        .bind(STATE_WITHDRAWN)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|(id, email, password_hash)| Identity {
            id,
            email,
            password_hash,
        }))
    }

    async fn deactivate(&self, id: UserId) -> Result<(), DirectoryError> {
        sqlx::query("UPDATE users SET state = $1, updated_at = now() WHERE id = $2")
            .bind(STATE_WITHDRAWN)
            .bind(id)
            .execute(&self.pool)
            .await?;

        tracing::info!(user_id = id, "User marked as withdrawn");
        Ok(())
    }
}
