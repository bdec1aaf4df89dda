/// User directory
///
/// Read access to stored credentials. The authentication core never writes
/// to the directory except through `deactivate` on account withdrawal.

mod memory;
mod postgres;

use std::fmt;

use async_trait::async_trait;

use crate::error::DirectoryError;

pub use memory::InMemoryUserDirectory;
pub use postgres::PgUserDirectory;

pub type UserId = i64;

/// A stored user as seen by the authentication core
#[derive(Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: UserId,
    pub email: String,
    pub password_hash: String,
}

impl fmt::Debug for Identity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Identity")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .finish()
    }
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Active user with this email, if any.
    async fn find_by_email(&self, email: &str) -> Result<Option<Identity>, DirectoryError>;

    /// Active user with this id, if any.
    async fn find_by_id(&self, id: UserId) -> Result<Option<Identity>, DirectoryError>;

    /// Mark the account withdrawn. Withdrawn users are no longer returned by lookups.
    async fn deactivate(&self, id: UserId) -> Result<(), DirectoryError>;
}
