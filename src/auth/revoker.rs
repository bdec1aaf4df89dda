/// Session Revocation (logout)

use std::sync::Arc;

use crate::auth::policy::SessionKeys;
use crate::directory::UserId;
use crate::error::{AppError, AuthError};
use crate::session::{token_fingerprint, SessionPayload, SessionStore};

#[derive(Clone)]
pub struct SessionRevoker {
    store: Arc<dyn SessionStore>,
    keys: SessionKeys,
}

impl SessionRevoker {
    pub fn new(store: Arc<dyn SessionStore>, keys: SessionKeys) -> Self {
        Self { store, keys }
    }

    /// Remove both entries of the session that owns `access_token`.
    ///
    /// # Errors
    /// - `AuthError::InvalidToken` if the token is unknown, expired, or belongs to another user
    /// - `AppError::Store` if the store cannot be read or either delete fails
    pub async fn revoke(&self, user_id: UserId, access_token: &str) -> Result<(), AppError> {
        let access_key = self.keys.access(access_token);
        let fingerprint = token_fingerprint(access_token);

        let raw = self.store.get(&access_key).await?.ok_or_else(|| {
            tracing::info!(user_id, access = %fingerprint, "Logout rejected: unknown or expired token");
            AuthError::InvalidToken
        })?;

        let payload = SessionPayload::decode(&raw).map_err(|e| {
            tracing::warn!(access = %fingerprint, error = %e, "Logout rejected: unreadable session payload");
            AuthError::InvalidToken
        })?;

        if payload.user_id != user_id || payload.access_token != access_token {
            tracing::warn!(user_id, access = %fingerprint, "Logout rejected: token does not belong to this user");
            return Err(AuthError::InvalidToken.into());
        }

        let refresh_key = self.keys.refresh(&payload.refresh_token);

        // both deletes always run, even if the caller goes away
        let access_delete = {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move { store.delete(&access_key).await })
        };
        let refresh_delete = {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move { store.delete(&refresh_key).await })
        };
        let (access_result, refresh_result) = tokio::join!(access_delete, refresh_delete);
        let (access_result, refresh_result) = (access_result?, refresh_result?);

        if let Err(e) = access_result.and(refresh_result) {
            tracing::error!(user_id, error = %e, "Logout could not remove every session entry");
            return Err(e.into());
        }

        tracing::info!(user_id, "Session revoked");
        Ok(())
    }
}
