/// Token Refresh (rotation)
///
/// Exchanges a live refresh token for a brand-new session. The superseded
/// pair is removed from the store once the new pair is durable.

use std::sync::Arc;

use crate::auth::issuer::{TokenIssuer, TokenPair};
use crate::auth::policy::SessionKeys;
use crate::directory::{UserDirectory, UserId};
use crate::error::{AppError, AuthError};
use crate::session::{token_fingerprint, SessionPayload, SessionStore};

#[derive(Clone)]
pub struct TokenRefresher {
    store: Arc<dyn SessionStore>,
    directory: Arc<dyn UserDirectory>,
    issuer: TokenIssuer,
    keys: SessionKeys,
}

impl TokenRefresher {
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
        issuer: TokenIssuer,
        keys: SessionKeys,
    ) -> Self {
        Self {
            store,
            directory,
            issuer,
            keys,
        }
    }

    /// # Errors
    /// - `AuthError::InvalidRefreshToken` if the token is unknown, expired, or issued to another user
    /// - `AuthError::UserNotFound` if the user no longer exists
    /// - `AppError::Store` / `AppError::Directory` on infrastructure faults
    pub async fn refresh(&self, user_id: UserId, refresh_token: &str) -> Result<TokenPair, AppError> {
        let refresh_key = self.keys.refresh(refresh_token);
        let fingerprint = token_fingerprint(refresh_token);

        let raw = self.store.get(&refresh_key).await?.ok_or_else(|| {
            tracing::info!(user_id, refresh = %fingerprint, "Refresh rejected: unknown or expired token");
            AuthError::InvalidRefreshToken
        })?;

        let payload = SessionPayload::decode(&raw).map_err(|e| {
            tracing::warn!(refresh = %fingerprint, error = %e, "Refresh rejected: unreadable session payload");
            AuthError::InvalidRefreshToken
        })?;

        if payload.refresh_token != refresh_token || payload.user_id != user_id {
            tracing::warn!(
                user_id,
                refresh = %fingerprint,
                "Refresh rejected: token does not belong to this user"
            );
            return Err(AuthError::InvalidRefreshToken.into());
        }

        let identity = self.directory.find_by_id(payload.user_id).await?.ok_or_else(|| {
            tracing::info!(user_id, "Refresh rejected: user no longer exists");
            AuthError::UserNotFound
        })?;

        let pair = self.issuer.issue(&identity).await?;
        self.retire(&payload).await;

        tracing::info!(user_id, "Session rotated");
        Ok(pair)
    }

    /// Delete both entries of the superseded session. Failures only leave the
    /// old entries to lapse with their TTL, so they are logged, not returned.
    async fn retire(&self, old: &SessionPayload) {
        let access_key = self.keys.access(&old.access_token);
        let refresh_key = self.keys.refresh(&old.refresh_token);

        let access_delete = {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move { store.delete(&access_key).await })
        };
        let refresh_delete = {
            let store = Arc::clone(&self.store);
            tokio::spawn(async move { store.delete(&refresh_key).await })
        };

        let (access_result, refresh_result) = tokio::join!(access_delete, refresh_delete);
        for result in [access_result, refresh_result] {
            match result {
                Ok(Ok(())) => {}
                Ok(Err(e)) => tracing::warn!(
                    user_id = old.user_id,
                    error = %e,
                    "Could not remove superseded session entry"
                ),
                Err(e) => tracing::warn!(
                    user_id = old.user_id,
                    error = %e,
                    "Superseded session cleanup task failed"
                ),
            }
        }
    }
}
