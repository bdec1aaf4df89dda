/// Token Issuance
///
/// Mints an access/refresh pair and registers both sides of the session in
/// the store. Either both entries are written or the issuance fails.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::auth::policy::{SessionKeys, TokenKind, TokenPolicy};
use crate::auth::token::TokenGenerator;
use crate::directory::Identity;
use crate::error::{AppError, StoreError};
use crate::session::{token_fingerprint, SessionPayload, SessionStore};

/// Access and refresh token handed back to a client
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair")
            .field("access_token", &token_fingerprint(&self.access_token))
            .field("refresh_token", &token_fingerprint(&self.refresh_token))
            .finish()
    }
}

#[derive(Clone)]
pub struct TokenIssuer {
    store: Arc<dyn SessionStore>,
    generator: Arc<dyn TokenGenerator>,
    keys: SessionKeys,
    policy: TokenPolicy,
}

impl TokenIssuer {
    pub fn new(
        store: Arc<dyn SessionStore>,
        generator: Arc<dyn TokenGenerator>,
        keys: SessionKeys,
        policy: TokenPolicy,
    ) -> Self {
        Self {
            store,
            generator,
            keys,
            policy,
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.policy
    }

    /// Mint a new session for `identity`.
    ///
    /// # Errors
    /// - `AppError::Store` if either entry could not be written
    /// - `AppError::Internal` if token generation or payload encoding fails
    pub async fn issue(&self, identity: &Identity) -> Result<TokenPair, AppError> {
        let access_token = self.generator.generate(TokenKind::Access, identity)?;
        let refresh_token = self.generator.generate(TokenKind::Refresh, identity)?;

        let payload = SessionPayload {
            user_id: identity.id,
            email: identity.email.clone(),
            access_token: access_token.clone(),
            refresh_token: refresh_token.clone(),
        };
        let value = payload
            .encode()
            .map_err(|e| AppError::Internal(format!("Session payload encoding failed: {}", e)))?;

        let access_key = self.keys.access(&access_token);
        let refresh_key = self.keys.refresh(&refresh_token);

        // spawned so that a dropped request cannot leave half a session behind
        let access_write = self.spawn_set(access_key.clone(), value.clone(), self.policy.access_ttl());
        let refresh_write = self.spawn_set(refresh_key.clone(), value, self.policy.refresh_ttl());
        let (access_result, refresh_result) = tokio::join!(access_write, refresh_write);

        // settle both before deciding; a crashed write task counts as a failed write
        let access_result = settle(access_result);
        let refresh_result = settle(refresh_result);
        if let Err(e) = access_result.and(refresh_result) {
            self.discard([access_key, refresh_key]).await;
            return Err(e);
        }

        tracing::info!(
            user_id = identity.id,
            access = %token_fingerprint(&access_token),
            "Session issued"
        );

        Ok(TokenPair {
            access_token,
            refresh_token,
        })
    }

    fn spawn_set(
        &self,
        key: String,
        value: String,
        ttl: Duration,
    ) -> tokio::task::JoinHandle<Result<(), StoreError>> {
        let store = Arc::clone(&self.store);
        tokio::spawn(async move { store.set(&key, &value, ttl).await })
    }

    /// Remove whatever half of a failed issuance landed. Runs as its own task
    /// so that a dropped caller cannot stop the rollback.
    async fn discard(&self, keys: [String; 2]) {
        let store = Arc::clone(&self.store);
        let cleanup = tokio::spawn(async move {
            let [access_key, refresh_key] = keys;
            let (access, refresh) =
                tokio::join!(store.delete(&access_key), store.delete(&refresh_key));
            access.and(refresh)
        });

        match cleanup.await {
            Ok(Ok(())) => tracing::warn!("Session issuance failed; rolled back the written half"),
            Ok(Err(e)) => tracing::error!(
                error = %e,
                "Session issuance failed and the written half could not be removed; it will lapse with its TTL"
            ),
            Err(e) => tracing::error!(error = %e, "Session issuance rollback task failed"),
        }
    }
}

fn settle(result: Result<Result<(), StoreError>, tokio::task::JoinError>) -> Result<(), AppError> {
    Ok(result??)
}
