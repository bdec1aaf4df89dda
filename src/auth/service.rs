/// Authentication service
///
/// Entry points used by the HTTP routes: login, refresh, logout and
/// account withdrawal.

use std::sync::Arc;

use crate::auth::credentials::CredentialValidator;
use crate::auth::issuer::{TokenIssuer, TokenPair};
use crate::auth::password::HashCost;
use crate::auth::policy::{SessionKeys, TokenPolicy};
use crate::auth::refresher::TokenRefresher;
use crate::auth::revoker::SessionRevoker;
use crate::auth::token::TokenGenerator;
use crate::directory::{UserDirectory, UserId};
use crate::error::AppError;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AuthService {
    credentials: CredentialValidator,
    issuer: TokenIssuer,
    refresher: TokenRefresher,
    revoker: SessionRevoker,
    directory: Arc<dyn UserDirectory>,
}

impl AuthService {
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
        generator: Arc<dyn TokenGenerator>,
        keys: SessionKeys,
        policy: TokenPolicy,
        hash_cost: HashCost,
    ) -> Self {
        let issuer = TokenIssuer::new(Arc::clone(&store), generator, keys.clone(), policy);
        let refresher = TokenRefresher::new(
            Arc::clone(&store),
            Arc::clone(&directory),
            issuer.clone(),
            keys.clone(),
        );
        let revoker = SessionRevoker::new(store, keys);

        Self {
            credentials: CredentialValidator::new(Arc::clone(&directory), hash_cost),
            issuer,
            refresher,
            revoker,
            directory,
        }
    }

    pub fn policy(&self) -> TokenPolicy {
        self.issuer.policy()
    }

    /// Verify credentials and open a new session.
    pub async fn login(&self, email: &str, password: &str) -> Result<TokenPair, AppError> {
        let identity = self.credentials.validate(email, password).await?;
        let pair = self.issuer.issue(&identity).await?;

        tracing::info!(user_id = identity.id, "User logged in");
        Ok(pair)
    }

    /// Rotate a session using its refresh token.
    pub async fn refresh(&self, user_id: UserId, refresh_token: &str) -> Result<TokenPair, AppError> {
        self.refresher.refresh(user_id, refresh_token).await
    }

    /// Close the session that owns `access_token`.
    pub async fn logout(&self, user_id: UserId, access_token: &str) -> Result<(), AppError> {
        self.revoker.revoke(user_id, access_token).await
    }

    /// Close the current session and deactivate the account.
    pub async fn withdraw(&self, user_id: UserId, access_token: &str) -> Result<(), AppError> {
        self.revoker.revoke(user_id, access_token).await?;
        self.directory.deactivate(user_id).await?;

        tracing::info!(user_id, "User withdrawn");
        Ok(())
    }
}
