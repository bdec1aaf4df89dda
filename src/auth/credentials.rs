/// Credential Validation
///
/// Verifies an email/password pair against the user directory.

use std::sync::Arc;

use crate::auth::password::{hash_cost_of, hash_password_with_cost, verify_password, HashCost};
use crate::directory::{Identity, UserDirectory};
use crate::error::{AppError, AuthError};

const EQUALIZER_PASSWORD: &str = "timing-equalizer-password";

#[derive(Clone)]
pub struct CredentialValidator {
    directory: Arc<dyn UserDirectory>,
    hash_cost: HashCost,
    // compared against when the email is unknown so both failure paths pay for one verify at the same cost
    equalizer_hash: Option<Arc<str>>,
}

impl CredentialValidator {
    /// `hash_cost` must match the cost the directory hashes passwords with.
    pub fn new(directory: Arc<dyn UserDirectory>, hash_cost: HashCost) -> Self {
        let equalizer_hash = match hash_password_with_cost(EQUALIZER_PASSWORD, hash_cost.get()) {
            Ok(hash) => Some(Arc::from(hash)),
            Err(e) => {
                tracing::error!(error = %e, "Could not build the login timing equalizer hash");
                None
            }
        };

        Self {
            directory,
            hash_cost,
            equalizer_hash,
        }
    }

    /// Resolve the identity owning `email` if `password` matches its stored hash.
    ///
    /// # Errors
    /// - `AuthError::AuthenticationFailed` for an unknown email or a wrong password
    /// - `AppError::Directory` if the directory cannot be reached
    pub async fn validate(&self, email: &str, password: &str) -> Result<Identity, AppError> {
        let identity = self.directory.find_by_email(email).await?;

        let stored_hash: Option<Arc<str>> = match &identity {
            Some(identity) => {
                if hash_cost_of(&identity.password_hash) != Some(self.hash_cost.get()) {
                    tracing::warn!(
                        user_id = identity.id,
                        configured_cost = self.hash_cost.get(),
                        "Stored password hash uses a different cost than configured"
                    );
                }
                Some(Arc::from(identity.password_hash.as_str()))
            }
            None => self.equalizer_hash.clone(),
        };
        let password = password.to_string();

        let matches = match stored_hash {
            Some(hash) => {
                tokio::task::spawn_blocking(move || verify_password(&password, &hash)).await?
            }
            None => Ok(false),
        };

        match (identity, matches) {
            (None, _) => {
                tracing::info!("Login rejected: unknown email");
                Err(AuthError::AuthenticationFailed.into())
            }
            (Some(identity), Ok(true)) => Ok(identity),
            (Some(identity), Ok(false)) => {
                tracing::info!(user_id = identity.id, "Login rejected: wrong password");
                Err(AuthError::AuthenticationFailed.into())
            }
            (Some(identity), Err(e)) => {
                tracing::error!(user_id = identity.id, error = %e, "Stored password hash is unusable");
                Err(AuthError::AuthenticationFailed.into())
            }
        }
    }

    #[cfg(test)]
    fn equalizer_cost(&self) -> Option<u32> {
        self.equalizer_hash.as_deref().and_then(hash_cost_of)
    }
}
