/// Signed (JWT) token representation
///
/// Alternative to opaque tokens: HS256-signed claims. Validity is still
/// decided by the session store, so these tokens are revocable like any other.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};

use crate::auth::claims::Claims;
use crate::auth::policy::{TokenKind, TokenPolicy};
use crate::auth::token::TokenGenerator;
use crate::directory::Identity;
use crate::error::{AppError, ConfigError};

const MIN_SECRET_LENGTH: usize = 32;

pub struct SignedTokenGenerator {
    encoding_key: EncodingKey,
    issuer: String,
    policy: TokenPolicy,
}

impl SignedTokenGenerator {
    /// # Errors
    /// Returns error if the secret is shorter than 32 bytes
    pub fn new(secret: &str, issuer: String, policy: TokenPolicy) -> Result<Self, ConfigError> {
        if secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "token.signing_secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            issuer,
            policy,
        })
    }
}

impl TokenGenerator for SignedTokenGenerator {
    fn generate(&self, kind: TokenKind, identity: &Identity) -> Result<String, AppError> {
        let expiry = i64::try_from(self.policy.ttl(kind).as_secs())
            .map_err(|_| AppError::Internal("Token expiry out of range".to_string()))?;
        let claims = Claims::new(
            identity.id,
            identity.email.clone(),
            kind,
            expiry,
            self.issuer.clone(),
        );

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Token generation failed: {}", e)))
    }
}
