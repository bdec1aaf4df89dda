/// Secure Token Generation
///
/// Token representation is pluggable: the rest of the session subsystem only
/// needs a unique, unguessable string per token.

use std::sync::Arc;

use rand::rngs::OsRng;
use rand::RngCore;

use crate::auth::jwt::SignedTokenGenerator;
use crate::auth::policy::{TokenKind, TokenPolicy};
use crate::configuration::{TokenRepresentation, TokenSettings};
use crate::directory::Identity;
use crate::error::{AppError, ConfigError};

/// Number of random bytes in an opaque token (256 bits).
pub const TOKEN_BYTES: usize = 32;

pub trait TokenGenerator: Send + Sync {
    /// Produce a fresh token of the given kind for `identity`.
    ///
    /// # Errors
    /// Returns error if the representation cannot be produced (e.g. signing fails)
    fn generate(&self, kind: TokenKind, identity: &Identity) -> Result<String, AppError>;
}

/// 32 bytes from the operating system CSPRNG, lowercase hex (64 characters).
#[derive(Debug, Default, Clone, Copy)]
pub struct OpaqueTokenGenerator;

impl TokenGenerator for OpaqueTokenGenerator {
    fn generate(&self, _kind: TokenKind, _identity: &Identity) -> Result<String, AppError> {
        Ok(generate_secure_token())
    }
}

pub fn generate_secure_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Build the generator selected in configuration.
///
/// # Errors
/// Returns error if the signed representation is selected without a usable secret
pub fn generator_from_settings(
    settings: &TokenSettings,
    policy: TokenPolicy,
) -> Result<Arc<dyn TokenGenerator>, ConfigError> {
    match settings.representation {
        TokenRepresentation::Opaque => Ok(Arc::new(OpaqueTokenGenerator)),
        TokenRepresentation::Signed => {
            let secret = settings
                .signing_secret
                .as_deref()
                .ok_or_else(|| ConfigError::MissingRequired("token.signing_secret".to_string()))?;
            let generator = SignedTokenGenerator::new(secret, settings.issuer.clone(), policy)?;
            Ok(Arc::new(generator))
        }
    }
}
