/// Authentication module
///
/// Token policy and generation, credential checks, and the session
/// lifecycle: issue, refresh (rotation) and revoke.

mod claims;
mod credentials;
mod issuer;
mod jwt;
mod password;
mod policy;
mod refresher;
mod revoker;
mod service;
mod token;

pub use claims::Claims;
pub use credentials::CredentialValidator;
pub use issuer::{TokenIssuer, TokenPair};
pub use jwt::SignedTokenGenerator;
pub use password::{hash_cost_of, hash_password_with_cost, verify_password, HashCost, DEFAULT_HASH_COST};
pub use policy::{SessionKeys, TokenKind, TokenPolicy};
pub use refresher::TokenRefresher;
pub use revoker::SessionRevoker;
pub use service::AuthService;
pub use token::{generate_secure_token, generator_from_settings, OpaqueTokenGenerator, TokenGenerator};
