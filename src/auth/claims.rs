/// Claims carried by signed session tokens.
///
/// Signed tokens are still registered in the session store and validated by
/// lookup; the claims only make the token self-describing for clients and
/// operators.

use serde::{Deserialize, Serialize};

use crate::auth::policy::TokenKind;
use crate::directory::UserId;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    /// Token kind prefix ("at" or "rt")
    pub typ: String,
    /// Unique token ID; keeps two tokens minted in the same second distinct
    pub jti: String,
    /// Issued at (Unix timestamp)
    pub iat: i64,
    /// Expiration time (Unix timestamp)
    pub exp: i64,
    pub iss: String,
}

impl Claims {
    pub fn new(
        user_id: UserId,
        email: String,
        kind: TokenKind,
        expiry_seconds: i64,
        issuer: String,
    ) -> Self {
        let now = chrono::Utc::now().timestamp();
        Self {
            sub: user_id.to_string(),
            email,
            typ: kind.prefix().to_string(),
            jti: uuid::Uuid::new_v4().to_string(),
            iat: now,
            exp: now + expiry_seconds,
            iss: issuer,
        }
    }
}
