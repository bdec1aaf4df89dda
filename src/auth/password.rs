/// Password Hashing and Verification
///
/// bcrypt hashes are salted and verified in constant time over the digest.

use bcrypt::{hash, verify};

use crate::error::{AppError, ConfigError, ValidationError};

// bcrypt only reads the first 72 bytes; longer inputs are rejected outright
const MAX_PASSWORD_LENGTH: usize = 72;

const MIN_HASH_COST: u32 = 4;
const MAX_HASH_COST: u32 = 31;

/// Cost the user directory hashes passwords with.
pub const DEFAULT_HASH_COST: u32 = 10;

/// bcrypt work factor shared by stored hashes and the login timing equalizer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashCost(u32);

impl HashCost {
    /// # Errors
    /// Returns error if the cost is outside the range bcrypt accepts (4..=31)
    pub fn new(cost: u32) -> Result<Self, ConfigError> {
        if !(MIN_HASH_COST..=MAX_HASH_COST).contains(&cost) {
            return Err(ConfigError::InvalidValue(format!(
                "password.hash_cost must be between {} and {}",
                MIN_HASH_COST, MAX_HASH_COST
            )));
        }
        Ok(Self(cost))
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl Default for HashCost {
    fn default() -> Self {
        Self(DEFAULT_HASH_COST)
    }
}

/// Hash with an explicit bcrypt cost. Low costs are only for tests and fixtures.
///
/// # Errors
/// Returns error if the password is empty or too long, or hashing fails
pub fn hash_password_with_cost(password: &str, cost: u32) -> Result<String, AppError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password").into());
    }
    if password.len() > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_LENGTH).into());
    }

    hash(password, cost).map_err(|e| AppError::Internal(format!("Password hashing failed: {}", e)))
}

/// Verify a password against its hash
///
/// # Errors
/// Returns error if the stored hash is malformed
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash)
        .map_err(|e| AppError::Internal(format!("Password verification failed: {}", e)))
}

/// Work factor encoded in a bcrypt hash (`$2b$NN$...`).
pub fn hash_cost_of(hash: &str) -> Option<u32> {
    hash.split('$').nth(2)?.parse().ok()
}
