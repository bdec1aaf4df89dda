/// Input validators for authentication requests
///
/// Rejects malformed input with a 400 before any credential or session
/// lookup happens. Length limits also bound the work done per request.

use lazy_static::lazy_static;
use regex::Regex;

use crate::error::ValidationError;

const MAX_EMAIL_LENGTH: usize = 254; // RFC 5321
const MIN_EMAIL_LENGTH: usize = 3;
const MAX_TOKEN_LENGTH: usize = 2048;

lazy_static! {
    // RFC 5322 simplified email regex (practical validation)
    static ref EMAIL_REGEX: Option<Regex> = Regex::new(
        r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$"
    ).ok();
}

/// Validates an email address and returns it trimmed
pub fn is_valid_email(email: &str) -> Result<String, ValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField("email"));
    }

    if trimmed.len() < MIN_EMAIL_LENGTH {
        return Err(ValidationError::TooShort("email", MIN_EMAIL_LENGTH));
    }

    if trimmed.len() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong("email", MAX_EMAIL_LENGTH));
    }

    match EMAIL_REGEX.as_ref() {
        Some(regex) if regex.is_match(trimmed) => Ok(trimmed.to_string()),
        _ => Err(ValidationError::InvalidFormat("email")),
    }
}

/// Passwords are only checked for presence; strength rules belong to registration.
pub fn is_present_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }
    Ok(())
}

/// Tokens are opaque; only presence and a sane upper bound are enforced.
pub fn is_valid_token_input(field: &'static str, token: &str) -> Result<(), ValidationError> {
    if token.trim().is_empty() {
        return Err(ValidationError::EmptyField(field));
    }
    if token.len() > MAX_TOKEN_LENGTH {
        return Err(ValidationError::TooLong(field, MAX_TOKEN_LENGTH));
    }
    Ok(())
}
