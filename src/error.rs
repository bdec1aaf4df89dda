/// Error Handling Module
///
/// Unified error handling for the authentication service:
/// 1. Domain-specific error types (validation, auth, session store, user directory, config)
/// 2. A central `AppError` used for control flow
/// 3. HTTP mapping into the `{statusCode, error, message}` body
/// 4. Structured logging that never includes secrets or token values

use actix_web::{
    error::ResponseError,
    http::{header::RETRY_AFTER, StatusCode},
    HttpResponse,
};
use std::error::Error as StdError;
use std::fmt;
use std::time::Duration;

/// ============================================================================
/// 1. DOMAIN-SPECIFIC ERROR TYPES
/// ============================================================================

/// Validation errors for request input
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField(&'static str),
    TooShort(&'static str, usize),
    TooLong(&'static str, usize),
    InvalidFormat(&'static str),
    MalformedBody(String),
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField(field) => write!(f, "{} is empty", field),
            ValidationError::TooShort(field, min) => {
                write!(f, "{} is too short (minimum {} characters)", field, min)
            }
            ValidationError::TooLong(field, max) => {
                write!(f, "{} is too long (maximum {} characters)", field, max)
            }
            ValidationError::InvalidFormat(field) => write!(f, "{} has invalid format", field),
            ValidationError::MalformedBody(msg) => write!(f, "Malformed request body: {}", msg),
        }
    }
}

impl StdError for ValidationError {}

/// Authentication and session errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthError {
    /// Unknown email or wrong password. The two cases are never distinguished.
    AuthenticationFailed,
    /// Access token missing from the store, expired, revoked or mismatched.
    InvalidToken,
    /// Refresh token missing from the store, expired, rotated or mismatched.
    InvalidRefreshToken,
    /// No `Authorization: Bearer <token>` header.
    MissingToken,
    /// The identity behind a session no longer exists.
    UserNotFound,
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuthError::AuthenticationFailed => write!(f, "Invalid email or password"),
            AuthError::InvalidToken => write!(f, "Invalid token"),
            AuthError::InvalidRefreshToken => write!(f, "Invalid refresh token"),
            AuthError::MissingToken => write!(f, "Authentication token required"),
            AuthError::UserNotFound => write!(f, "User not found"),
        }
    }
}

impl StdError for AuthError {}

/// Session store (key-value) errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    Unavailable(String),
    Timeout(Duration),
}

impl fmt::Display for StoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StoreError::Unavailable(msg) => write!(f, "Session store unavailable: {}", msg),
            StoreError::Timeout(after) => {
                write!(f, "Session store timed out after {}ms", after.as_millis())
            }
        }
    }
}

impl StdError for StoreError {}

/// User directory errors
#[derive(Debug)]
pub enum DirectoryError {
    Unavailable(String),
    Query(String),
}

impl fmt::Display for DirectoryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectoryError::Unavailable(msg) => write!(f, "User directory unavailable: {}", msg),
            DirectoryError::Query(msg) => write!(f, "User directory query error: {}", msg),
        }
    }
}

impl StdError for DirectoryError {}

/// Configuration errors
#[derive(Debug)]
pub enum ConfigError {
    MissingRequired(String),
    InvalidValue(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::MissingRequired(msg) => write!(f, "Missing required config: {}", msg),
            ConfigError::InvalidValue(msg) => write!(f, "Invalid config value: {}", msg),
        }
    }
}

impl StdError for ConfigError {}

/// ============================================================================
/// 2. UNIFIED APPLICATION ERROR TYPE
/// ============================================================================

#[derive(Debug)]
pub enum AppError {
    Validation(ValidationError),
    Auth(AuthError),
    Store(StoreError),
    Directory(DirectoryError),
    /// Client exceeded its request budget; carries the suggested wait
    RateLimited(Duration),
    Internal(String),
}

impl AppError {
    /// The authentication error carried by this error, if any.
    pub fn auth_kind(&self) -> Option<AuthError> {
        match self {
            AppError::Auth(e) => Some(*e),
            _ => None,
        }
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(e) => write!(f, "{}", e),
            AppError::Auth(e) => write!(f, "{}", e),
            AppError::Store(e) => write!(f, "{}", e),
            AppError::Directory(e) => write!(f, "{}", e),
            AppError::RateLimited(_) => write!(f, "Too many requests"),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl StdError for AppError {}

impl From<ValidationError> for AppError {
    fn from(err: ValidationError) -> Self {
        AppError::Validation(err)
    }
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        AppError::Auth(err)
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        AppError::Store(err)
    }
}

impl From<DirectoryError> for AppError {
    fn from(err: DirectoryError) -> Self {
        AppError::Directory(err)
    }
}

impl From<sqlx::Error> for DirectoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_) => {
                DirectoryError::Unavailable(err.to_string())
            }
            _ => DirectoryError::Query(err.to_string()),
        }
    }
}

impl From<redis::RedisError> for StoreError {
    fn from(err: redis::RedisError) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

impl From<tokio::task::JoinError> for AppError {
    fn from(err: tokio::task::JoinError) -> Self {
        AppError::Internal(format!("Background task failed: {}", err))
    }
}

// ============================================================================
// 3. HTTP RESPONSE MAPPING
// ============================================================================

/// Error body returned to clients
#[derive(Debug, serde::Serialize, serde::Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub status_code: u16,
    pub error: String,
    pub message: String,
}

impl ErrorResponse {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            error: status
                .canonical_reason()
                .unwrap_or("Unknown Error")
                .to_string(),
            message: message.into(),
        }
    }
}

/// Trait for converting errors to HTTP responses with proper logging
pub trait ErrorHandler {
    fn error_response(&self) -> (StatusCode, ErrorResponse);
    fn log_error(&self, request_id: &str);
}

impl ErrorHandler for AppError {
    fn error_response(&self) -> (StatusCode, ErrorResponse) {
        let status = ResponseError::status_code(self);
        let message = match self {
            AppError::Validation(e) => e.to_string(),
            AppError::Auth(e) => e.to_string(),
            AppError::Store(_) => "Session service temporarily unavailable".to_string(),
            AppError::Directory(_) => "User service temporarily unavailable".to_string(),
            AppError::RateLimited(_) => "Too many requests, try again later".to_string(),
            AppError::Internal(_) => "Internal server error".to_string(),
        };

        (status, ErrorResponse::new(status, message))
    }

    fn log_error(&self, request_id: &str) {
        match self {
            AppError::Validation(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Validation error");
            }
            AppError::Auth(e) => {
                tracing::warn!(request_id = request_id, error = %e, "Authentication error");
            }
            AppError::Store(e) => {
                tracing::error!(request_id = request_id, error = %e, "Session store error");
            }
            AppError::Directory(e) => {
                tracing::error!(request_id = request_id, error = %e, "User directory error");
            }
            AppError::RateLimited(retry_after) => {
                tracing::warn!(
                    request_id = request_id,
                    retry_after_secs = retry_after.as_secs(),
                    "Rate limit exceeded"
                );
            }
            AppError::Internal(msg) => {
                tracing::error!(request_id = request_id, error = %msg, "Internal error");
            }
        }
    }
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        let request_id = uuid::Uuid::new_v4().to_string();
        self.log_error(&request_id);

        let (status, body) = <Self as ErrorHandler>::error_response(self);
        let mut response = HttpResponse::build(status);
        if let AppError::RateLimited(retry_after) = self {
            // whole seconds, never 0
            response.insert_header((RETRY_AFTER, retry_after.as_secs().max(1).to_string()));
        }
        response.json(body)
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Auth(AuthError::UserNotFound) => StatusCode::NOT_FOUND,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Store(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Directory(DirectoryError::Unavailable(_)) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Directory(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::RateLimited(_) => StatusCode::TOO_MANY_REQUESTS,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("email");
        assert_eq!(err.to_string(), "email is empty");
    }

    #[test]
    fn test_auth_errors_map_to_401_except_user_not_found() {
        for kind in [
            AuthError::AuthenticationFailed,
            AuthError::InvalidToken,
            AuthError::InvalidRefreshToken,
            AuthError::MissingToken,
        ] {
            assert_eq!(
                ResponseError::status_code(&AppError::Auth(kind)),
                StatusCode::UNAUTHORIZED
            );
        }
        assert_eq!(
            ResponseError::status_code(&AppError::Auth(AuthError::UserNotFound)),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn test_store_errors_are_service_unavailable() {
        let err: AppError = StoreError::Timeout(Duration::from_millis(50)).into();
        let (status, body) = ErrorHandler::error_response(&err);

        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(body.status_code, 503);
        assert_eq!(body.error, "Service Unavailable");
        // infrastructure details stay in the logs
        assert!(!body.message.contains("50ms"));
    }

    #[test]
    fn test_error_response_shape() {
        let err = AppError::Auth(AuthError::AuthenticationFailed);
        let (_, body) = ErrorHandler::error_response(&err);
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["statusCode"], 401);
        assert_eq!(json["error"], "Unauthorized");
        assert_eq!(json["message"], "Invalid email or password");
    }

    #[test]
    fn test_rate_limited_is_429_with_retry_after() {
        let err = AppError::RateLimited(Duration::from_millis(300));
        let (status, body) = ErrorHandler::error_response(&err);
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body.error, "Too Many Requests");

        let response = ResponseError::error_response(&err);
        assert_eq!(response.headers().get(RETRY_AFTER).unwrap(), "1");
    }

    #[test]
    fn test_auth_kind() {
        assert_eq!(
            AppError::Auth(AuthError::InvalidToken).auth_kind(),
            Some(AuthError::InvalidToken)
        );
        assert_eq!(AppError::Internal("x".to_string()).auth_kind(), None);
    }
}
