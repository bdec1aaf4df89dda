/// Token Policy
///
/// Expiry windows for the two token kinds and the key namespace used to
/// register them in the session store.

use std::fmt;
use std::time::Duration;

use crate::error::ConfigError;

pub const DEFAULT_ACCESS_TOKEN_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_REFRESH_TOKEN_TTL: Duration = Duration::from_secs(604_800);

const KEY_SEPARATOR: char = ':';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    /// Short prefix identifying the token kind inside a store key.
    pub fn prefix(self) -> &'static str {
        match self {
            TokenKind::Access => "at",
            TokenKind::Refresh => "rt",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Access => write!(f, "access"),
            TokenKind::Refresh => write!(f, "refresh"),
        }
    }
}

/// Lifetimes of access and refresh tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenPolicy {
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl TokenPolicy {
    /// # Errors
    /// Returns error if either TTL is zero or the refresh TTL does not exceed the access TTL
    pub fn new(access_ttl: Duration, refresh_ttl: Duration) -> Result<Self, ConfigError> {
        if access_ttl.is_zero() || refresh_ttl.is_zero() {
            return Err(ConfigError::InvalidValue(
                "token expiry must be greater than zero".to_string(),
            ));
        }
        if refresh_ttl <= access_ttl {
            return Err(ConfigError::InvalidValue(
                "refresh token expiry must exceed access token expiry".to_string(),
            ));
        }
        Ok(Self {
            access_ttl,
            refresh_ttl,
        })
    }

    pub fn access_ttl(&self) -> Duration {
        self.access_ttl
    }

    pub fn refresh_ttl(&self) -> Duration {
        self.refresh_ttl
    }

    pub fn ttl(&self, kind: TokenKind) -> Duration {
        match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        }
    }
}

impl Default for TokenPolicy {
    fn default() -> Self {
        Self {
            access_ttl: DEFAULT_ACCESS_TOKEN_TTL,
            refresh_ttl: DEFAULT_REFRESH_TOKEN_TTL,
        }
    }
}

/// Builds `{environment}:{kind}:{token}` session store keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionKeys {
    environment: String,
}

impl SessionKeys {
    /// # Errors
    /// Returns error if the environment prefix is empty or contains the key separator
    pub fn new(environment: &str) -> Result<Self, ConfigError> {
        let environment = environment.trim();
        if environment.is_empty() {
            return Err(ConfigError::MissingRequired("redis.key_prefix".to_string()));
        }
        if environment.contains(KEY_SEPARATOR) {
            return Err(ConfigError::InvalidValue(format!(
                "redis.key_prefix must not contain '{}'",
                KEY_SEPARATOR
            )));
        }
        Ok(Self {
            environment: environment.to_string(),
        })
    }

    pub fn environment(&self) -> &str {
        &self.environment
    }

    pub fn key(&self, kind: TokenKind, token: &str) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.environment,
            kind.prefix(),
            token,
            sep = KEY_SEPARATOR
        )
    }

    pub fn access(&self, token: &str) -> String {
        self.key(TokenKind::Access, token)
    }

    pub fn refresh(&self, token: &str) -> String {
        self.key(TokenKind::Refresh, token)
    }
}
