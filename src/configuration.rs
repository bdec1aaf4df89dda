use std::time::Duration;

use crate::auth::{HashCost, SessionKeys, TokenPolicy};
use crate::error::ConfigError;
use crate::security::RateLimitConfig;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub redis: RedisSettings,
    pub token: TokenSettings,
    pub password: PasswordSettings,
    pub throttle: ThrottleSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    pub host: String,
    pub port: u16,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Session store connection settings
#[derive(serde::Deserialize, Clone)]
pub struct RedisSettings {
    pub url: String,
    /// Environment namespace prepended to every session key (e.g. "local", "prod")
    pub key_prefix: String,
    pub timeout_ms: u64,
}

impl RedisSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn session_keys(&self) -> Result<SessionKeys, ConfigError> {
        SessionKeys::new(&self.key_prefix)
    }
}

#[derive(serde::Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenRepresentation {
    Opaque,
    Signed,
}

/// Token lifetime and representation settings
#[derive(serde::Deserialize, Clone)]
pub struct TokenSettings {
    pub access_token_expiry: u64,   // seconds (e.g., 3600 for 1 hour)
    pub refresh_token_expiry: u64,  // seconds (e.g., 604800 for 7 days)
    pub representation: TokenRepresentation,
    pub signing_secret: Option<String>,
    pub issuer: String,
}

impl TokenSettings {
    pub fn policy(&self) -> Result<TokenPolicy, ConfigError> {
        TokenPolicy::new(
            Duration::from_secs(self.access_token_expiry),
            Duration::from_secs(self.refresh_token_expiry),
        )
    }
}

/// Password hashing settings
#[derive(serde::Deserialize, Clone)]
pub struct PasswordSettings {
    /// bcrypt cost the user directory hashes with; login timing depends on it matching
    pub hash_cost: u32,
}

impl PasswordSettings {
    pub fn cost(&self) -> Result<HashCost, ConfigError> {
        HashCost::new(self.hash_cost)
    }
}

/// Per-client request limits on the auth endpoints
#[derive(serde::Deserialize, Clone)]
pub struct ThrottleSettings {
    pub window_secs: u64,
    pub requests_per_window: u32,
    pub login_attempts_per_window: u32,
}

impl ThrottleSettings {
    /// Limits for (all auth endpoints, login)
    pub fn limits(&self) -> Result<(RateLimitConfig, RateLimitConfig), ConfigError> {
        let window = Duration::from_secs(self.window_secs);
        Ok((
            RateLimitConfig::new(self.requests_per_window, window)?,
            RateLimitConfig::new(self.login_attempts_per_window, window)?,
        ))
    }
}

/// Load settings from an optional `configuration.{yaml,toml,json}` file,
/// then from `APP_`-prefixed environment variables (`APP_REDIS__URL`, ...).
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let settings = config::Config::builder()
        .set_default("application.host", "127.0.0.1")?
        .set_default("application.port", 8080)?
        .set_default("redis.url", "redis://127.0.0.1:6379")?
        .set_default("redis.key_prefix", "local")?
        .set_default("redis.timeout_ms", 2000)?
        .set_default("token.access_token_expiry", 3600)?
        .set_default("token.refresh_token_expiry", 604800)?
        .set_default("token.representation", "opaque")?
        .set_default("token.issuer", "session_auth")?
        .set_default("password.hash_cost", 10)?
        .set_default("throttle.window_secs", 60)?
        .set_default("throttle.requests_per_window", 100)?
        .set_default("throttle.login_attempts_per_window", 5)?
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;
    settings.try_deserialize::<Settings>()
}
