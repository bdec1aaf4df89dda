/// Request throttling
///
/// Per-client token buckets. A bucket holds `max_requests` tokens and refills
/// at `max_requests / window`, so a burst of `max_requests` inside one window
/// is accepted and the next request is refused until a token comes back.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ConfigError;

// full buckets carry no state, so they are dropped once the map grows this large
const PRUNE_THRESHOLD: usize = 10_000;

/// Configuration for one rate limit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitConfig {
    max_requests: u32,
    window: Duration,
}

impl RateLimitConfig {
    /// # Errors
    /// Returns error if either the request budget or the window is zero
    pub fn new(max_requests: u32, window: Duration) -> Result<Self, ConfigError> {
        if max_requests == 0 || window.is_zero() {
            return Err(ConfigError::InvalidValue(
                "rate limits need a positive request budget and window".to_string(),
            ));
        }
        Ok(Self {
            max_requests,
            window,
        })
    }

    /// 100 requests per minute per client on the auth endpoints
    pub fn general() -> Self {
        Self {
            max_requests: 100,
            window: Duration::from_secs(60),
        }
    }

    /// 5 login attempts per minute per client
    pub fn login() -> Self {
        Self {
            max_requests: 5,
            window: Duration::from_secs(60),
        }
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    // tokens per second
    fn refill_rate(&self) -> f64 {
        f64::from(self.max_requests) / self.window.as_secs_f64()
    }
}

struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            tokens: f64::from(config.max_requests),
            last_refill: now,
        }
    }

    fn refill(&mut self, config: &RateLimitConfig, now: Instant) {
        let elapsed = now.saturating_duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * config.refill_rate()).min(f64::from(config.max_requests));
        self.last_refill = now;
    }

    fn try_take(&mut self, config: &RateLimitConfig, now: Instant) -> Result<(), Duration> {
        self.refill(config, now);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            Ok(())
        } else {
            Err(Duration::from_secs_f64((1.0 - self.tokens) / config.refill_rate()))
        }
    }

    fn is_full(&self, config: &RateLimitConfig) -> bool {
        self.tokens >= f64::from(config.max_requests)
    }
}

/// Rate limiter tracking one bucket per client key (usually the peer IP)
#[derive(Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<HashMap<String, TokenBucket>>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Take one token from the client's bucket.
    ///
    /// # Errors
    /// Returns how long the client has to wait when its bucket is empty
    pub fn check(&self, client: &str) -> Result<(), Duration> {
        let config = self.config;
        let now = Instant::now();
        let mut buckets = self.buckets.lock().unwrap_or_else(PoisonError::into_inner);

        if buckets.len() >= PRUNE_THRESHOLD {
            buckets.retain(|_, bucket| {
                bucket.refill(&config, now);
                !bucket.is_full(&config)
            });
        }

        buckets
            .entry(client.to_string())
            .or_insert_with(|| TokenBucket::new(&config, now))
            .try_take(&config, now)
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.buckets.lock().unwrap_or_else(PoisonError::into_inner).len()
    }
}
