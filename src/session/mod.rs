/// Session storage
///
/// The key-value store abstraction that is the source of truth for active
/// sessions, its Redis and in-memory implementations, and the stored payload.

#[cfg(test)]
mod faulty_store;
mod memory_store;
mod payload;
mod redis_store;
mod store;

pub use memory_store::InMemorySessionStore;
pub use payload::{token_fingerprint, SessionPayload};
pub use redis_store::RedisSessionStore;
pub use store::SessionStore;

#[cfg(test)]
pub(crate) use faulty_store::{FaultyStore, WriteFault};
