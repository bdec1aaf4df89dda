/// Middleware module
///
/// Session authentication for protected scopes and per-client rate limits.

mod rate_limit;
mod session_guard;

pub use rate_limit::RateLimit;
pub use session_guard::{extract_bearer_token, AccessGuard, AuthenticatedSession, SessionGuard};
