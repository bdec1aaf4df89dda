mod auth;
mod health_check;

pub use auth::{current_session, login, logout, refresh_token, withdraw};
pub use health_check::health_check;
