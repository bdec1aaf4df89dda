use actix_web::dev::Server;
use actix_web::{error::JsonPayloadError, web, App, HttpRequest, HttpServer};
use std::net::TcpListener;
use std::sync::Arc;

use crate::auth::{AuthService, HashCost, SessionKeys, TokenGenerator, TokenPolicy};
use crate::directory::UserDirectory;
use crate::error::{AppError, ValidationError};
use crate::logger::LoggerMiddleware;
use crate::middleware::{AccessGuard, RateLimit, SessionGuard};
use crate::routes::{current_session, health_check, login, logout, refresh_token, withdraw};
use crate::security::{RateLimitConfig, RateLimiter};
use crate::session::SessionStore;

/// Everything the HTTP layer needs, wired from the two external collaborators.
#[derive(Clone)]
pub struct AppState {
    pub service: AuthService,
    pub guard: AccessGuard,
    pub general_limit: RateLimitConfig,
    pub login_limit: RateLimitConfig,
}

impl AppState {
    pub fn new(
        store: Arc<dyn SessionStore>,
        directory: Arc<dyn UserDirectory>,
        generator: Arc<dyn TokenGenerator>,
        keys: SessionKeys,
        policy: TokenPolicy,
        hash_cost: HashCost,
    ) -> Self {
        Self {
            service: AuthService::new(
                Arc::clone(&store),
                directory,
                generator,
                keys.clone(),
                policy,
                hash_cost,
            ),
            guard: AccessGuard::new(store, keys),
            general_limit: RateLimitConfig::general(),
            login_limit: RateLimitConfig::login(),
        }
    }

    /// Replace the default per-client limits (100/min on `/auth`, 5/min on login).
    pub fn with_rate_limits(mut self, general: RateLimitConfig, login: RateLimitConfig) -> Self {
        self.general_limit = general;
        self.login_limit = login;
        self
    }
}

// Body details may echo submitted secrets, so only the category is reported
fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let message = match err {
        JsonPayloadError::ContentType => "expected an application/json body",
        JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
            "body is too large"
        }
        _ => "missing or invalid fields",
    };
    AppError::Validation(ValidationError::MalformedBody(message.to_string())).into()
}

pub fn run(listener: TcpListener, state: AppState) -> Result<Server, std::io::Error> {
    let service = web::Data::new(state.service);
    let guard = state.guard;
    // shared by every worker so a client cannot multiply its budget
    let general_limiter = RateLimiter::new(state.general_limit);
    let login_limiter = RateLimiter::new(state.login_limit);

    let server = HttpServer::new(move || {
        App::new()
            .wrap(LoggerMiddleware)

            // Shared state
            .app_data(service.clone())
            .app_data(
                web::JsonConfig::default()
                    .limit(16 * 1024)
                    .error_handler(json_error_handler),
            )

            .route("/health_check", web::get().to(health_check))
            .service(
                web::scope("/auth")
                    .wrap(RateLimit::new(general_limiter.clone(), "auth"))
                    // Public routes
                    .service(
                        web::resource("/login")
                            .wrap(RateLimit::new(login_limiter.clone(), "login"))
                            .route(web::post().to(login)),
                    )
                    .route("/refresh-token", web::post().to(refresh_token))

                    // Protected routes (require an active session)
                    .service(
                        web::resource("/logout")
                            .wrap(SessionGuard::new(guard.clone()))
                            .route(web::post().to(logout)),
                    )
                    .service(
                        web::resource("/withdraw")
                            .wrap(SessionGuard::new(guard.clone()))
                            .route(web::post().to(withdraw)),
                    )
                    .service(
                        web::resource("/me")
                            .wrap(SessionGuard::new(guard.clone()))
                            .route(web::get().to(current_session)),
                    ),
            )
    })
    .listen(listener)?
    .run();

    Ok(server)
}
