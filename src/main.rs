use std::net::TcpListener;
use std::sync::Arc;

use session_auth::auth::generator_from_settings;
use session_auth::configuration::get_configuration;
use session_auth::directory::PgUserDirectory;
use session_auth::session::RedisSessionStore;
use session_auth::startup::{run, AppState};
use session_auth::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;

fn startup_error(kind: std::io::ErrorKind, what: &str) -> std::io::Error {
    std::io::Error::new(kind, what.to_string())
}

#[tokio::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = init_telemetry("info") {
        eprintln!("Failed to install log subscriber: {}", e);
    }

    let configuration = get_configuration().map_err(|e| {
        tracing::error!("Failed to read configuration: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;

    let policy = configuration.token.policy().map_err(|e| {
        tracing::error!("Invalid token policy: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    let keys = configuration.redis.session_keys().map_err(|e| {
        tracing::error!("Invalid session key prefix: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    let generator = generator_from_settings(&configuration.token, policy).map_err(|e| {
        tracing::error!("Invalid token representation settings: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    let hash_cost = configuration.password.cost().map_err(|e| {
        tracing::error!("Invalid password settings: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    let (general_limit, login_limit) = configuration.throttle.limits().map_err(|e| {
        tracing::error!("Invalid throttle settings: {}", e);
        startup_error(std::io::ErrorKind::InvalidInput, "Configuration error")
    })?;
    tracing::info!(
        environment = keys.environment(),
        access_ttl = policy.access_ttl().as_secs(),
        refresh_ttl = policy.refresh_ttl().as_secs(),
        representation = ?configuration.token.representation,
        "Token policy loaded"
    );

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&configuration.database.connection_string())
        .await
        .map_err(|e| {
            tracing::error!("Failed to create connection pool: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Database connection error")
        })?;
    tracing::info!("Database connection pool created");

    let store = RedisSessionStore::connect(&configuration.redis)
        .await
        .map_err(|e| {
            tracing::error!("Failed to connect to session store: {}", e);
            startup_error(std::io::ErrorKind::ConnectionRefused, "Session store connection error")
        })?;

    let state = AppState::new(
        Arc::new(store),
        Arc::new(PgUserDirectory::new(pool)),
        generator,
        keys,
        policy,
        hash_cost,
    )
    .with_rate_limits(general_limit, login_limit);

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    run(listener, state)?.await
}
