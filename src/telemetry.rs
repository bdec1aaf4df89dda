use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Install the JSON log subscriber.
///
/// `RUST_LOG` controls the level; `default_filter` applies when it is unset.
/// Records emitted through the `log` facade are forwarded as well. Calling
/// this twice is harmless: the second call reports an error and changes nothing.
pub fn init_telemetry(default_filter: &str) -> Result<(), tracing_subscriber::util::TryInitError> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));

    let formatting_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(true)
        .json();

    tracing_subscriber::registry()
        .with(env_filter)
        .with(formatting_layer)
        .try_init()
}
