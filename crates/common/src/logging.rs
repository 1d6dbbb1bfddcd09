use crate::config::Environment;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Installs the global tracing subscriber: pretty ANSI output in development,
/// JSON lines in production.
///
/// Filtering comes from `RUST_LOG` (default "info"). An OpenTelemetry layer is
/// attached unconditionally; it only exports spans once a global tracer
/// provider has been installed. [`crate::telemetry::TelemetryGuard`] sets up
/// its own subscriber, so a binary calls one or the other, never both.
pub fn setup_logging(environment: Environment) {
    let env_filter =
        tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into());

    let otel_layer = tracing_opentelemetry::layer();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(otel_layer);

    match environment {
        Environment::Production => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_level(true))
                .init();
        }
        Environment::Development => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_ansi(true))
                .init();
        }
    }
}
