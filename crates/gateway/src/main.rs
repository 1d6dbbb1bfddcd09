use common::{TelemetryGuard, setup_logging};
use gateway::{AppState, GatewayConfig, build_router};
use inference::{DetectorConfig, ModelRegistry};
use postprocess::Labels;
use std::sync::Arc;

#[cfg(feature = "ort-backend")]
use inference::backend::ort::OrtEngine as Engine;

#[cfg(not(feature = "ort-backend"))]
compile_error!("The 'ort-backend' feature must be enabled to build the gateway binary");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let detector_config = DetectorConfig::from_env()?;
    let gateway_config = GatewayConfig::from_env()?;

    // TelemetryGuard installs its own subscriber, so plain logging is only
    // set up when no collector endpoint is configured.
    let _telemetry = match gateway_config.otel_endpoint.as_ref() {
        Some(endpoint) => Some(TelemetryGuard::init(
            "gateway",
            endpoint,
            gateway_config.environment.clone(),
        )?),
        None => {
            setup_logging(gateway_config.environment.clone());
            None
        }
    };

    tracing::info!(config = ?detector_config, "Loaded configuration");

    let labels = Arc::new(Labels::from_file(&detector_config.label_path)?);
    tracing::info!(
        count = labels.len(),
        path = %detector_config.label_path,
        "Labels loaded"
    );

    let registry = Arc::new(ModelRegistry::load::<Engine>(&detector_config, labels)?);
    tracing::info!(models = ?registry.list_models(), "Model registry ready");

    let state = AppState {
        registry: Arc::clone(&registry),
    };
    let app = build_router(state, &gateway_config.static_dir);

    let listener = tokio::net::TcpListener::bind(&gateway_config.listen_addr).await?;
    tracing::info!(addr = %gateway_config.listen_addr, "Gateway listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shutting down model workers");
    registry.shutdown();

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
