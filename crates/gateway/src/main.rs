use gateway::{AppState, config::GatewayConfig, logging::setup_logging, run_server};
use inference::{Detector, YoloDetector};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = GatewayConfig::from_env()?;
    let _telemetry = setup_logging(&config)?;

    tracing::info!(
        environment = config.environment.as_str(),
        model_path = %config.inference.model_path,
        provider = %config.inference.execution_provider,
        "Gateway starting"
    );

    let detector = YoloDetector::load(&config.inference).inspect_err(|e| {
        tracing::error!(model_path = %config.inference.model_path, "Failed to load model: {:#}", e);
    })?;
    tracing::info!(classes = detector.labels().len(), "Model loaded");

    let state = AppState::new(Arc::new(detector));
    run_server(&config, state).await
}
