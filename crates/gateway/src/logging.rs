use crate::config::GatewayConfig;
use common::TelemetryGuard;

const SERVICE_NAME: &str = "gateway";

/// Install the global subscriber, exporting to OTLP when an endpoint is
/// configured. Hold the returned guard for the life of the process.
pub fn setup_logging(config: &GatewayConfig) -> anyhow::Result<Option<TelemetryGuard>> {
    match config.otel_endpoint.as_deref() {
        Some(endpoint) => Ok(Some(TelemetryGuard::init(
            SERVICE_NAME,
            endpoint,
            config.environment,
        )?)),
        None => {
            common::setup_logging(config.environment);
            Ok(None)
        }
    }
}
