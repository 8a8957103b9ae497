pub mod config;
pub mod logging;
pub mod telemetry;

pub use config::{Environment, parse_env_var};
pub use logging::setup_logging;
pub use telemetry::TelemetryGuard;
