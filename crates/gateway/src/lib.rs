pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod pipeline;
pub mod server;
pub mod state;
pub mod style;
pub mod upload;

pub use error::DetectError;
pub use format::{DetectionBody, DetectionResponse, ErrorBody, format_detections};
pub use pipeline::DetectionPipeline;
pub use server::{create_app, run_server};
pub use state::AppState;
pub use upload::UploadedImage;
