pub mod backend;
pub mod config;
pub mod decode;
pub mod detector;
pub mod labels;
pub mod processing;

// Re-export commonly used types for convenience
pub use backend::{InferenceBackend, InferenceOutput};
pub use config::InferenceConfig;
pub use decode::{DecodeError, DecodedImage, decode};
pub use detector::{DetectionSet, Detector, InferenceError, RawDetection, YoloDetector};
pub use labels::{ClassLabels, LabelsError};
