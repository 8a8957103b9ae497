use crate::backend::InferenceBackend;
use crate::config::InferenceConfig;
use crate::decode::DecodedImage;
use crate::labels::ClassLabels;
use crate::processing::post::PostProcessor;
use common::span;
use preprocess::{LetterboxPreProcessor, PreprocessResult};
use std::sync::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("preprocessing failed: {0}")]
    Preprocess(String),

    #[error("model runtime error: {0}")]
    Runtime(String),

    #[error("unexpected model output shape: expected {expected}, got {got}")]
    OutputShape { expected: String, got: String },

    #[error("model session lock poisoned by an earlier panic")]
    Poisoned,
}

/// One raw model prediction, in source-image pixel coordinates.
#[derive(Debug, Clone, PartialEq)]
pub struct RawDetection {
    /// `[x1, y1, x2, y2]`
    pub bbox: [f32; 4],
    /// Model confidence in `[0, 1]`
    pub score: f32,
    pub class_id: usize,
}

/// Detections for one image, in the order the model emitted them.
pub type DetectionSet = Vec<RawDetection>;

/// A loaded detection model.
///
/// Implementations are shared read-only between concurrent requests, so
/// `detect` takes `&self`; any internal exclusivity is the implementation's
/// business.
pub trait Detector: Send + Sync {
    fn detect(&self, image: &DecodedImage) -> Result<DetectionSet, InferenceError>;

    fn labels(&self) -> &ClassLabels;
}

/// YOLO-family detector: letterbox, run the backend, decode and NMS.
///
/// ONNX Runtime sessions need `&mut` to run, so the backend sits behind a
/// mutex and inference is serialized across callers. Preprocessing and
/// postprocessing happen outside the lock.
pub struct YoloDetector<B: InferenceBackend> {
    backend: Mutex<B>,
    labels: ClassLabels,
    postprocessor: PostProcessor,
    input_size: (u32, u32),
}

impl<B: InferenceBackend> YoloDetector<B> {
    pub fn new(backend: B, labels: ClassLabels, config: &InferenceConfig) -> Self {
        Self {
            backend: Mutex::new(backend),
            labels,
            postprocessor: PostProcessor::new(
                config.confidence_threshold,
                config.iou_threshold,
                config.max_detections,
            ),
            input_size: config.input_size,
        }
    }

    /// Wrap a loaded backend, resolving the class table from the labels file
    /// if configured, otherwise from the names embedded in the model.
    pub fn with_backend(backend: B, config: &InferenceConfig) -> anyhow::Result<Self> {
        let labels = match &config.labels_path {
            Some(path) => {
                tracing::info!(path = %path, "Loading class labels from file");
                ClassLabels::from_file(path)?
            }
            None => {
                let raw = backend.embedded_class_names()?.ok_or_else(|| {
                    anyhow::anyhow!(
                        "model has no embedded class names; set MODEL_LABELS_PATH to a labels file"
                    )
                })?;
                ClassLabels::from_yolo_metadata(&raw)?
            }
        };

        Ok(Self::new(backend, labels, config))
    }
}

#[cfg(feature = "ort-backend")]
impl YoloDetector<crate::backend::ort::OrtBackend> {
    /// Load the ONNX model named by `config`. Any failure here is fatal to
    /// the service.
    pub fn load(config: &InferenceConfig) -> anyhow::Result<Self> {
        let backend = crate::backend::ort::OrtBackend::load_model_with_provider(
            &config.model_path,
            config.execution_provider,
            config.intra_threads,
        )?;
        Self::with_backend(backend, config)
    }
}

impl<B: InferenceBackend + Send> Detector for YoloDetector<B> {
    fn detect(&self, image: &DecodedImage) -> Result<DetectionSet, InferenceError> {
        let PreprocessResult { tensor, transform } = LetterboxPreProcessor::new(self.input_size)
            .preprocess(image.as_raw(), image.width(), image.height())
            .map_err(|e| InferenceError::Preprocess(format!("{e:#}")))?;

        let output = {
            let _infer_span = span!("model_inference");
            let mut backend = self.backend.lock().map_err(|_| InferenceError::Poisoned)?;
            backend
                .infer(&tensor)
                .map_err(|e| InferenceError::Runtime(format!("{e:#}")))?
        };

        self.postprocessor
            .parse_detections(&output.predictions.view(), self.labels.len(), &transform)
    }

    fn labels(&self) -> &ClassLabels {
        &self.labels
    }
}
