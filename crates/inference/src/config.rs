use common::parse_env_var;
use std::env;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionProvider {
    Cpu,
    Cuda,
}

impl FromStr for ExecutionProvider {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda),
            other => Err(format!(
                "{} is not a supported execution provider. Use either `cpu` or `cuda`.",
                other
            )),
        }
    }
}

impl fmt::Display for ExecutionProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda => f.write_str("cuda"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct InferenceConfig {
    pub model_path: String,
    /// Newline-separated class names; overrides the names embedded in the model.
    pub labels_path: Option<String>,
    pub input_size: (u32, u32),
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
    pub execution_provider: ExecutionProvider,
    pub intra_threads: usize,
}

impl InferenceConfig {
    /// Load configuration from environment variables with sensible defaults
    pub fn from_env() -> anyhow::Result<Self> {
        let model_path =
            env::var("MODEL_PATH").unwrap_or_else(|_| "models/bestklaggleyolo8.onnx".to_string());

        let labels_path = env::var("MODEL_LABELS_PATH")
            .ok()
            .filter(|s| !s.trim().is_empty());

        let input_width = parse_env_var("INPUT_WIDTH", 640)?;
        let input_height = parse_env_var("INPUT_HEIGHT", 640)?;

        let confidence_threshold = parse_env_var("CONFIDENCE_THRESHOLD", 0.25)?;
        let iou_threshold = parse_env_var("IOU_THRESHOLD", 0.7)?;
        let max_detections = parse_env_var("MAX_DETECTIONS", 300)?;

        let execution_provider = parse_env_var("EXECUTION_PROVIDER", ExecutionProvider::Cpu)?;
        let intra_threads = parse_env_var("INTRA_THREADS", 4)?;

        let config = Self {
            model_path,
            labels_path,
            input_size: (input_width, input_height),
            confidence_threshold,
            iou_threshold,
            max_detections,
            execution_provider,
            intra_threads,
        };
        config.validate()?;

        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.input_size.0 == 0 || self.input_size.1 == 0 {
            anyhow::bail!("model input size must be non-zero, got {:?}", self.input_size);
        }
        if !(0.0..=1.0).contains(&self.confidence_threshold) {
            anyhow::bail!(
                "CONFIDENCE_THRESHOLD must be within [0, 1], got {}",
                self.confidence_threshold
            );
        }
        if !(0.0..=1.0).contains(&self.iou_threshold) {
            anyhow::bail!("IOU_THRESHOLD must be within [0, 1], got {}", self.iou_threshold);
        }
        if self.max_detections == 0 {
            anyhow::bail!("MAX_DETECTIONS must be at least 1");
        }
        Ok(())
    }

    /// Create default configuration for testing
    pub fn test_default() -> Self {
        Self {
            model_path: "models/model.onnx".to_string(),
            labels_path: None,
            input_size: (640, 640),
            confidence_threshold: 0.25,
            iou_threshold: 0.7,
            max_detections: 300,
            execution_provider: ExecutionProvider::Cpu,
            intra_threads: 1,
        }
    }
}
