use crate::pipeline::DetectionPipeline;
use inference::Detector;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<DetectionPipeline>,
}

impl AppState {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self {
            pipeline: Arc::new(DetectionPipeline::new(detector)),
        }
    }
}
