use crate::error::DetectError;
use crate::format::{DetectionResponse, format_detections};
use crate::metrics::PipelineMetrics;
use crate::upload::UploadedImage;
use inference::{Detector, decode};
use std::sync::Arc;
use std::time::Instant;

/// Upload in, formatted detections out.
///
/// Requests share one detector and are otherwise independent: every call
/// decodes its own image and builds its own response.
pub struct DetectionPipeline {
    detector: Arc<dyn Detector>,
    metrics: PipelineMetrics,
}

impl DetectionPipeline {
    pub fn new(detector: Arc<dyn Detector>) -> Self {
        Self {
            detector,
            metrics: PipelineMetrics::new(),
        }
    }

    /// Run decode, inference and formatting on a blocking worker thread.
    #[tracing::instrument(
        name = "detect_request",
        skip_all,
        fields(
            bytes = upload.len(),
            file_name = upload.file_name.as_deref().unwrap_or(""),
            content_type = upload.content_type.as_deref().unwrap_or("")
        )
    )]
    pub async fn handle_request(
        &self,
        upload: UploadedImage,
    ) -> Result<DetectionResponse, DetectError> {
        self.metrics.record_request();
        let start = Instant::now();

        let detector = Arc::clone(&self.detector);
        let span = tracing::Span::current();
        let result = tokio::task::spawn_blocking(move || {
            let _entered = span.enter();
            process(&*detector, &upload)
        })
        .await
        .unwrap_or_else(|e| Err(DetectError::Worker(e.to_string())));

        match &result {
            Ok(response) => {
                let elapsed = start.elapsed();
                self.metrics
                    .record_success(response.detections.len(), elapsed);
                tracing::info!(
                    detections = response.detections.len(),
                    elapsed_ms = elapsed.as_secs_f64() * 1000.0,
                    "Detection complete"
                );
            }
            Err(e) => self.metrics.record_failure(e.kind()),
        }

        result
    }
}

/// Synchronous body of a detection request.
pub fn process(
    detector: &dyn Detector,
    upload: &UploadedImage,
) -> Result<DetectionResponse, DetectError> {
    let image = decode(&upload.bytes)?;

    let raw = detector.detect(&image)?;
    let response = format_detections(&raw, detector.labels())?;

    for det in &response.detections {
        tracing::debug!(
            class = %det.class_label,
            confidence = det.confidence,
            bbox = ?det.bbox,
            "Detection"
        );
    }

    Ok(response)
}
