use inference::{ClassLabels, RawDetection};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum FormatError {
    #[error("model produced class index {0} which has no label")]
    UnknownClass(usize),

    #[error("model produced a non-finite confidence for class index {0}")]
    NonFiniteScore(usize),
}

/// One detection as returned by `POST /detect`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionBody {
    #[serde(rename = "class")]
    pub class_label: String,
    /// Percentage, two decimal places
    pub confidence: f64,
    /// `[x1, y1, x2, y2]` in source image pixels
    pub bbox: [i32; 4],
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResponse {
    pub detections: Vec<DetectionBody>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Shape raw model output into the public response.
///
/// Order is preserved and nothing is filtered. Boxes are truncated to
/// integers but otherwise passed through as the model produced them.
pub fn format_detections(
    detections: &[RawDetection],
    labels: &ClassLabels,
) -> Result<DetectionResponse, FormatError> {
    let detections = detections
        .iter()
        .map(|det| {
            let class_label = labels
                .get(det.class_id)
                .ok_or(FormatError::UnknownClass(det.class_id))?;

            Ok(DetectionBody {
                class_label: class_label.to_string(),
                confidence: to_percentage(det.score)
                    .ok_or(FormatError::NonFiniteScore(det.class_id))?,
                bbox: det.bbox.map(|v| v as i32),
            })
        })
        .collect::<Result<_, FormatError>>()?;

    Ok(DetectionResponse { detections })
}

/// `[0, 1]` score → percentage rounded to two decimals, clamped to `[0, 100]`.
fn to_percentage(score: f32) -> Option<f64> {
    if !score.is_finite() {
        return None;
    }
    let percent = f64::from(score) * 100.0;
    Some(((percent * 100.0).round() / 100.0).clamp(0.0, 100.0))
}
