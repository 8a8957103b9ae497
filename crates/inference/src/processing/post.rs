use crate::detector::{InferenceError, RawDetection};
use crate::processing::nms::non_max_suppression;
use ndarray::{Axis, Ix3, s};
use preprocess::LetterboxTransform;

/// Box coordinates precede the class scores in every prediction row.
const BOX_FEATURES: usize = 4;

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub max_detections: usize,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32, max_detections: usize) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
            max_detections,
        }
    }

    /// Parse detections from YOLO output into source-image pixel boxes.
    ///
    /// `output` is `[1, 4 + num_classes, anchors]` as exported by Ultralytics,
    /// or the transposed `[1, anchors, 4 + num_classes]`. Boxes are cxcywh in
    /// model-input pixels and are mapped back through `transform`, then
    /// clipped to the source image.
    #[tracing::instrument(skip(self, output, transform), fields(shape = ?output.shape()))]
    pub fn parse_detections(
        &self,
        output: &ndarray::ArrayViewD<f32>,
        num_classes: usize,
        transform: &LetterboxTransform,
    ) -> Result<Vec<RawDetection>, InferenceError> {
        let features = BOX_FEATURES + num_classes;
        let shape_error = || InferenceError::OutputShape {
            expected: format!("[1, {features}, anchors] or [1, anchors, {features}]"),
            got: format!("{:?}", output.shape()),
        };

        let batch = output
            .view()
            .into_dimensionality::<Ix3>()
            .map_err(|_| shape_error())?;
        if batch.shape()[0] != 1 {
            return Err(shape_error());
        }

        let predictions = batch.index_axis(Axis(0), 0);
        let predictions = if predictions.shape()[0] == features {
            predictions.reversed_axes()
        } else if predictions.shape()[1] == features {
            predictions
        } else {
            return Err(shape_error());
        };

        let orig_width = transform.orig_width as f32;
        let orig_height = transform.orig_height as f32;
        let mut candidates = Vec::new();

        for row in predictions.rows() {
            let (class_id, score) = row.slice(s![BOX_FEATURES..]).iter().enumerate().fold(
                (0usize, f32::NEG_INFINITY),
                |(best_idx, best), (idx, &score)| {
                    if score > best { (idx, score) } else { (best_idx, best) }
                },
            );

            // Also rejects NaN
            if !(score > self.confidence_threshold) {
                continue;
            }

            let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
            if !(cx.is_finite() && cy.is_finite() && w.is_finite() && h.is_finite()) {
                continue;
            }

            let (x1, y1) = transform.to_source(cx - w / 2.0, cy - h / 2.0);
            let (x2, y2) = transform.to_source(cx + w / 2.0, cy + h / 2.0);

            candidates.push(RawDetection {
                bbox: [
                    x1.clamp(0.0, orig_width),
                    y1.clamp(0.0, orig_height),
                    x2.clamp(0.0, orig_width),
                    y2.clamp(0.0, orig_height),
                ],
                score,
                class_id,
            });
        }

        let candidate_count = candidates.len();
        let detections =
            non_max_suppression(candidates, self.iou_threshold, self.max_detections);

        tracing::trace!(
            candidates = candidate_count,
            kept = detections.len(),
            "Postprocessed predictions"
        );

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, IxDyn};

    const NUM_CLASSES: usize = 3;

    fn test_postprocessor() -> PostProcessor {
        PostProcessor::new(0.25, 0.7, 300)
    }

    fn identity_transform(width: u32, height: u32) -> LetterboxTransform {
        LetterboxTransform {
            scale: 1.0,
            offset_x: 0.0,
            offset_y: 0.0,
            orig_width: width,
            orig_height: height,
        }
    }

    /// Build a `[1, 4 + NUM_CLASSES, n]` tensor from (cxcywh, class, score) rows.
    fn yolo_output(rows: &[([f32; 4], usize, f32)]) -> Array<f32, IxDyn> {
        let features = BOX_FEATURES + NUM_CLASSES;
        let n = rows.len();
        let mut data = vec![0.0f32; features * n];
        for (anchor, (bbox, class_id, score)) in rows.iter().enumerate() {
            for (f, v) in bbox.iter().enumerate() {
                data[f * n + anchor] = *v;
            }
            data[(BOX_FEATURES + class_id) * n + anchor] = *score;
        }
        Array::from_shape_vec(IxDyn(&[1, features, n]), data).unwrap()
    }

    #[test]
    fn test_single_detection_features_first() {
        let output = yolo_output(&[([50.0, 40.0, 20.0, 10.0], 1, 0.9)]);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), NUM_CLASSES, &identity_transform(640, 640))
            .unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.class_id, 1);
        assert!((det.score - 0.9).abs() < 1e-6);
        assert_eq!(det.bbox, [40.0, 35.0, 60.0, 45.0]);
    }

    #[test]
    fn test_transposed_layout() {
        // [1, anchors, features]
        let output = yolo_output(&[([50.0, 40.0, 20.0, 10.0], 2, 0.8)]);
        let transposed = output.view().permuted_axes(IxDyn(&[0, 2, 1])).to_owned();

        let detections = test_postprocessor()
            .parse_detections(&transposed.view(), NUM_CLASSES, &identity_transform(640, 640))
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 2);
        assert_eq!(detections[0].bbox, [40.0, 35.0, 60.0, 45.0]);
    }

    #[test]
    fn test_confidence_threshold_filtering() {
        let output = yolo_output(&[
            ([10.0, 10.0, 4.0, 4.0], 0, 0.10),
            ([100.0, 100.0, 4.0, 4.0], 0, 0.25), // boundary: not strictly above
            ([200.0, 200.0, 4.0, 4.0], 0, 0.26),
        ]);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), NUM_CLASSES, &identity_transform(640, 640))
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert!((detections[0].score - 0.26).abs() < 1e-6);
    }

    #[test]
    fn test_non_finite_scores_and_boxes_skipped() {
        let output = yolo_output(&[
            ([10.0, 10.0, 4.0, 4.0], 0, f32::NAN),
            ([f32::INFINITY, 10.0, 4.0, 4.0], 1, 0.9),
            ([300.0, 300.0, 4.0, 4.0], 2, 0.9),
        ]);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), NUM_CLASSES, &identity_transform(640, 640))
            .unwrap();

        assert_eq!(detections.len(), 1);
        assert_eq!(detections[0].class_id, 2);
    }

    #[test]
    fn test_inverse_letterbox_and_clipping() {
        // 800x600 source in a 640x640 input: scale 0.8, 80px bars top and bottom
        let transform = LetterboxTransform {
            scale: 0.8,
            offset_x: 0.0,
            offset_y: 80.0,
            orig_width: 800,
            orig_height: 600,
        };
        let output = yolo_output(&[
            ([320.0, 320.0, 160.0, 80.0], 0, 0.9),
            // Spills into the top padding and off the right edge
            ([630.0, 85.0, 40.0, 20.0], 1, 0.9),
        ]);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), NUM_CLASSES, &transform)
            .unwrap();

        assert_eq!(detections.len(), 2);
        let centre = detections.iter().find(|d| d.class_id == 0).unwrap();
        // x: (240..400)/0.8 = 300..500; y: (280-80..360-80)/0.8 = 250..350
        assert!((centre.bbox[0] - 300.0).abs() < 1e-3);
        assert!((centre.bbox[1] - 250.0).abs() < 1e-3);
        assert!((centre.bbox[2] - 500.0).abs() < 1e-3);
        assert!((centre.bbox[3] - 350.0).abs() < 1e-3);

        let edge = detections.iter().find(|d| d.class_id == 1).unwrap();
        assert_eq!(edge.bbox[1], 0.0, "clipped to top edge");
        assert_eq!(edge.bbox[2], 800.0, "clipped to right edge");
    }

    #[test]
    fn test_duplicate_boxes_suppressed() {
        let output = yolo_output(&[
            ([100.0, 100.0, 50.0, 50.0], 0, 0.8),
            ([101.0, 101.0, 50.0, 50.0], 0, 0.9),
            ([101.0, 101.0, 50.0, 50.0], 1, 0.7),
        ]);

        let detections = test_postprocessor()
            .parse_detections(&output.view(), NUM_CLASSES, &identity_transform(640, 640))
            .unwrap();

        assert_eq!(detections.len(), 2);
        assert!((detections[0].score - 0.9).abs() < 1e-6, "sorted by score");
        assert_eq!(detections[1].class_id, 1);
    }

    #[test]
    fn test_empty_output() {
        let output = Array::from_shape_vec(IxDyn(&[1, BOX_FEATURES + NUM_CLASSES, 0]), vec![])
            .unwrap();

        let detections = test_postprocessor()
            .parse_detections(&output.view(), NUM_CLASSES, &identity_transform(10, 10))
            .unwrap();

        assert!(detections.is_empty());
    }

    #[test]
    fn test_shape_mismatch_is_error() {
        // Model has 80 classes but the table only knows 3
        let output = Array::<f32, _>::zeros(IxDyn(&[1, 84, 8400]));
        let err = test_postprocessor()
            .parse_detections(&output.view(), NUM_CLASSES, &identity_transform(10, 10))
            .unwrap_err();
        assert!(matches!(err, InferenceError::OutputShape { .. }));

        let output = Array::<f32, _>::zeros(IxDyn(&[7, 7]));
        assert!(
            test_postprocessor()
                .parse_detections(&output.view(), NUM_CLASSES, &identity_transform(10, 10))
                .is_err()
        );
    }
}
