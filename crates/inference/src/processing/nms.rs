use crate::detector::RawDetection;

/// Upper bound on candidates entering NMS, keeps worst-case CPU time bounded.
pub const MAX_NMS_INPUTS: usize = 30_000;

/// Intersection over union of two `[x1, y1, x2, y2]` boxes.
#[inline]
pub fn iou(a: &[f32; 4], b: &[f32; 4]) -> f32 {
    let inter_w = (a[2].min(b[2]) - a[0].max(b[0])).max(0.0);
    let inter_h = (a[3].min(b[3]) - a[1].max(b[1])).max(0.0);
    let inter_area = inter_w * inter_h;

    let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
    let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
    let union = area_a + area_b - inter_area;

    if union > f32::EPSILON {
        inter_area / union
    } else {
        0.0
    }
}

/// Class-aware greedy non-maximum suppression.
///
/// Boxes only suppress boxes of the same class. Output is sorted by score,
/// highest first, and holds at most `max_detections` entries.
pub fn non_max_suppression(
    mut candidates: Vec<RawDetection>,
    iou_threshold: f32,
    max_detections: usize,
) -> Vec<RawDetection> {
    // Stable, so equal scores keep anchor order
    candidates.sort_by(|a, b| b.score.total_cmp(&a.score));

    if candidates.len() > MAX_NMS_INPUTS {
        tracing::warn!(
            candidates = candidates.len(),
            limit = MAX_NMS_INPUTS,
            "NMS input truncated"
        );
        candidates.truncate(MAX_NMS_INPUTS);
    }

    let mut kept: Vec<RawDetection> = Vec::with_capacity(max_detections.min(candidates.len()));

    for candidate in candidates {
        if kept.len() >= max_detections {
            break;
        }

        let suppressed = kept.iter().any(|k| {
            k.class_id == candidate.class_id && iou(&k.bbox, &candidate.bbox) > iou_threshold
        });

        if !suppressed {
            kept.push(candidate);
        }
    }

    kept
}
