use crate::labels::Labels;
use crate::types::{Candidates, Detection, Rect};
use std::cmp::Ordering;

/// Duplicate-removal policy applied after geometry decoding.
///
/// `Standard` filters by score, visits candidates best-first and keeps the
/// highest-confidence box of each overlapping cluster. `Greedy` is the
/// legacy sweep kept for output compatibility: it visits candidates in
/// ascending confidence order, applies no score threshold, uses a fixed
/// overlap threshold and caps the result at 20 boxes, so the lowest-scoring
/// box of an overlapping cluster is the one that survives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuppressionPolicy {
    Standard,
    Greedy,
}

impl SuppressionPolicy {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "standard" => Some(SuppressionPolicy::Standard),
            "greedy" => Some(SuppressionPolicy::Greedy),
            _ => None,
        }
    }
}

const GREEDY_IOU_THRESHOLD: f32 = 0.3;
const GREEDY_ACCEPT_LIMIT: usize = 20;

/// Intersection over union of two boxes. Corners are normalized first, so
/// flipped rectangles measure the same as ordered ones; a box without
/// positive area contributes zero overlap.
pub fn iou(a: &Rect, b: &Rect) -> f32 {
    let (ax1, ax2) = (a.x1.min(a.x2), a.x1.max(a.x2));
    let (ay1, ay2) = (a.y1.min(a.y2), a.y1.max(a.y2));
    let (bx1, bx2) = (b.x1.min(b.x2), b.x1.max(b.x2));
    let (by1, by2) = (b.y1.min(b.y2), b.y1.max(b.y2));

    let area_a = (ax2 - ax1) * (ay2 - ay1);
    let area_b = (bx2 - bx1) * (by2 - by1);
    if area_a <= 0.0 || area_b <= 0.0 {
        return 0.0;
    }

    let ix = (ax2.min(bx2) - ax1.max(bx1)).max(0.0);
    let iy = (ay2.min(by2) - ay1.max(by1)).max(0.0);
    let intersection = ix * iy;
    intersection / (area_a + area_b - intersection)
}

/// Indices surviving standard non-maximum suppression, ordered best-first.
///
/// Candidates at or below `score_th` are dropped, the rest are visited in
/// descending confidence order (stable, so equal confidences keep input
/// order) and discarded when they overlap a survivor at `nms_th` or more.
pub fn nms_indices(boxes: &[Rect], confidences: &[f32], score_th: f32, nms_th: f32) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len())
        .filter(|&i| confidences[i] > score_th)
        .collect();
    order.sort_by(|&a, &b| {
        confidences[b]
            .partial_cmp(&confidences[a])
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    for &candidate in &order {
        let overlaps = keep
            .iter()
            .any(|&survivor| iou(&boxes[candidate], &boxes[survivor]) >= nms_th);
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

/// Indices surviving the greedy sweep: ascending confidence order, fixed
/// overlap threshold, at most 20 acceptances, every score eligible.
fn greedy_indices(boxes: &[Rect], confidences: &[f32]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..boxes.len()).collect();
    order.sort_by(|&a, &b| {
        confidences[a]
            .partial_cmp(&confidences[b])
            .unwrap_or(Ordering::Equal)
    });

    let mut keep: Vec<usize> = Vec::new();
    for &candidate in &order {
        if keep.len() >= GREEDY_ACCEPT_LIMIT {
            break;
        }
        let overlaps = keep
            .iter()
            .any(|&accepted| iou(&boxes[candidate], &boxes[accepted]) >= GREEDY_IOU_THRESHOLD);
        if !overlaps {
            keep.push(candidate);
        }
    }
    keep
}

/// Applies the configured policy and resolves class names.
///
/// `score_th` and `nms_th` only apply to the standard policy; the greedy
/// sweep carries its own fixed thresholds.
pub fn suppress(
    policy: SuppressionPolicy,
    candidates: &Candidates,
    score_th: f32,
    nms_th: f32,
    labels: &Labels,
) -> Vec<Detection> {
    let keep = match policy {
        SuppressionPolicy::Standard => {
            nms_indices(&candidates.boxes, &candidates.confidences, score_th, nms_th)
        }
        SuppressionPolicy::Greedy => greedy_indices(&candidates.boxes, &candidates.confidences),
    };

    keep.into_iter()
        .map(|i| {
            Detection::from_candidate(
                &candidates.boxes[i],
                candidates.confidences[i],
                candidates.classes[i],
                labels.get(candidates.classes[i]),
            )
        })
        .collect()
}
