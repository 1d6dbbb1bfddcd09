use crate::tensor::{DequantMode, RawTensor};
use crate::types::{Candidates, Rect};
use std::path::Path;

/// Output layout family, fixed per model at load time.
///
/// YOLO-family models emit self-contained records (box, objectness, class
/// scores); whether a given output tensor is flat or grid-shaped is decided
/// per tensor by its rank. SSD-family models split boxes, class ids and
/// scores across three tensors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelFamily {
    Yolo,
    Ssd,
}

impl ModelFamily {
    /// The directory containing the model file names the family: anything
    /// under an `ssd` directory decodes as split tensors, everything else
    /// as YOLO records.
    pub fn from_model_path(path: &str) -> Self {
        let parent = Path::new(path)
            .parent()
            .and_then(|dir| dir.file_name())
            .and_then(|name| name.to_str());
        match parent {
            Some("ssd") => ModelFamily::Ssd,
            _ => ModelFamily::Yolo,
        }
    }
}

/// YOLO record layout: 4 box values, one objectness slot, then class scores.
const BOX_SLOTS: usize = 4;
const CLASS_OFFSET: usize = 5;
/// Flat outputs always carry 80 class scores per record.
const FLAT_RECORD_LEN: usize = 85;

/// Anchor priors applied to grid cell size predictions.
const ANCHOR_DX: f32 = 10.0;
const ANCHOR_DY: f32 = 13.0;

/// Index and value of the largest element; ties resolve to the first.
pub fn argmax(values: &[f32]) -> (usize, f32) {
    let mut best = 0;
    let mut best_value = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_value {
            best = i;
            best_value = v;
        }
    }
    (best, best_value)
}

/// Decodes one flat YOLO output: records of 85 values (cx, cy, w, h,
/// objectness, 80 class scores) with coordinates normalized to [0, 1].
///
/// Objectness gates strictly above `score_th` but is not emitted; the
/// candidate's confidence is its best class score.
pub fn decode_flat_yolo(loc: &[f32], score_th: f32, width: f32, height: f32, out: &mut Candidates) {
    for rec in loc.chunks_exact(FLAT_RECORD_LEN) {
        if rec[BOX_SLOTS] > score_th {
            let cx = rec[0] * width;
            let cy = rec[1] * height;
            let bw = rec[2] * width;
            let bh = rec[3] * height;
            let rect = Rect::new(cx - bw / 2.0, cy - bh / 2.0, cx + bw / 2.0, cy + bh / 2.0);
            let (class_id, class_score) = argmax(&rec[CLASS_OFFSET..]);
            out.push(rect, class_score, class_id as i32);
        }
    }
}

/// Decodes one grid YOLO output of shape `[1, grid_h, grid_w, record_len]`.
///
/// Each cell's record holds offsets relative to the cell origin plus
/// log-space size predictions scaled by the anchor priors. The exp/ln pair
/// is applied literally; extreme predictions may overflow to infinity and
/// are left to suppression. Class scores occupy the slots after the
/// objectness gate, so records shorter than 6 values decode nothing.
pub fn decode_grid_yolo(
    loc: &[f32],
    grid_h: usize,
    grid_w: usize,
    record_len: usize,
    score_th: f32,
    width: f32,
    height: f32,
    out: &mut Candidates,
) {
    if record_len <= CLASS_OFFSET || grid_h == 0 || grid_w == 0 {
        return;
    }
    let sx = width / grid_w as f32;
    let sy = height / grid_h as f32;

    for (cell, rec) in loc
        .chunks_exact(record_len)
        .take(grid_h * grid_w)
        .enumerate()
    {
        if rec[BOX_SLOTS] > score_th {
            let i = (cell / grid_w) as f32;
            let j = (cell % grid_w) as f32;
            let x = sx * j + sx * rec[0];
            let y = sy * i + sy * rec[1];
            let bw = sx * (ANCHOR_DX * rec[2].exp()).ln();
            let bh = sy * (ANCHOR_DY * rec[3].exp()).ln();
            let rect = Rect::new(x - bw / 2.0, y - bh / 2.0, x + bw / 2.0, y + bh / 2.0);
            let (class_id, class_score) = argmax(&rec[CLASS_OFFSET..]);
            out.push(rect, class_score, class_id as i32);
        }
    }
}

/// Decodes split SSD outputs: `boxes` packs 4 corner values per record
/// normalized to [0, 1], `classes` and `scores` run parallel to it.
///
/// Iteration stops at the shortest of the three tensors. No score gate
/// applies here; thresholding is the suppressor's job.
pub fn decode_split_ssd(
    boxes: &[f32],
    classes: &[f32],
    scores: &[f32],
    width: f32,
    height: f32,
    out: &mut Candidates,
) {
    let count = (boxes.len() / BOX_SLOTS)
        .min(classes.len())
        .min(scores.len());
    for idx in 0..count {
        let b = &boxes[idx * BOX_SLOTS..(idx + 1) * BOX_SLOTS];
        let rect = Rect::new(b[0] * width, b[1] * height, b[2] * width, b[3] * height);
        out.push(rect, scores[idx], classes[idx].round() as i32);
    }
}

/// Decodes every output tensor of one inference call into a single
/// candidate set.
///
/// YOLO-family models decode each tensor by rank (flat at rank 3, grid at
/// rank 4) and concatenate the candidates; SSD-family models read
/// box/class/score from the first three tensors and need at least three.
pub fn decode_outputs(
    family: ModelFamily,
    outputs: &[RawTensor],
    mode: DequantMode,
    score_th: f32,
    width: f32,
    height: f32,
) -> Candidates {
    let mut candidates = Candidates::default();
    match family {
        ModelFamily::Yolo => {
            for tensor in outputs {
                let loc = tensor.dequantize(mode);
                match tensor.shape.len() {
                    3 => decode_flat_yolo(&loc, score_th, width, height, &mut candidates),
                    4 => decode_grid_yolo(
                        &loc,
                        tensor.shape[1],
                        tensor.shape[2],
                        tensor.shape[3],
                        score_th,
                        width,
                        height,
                        &mut candidates,
                    ),
                    rank => {
                        tracing::debug!(rank, "skipping output tensor with unsupported rank")
                    }
                }
            }
        }
        ModelFamily::Ssd => {
            if outputs.len() > 2 {
                let boxes = outputs[0].dequantize(mode);
                let classes = outputs[1].dequantize(mode);
                let scores = outputs[2].dequantize(mode);
                decode_split_ssd(&boxes, &classes, &scores, width, height, &mut candidates);
            } else {
                tracing::warn!(
                    count = outputs.len(),
                    "split decoding needs box, class and score tensors"
                );
            }
        }
    }
    candidates
}
