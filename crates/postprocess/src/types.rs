use serde::{Deserialize, Serialize};

/// Axis-aligned box in pixel space. Corners are not required to be ordered;
/// suppression normalizes them before measuring overlap.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

impl Rect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }
}

/// Candidate boxes produced by geometry decoding, kept as parallel arrays
/// until suppression picks the survivors.
#[derive(Debug, Default, Clone)]
pub struct Candidates {
    pub boxes: Vec<Rect>,
    pub confidences: Vec<f32>,
    pub classes: Vec<i32>,
}

impl Candidates {
    pub fn push(&mut self, rect: Rect, confidence: f32, class_id: i32) {
        self.boxes.push(rect);
        self.confidences.push(confidence);
        self.classes.push(class_id);
    }

    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }
}

/// Integer pixel coordinate as serialized at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Point {
    #[serde(rename = "X")]
    pub x: i32,
    #[serde(rename = "Y")]
    pub y: i32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoundingBox {
    #[serde(rename = "Min")]
    pub min: Point,
    #[serde(rename = "Max")]
    pub max: Point,
}

/// Final labeled detection. Serialized JSON field names follow the wire
/// contract consumed by existing clients: `Box`/`Min`/`Max`/`X`/`Y`,
/// `Score`, `ClassID`, `ClassName`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "Box")]
    pub bbox: BoundingBox,
    #[serde(rename = "Score")]
    pub score: f32,
    #[serde(rename = "ClassID")]
    pub class_id: i32,
    #[serde(rename = "ClassName")]
    pub class_name: String,
}

impl Detection {
    /// Wire coordinates are integer pixels; fractional corners truncate.
    pub fn from_candidate(rect: &Rect, score: f32, class_id: i32, class_name: &str) -> Self {
        Self {
            bbox: BoundingBox {
                min: Point {
                    x: rect.x1 as i32,
                    y: rect.y1 as i32,
                },
                max: Point {
                    x: rect.x2 as i32,
                    y: rect.y2 as i32,
                },
            },
            score,
            class_id,
            class_name: class_name.to_string(),
        }
    }
}
