pub mod geometry;
pub mod labels;
pub mod suppression;
pub mod tensor;
pub mod types;

pub use geometry::{ModelFamily, decode_outputs};
pub use labels::Labels;
pub use suppression::{SuppressionPolicy, suppress};
pub use tensor::{DequantMode, QuantParams, RawTensor, TensorData};
pub use types::{BoundingBox, Candidates, Detection, Point, Rect};
