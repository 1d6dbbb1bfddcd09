pub mod backend;
pub mod codec;
pub mod config;
pub mod errors;
pub mod registry;
pub mod worker;

// Re-export commonly used types for convenience
pub use backend::{AcceleratorDevice, InferenceEngine};
pub use codec::{PixelImage, decode_image};
pub use config::DetectorConfig;
pub use errors::DispatchError;
pub use registry::ModelRegistry;
