use crate::codec::PixelImage;
use postprocess::tensor::{DequantMode, RawTensor};
use serde::Serialize;

#[cfg(feature = "ort-backend")]
pub mod ort;

/// An accelerator visible to the inference runtime.
#[derive(Debug, Clone, Serialize)]
pub struct AcceleratorDevice {
    #[serde(rename = "Kind")]
    pub kind: String,
    #[serde(rename = "Index")]
    pub index: u32,
}

/// Contract between the detection pipeline and an inference runtime.
///
/// One engine instance backs exactly one model and is owned by exactly one
/// worker thread; implementations are not required to be internally
/// thread-safe beyond being movable into that thread.
pub trait InferenceEngine: Send + 'static {
    /// Loads the model at `path` and prepares a session for it, attaching
    /// the first available accelerator device when one is present.
    fn load_model(path: &str) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Resizes `image` to the model's input dimensions and writes it into
    /// the input tensor using this binding's normalization convention.
    fn fill_input(&mut self, image: &PixelImage) -> anyhow::Result<()>;

    /// Runs one inference over the last filled input.
    fn invoke(&mut self) -> anyhow::Result<()>;

    /// Number of output tensors produced by the last invocation.
    fn output_count(&self) -> usize;

    /// Copies output tensor `index` out of the session.
    fn output_tensor(&self, index: usize) -> anyhow::Result<RawTensor>;

    /// Dequantization convention for this binding's integer outputs.
    fn dequant_mode(&self) -> DequantMode {
        DequantMode::Uniform255
    }

    /// Accelerators visible to this engine type.
    fn devices() -> Vec<AcceleratorDevice>
    where
        Self: Sized,
    {
        Vec::new()
    }
}
