use super::{AcceleratorDevice, InferenceEngine};
use crate::codec::PixelImage;
use anyhow::Context;
use image::imageops::FilterType;
use ndarray::{Array, IxDyn};
use ort::{
    execution_providers::{CUDAExecutionProvider, ExecutionProvider},
    session::{Session, builder::GraphOptimizationLevel},
    value::TensorRef,
};
use postprocess::tensor::RawTensor;

const DEFAULT_INPUT_SIZE: u32 = 640;

/// ONNX Runtime session bound to one model file.
///
/// Input layout and size come from the session's declared input shape;
/// dynamic dimensions fall back to 640x640. Pixels are fed as f32 divided
/// by 255.5, the normalization the exported detection models were calibrated
/// against.
pub struct OrtEngine {
    session: Session,
    input_name: String,
    output_names: Vec<String>,
    input_width: u32,
    input_height: u32,
    channels_first: bool,
    input: Option<Array<f32, IxDyn>>,
    outputs: Vec<RawTensor>,
}

impl InferenceEngine for OrtEngine {
    fn load_model(path: &str) -> anyhow::Result<Self> {
        // Initialize ORT environment (idempotent)
        let _ = ort::init().commit();

        let mut builder = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(4)?;

        // Attach the first accelerator when one is present; CPU otherwise.
        let cuda = CUDAExecutionProvider::default();
        if cuda.is_available().unwrap_or(false) {
            tracing::info!("Initializing ONNX Runtime with CUDA execution provider");
            builder = builder.with_execution_providers([cuda.with_device_id(0).build()])?;
        } else {
            tracing::info!("Initializing ONNX Runtime with CPU execution provider");
        }

        let session = builder.commit_from_file(path)?;

        let input = session
            .inputs
            .first()
            .context("Model declares no input tensors")?;
        let input_name = input.name.clone();
        let dims: Vec<i64> = input
            .input_type
            .tensor_dimensions()
            .map(|dims| dims.collect())
            .unwrap_or_default();

        let (channels_first, height, width) = match dims.as_slice() {
            [_, 3, h, w] => (true, *h, *w),
            [_, h, w, 3] => (false, *h, *w),
            _ => (true, 0, 0),
        };
        let input_height = u32::try_from(height)
            .ok()
            .filter(|&h| h > 0)
            .unwrap_or(DEFAULT_INPUT_SIZE);
        let input_width = u32::try_from(width)
            .ok()
            .filter(|&w| w > 0)
            .unwrap_or(DEFAULT_INPUT_SIZE);

        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();

        tracing::info!(
            model = %path,
            input = %input_name,
            width = input_width,
            height = input_height,
            channels_first,
            outputs = output_names.len(),
            "Model loaded"
        );

        Ok(Self {
            session,
            input_name,
            output_names,
            input_width,
            input_height,
            channels_first,
            input: None,
            outputs: Vec::new(),
        })
    }

    fn fill_input(&mut self, image: &PixelImage) -> anyhow::Result<()> {
        let rgb = image::RgbImage::from_raw(image.width, image.height, image.pixels.clone())
            .context("Pixel buffer does not match its declared dimensions")?;
        let resized = image::DynamicImage::ImageRgb8(rgb)
            .resize_exact(self.input_width, self.input_height, FilterType::Triangle)
            .into_rgb8();

        let (w, h) = (self.input_width as usize, self.input_height as usize);
        let (shape, data) = if self.channels_first {
            let mut data = vec![0.0f32; 3 * h * w];
            for (x, y, pixel) in resized.enumerate_pixels() {
                let (xi, yi) = (x as usize, y as usize);
                for c in 0..3 {
                    data[c * h * w + yi * w + xi] = pixel[c] as f32 / 255.5;
                }
            }
            (vec![1, 3, h, w], data)
        } else {
            let data = resized.into_raw().iter().map(|&v| v as f32 / 255.5).collect();
            (vec![1, h, w, 3], data)
        };

        self.input = Some(
            Array::from_shape_vec(IxDyn(&shape), data)
                .context("Failed to shape input tensor")?,
        );
        Ok(())
    }

    fn invoke(&mut self) -> anyhow::Result<()> {
        let input = self
            .input
            .as_ref()
            .context("Input tensor not filled before invocation")?;

        let outputs = self.session.run(ort::inputs![
            self.input_name.as_str() => TensorRef::from_array_view(input.view())?
        ])?;

        self.outputs.clear();
        for name in &self.output_names {
            let value = &outputs[name.as_str()];
            match value.try_extract_array::<f32>() {
                Ok(view) => {
                    let shape = view.shape().to_vec();
                    let data = view.iter().copied().collect();
                    self.outputs.push(RawTensor::from_f32(data, shape));
                }
                Err(_) => {
                    // Quantized export: copy the raw bytes and let the
                    // decoder apply the binding's convention.
                    let view = value
                        .try_extract_array::<u8>()
                        .with_context(|| format!("Output {name} is neither f32 nor u8"))?;
                    let shape = view.shape().to_vec();
                    let data = view.iter().copied().collect();
                    self.outputs.push(RawTensor::from_u8(data, shape, None));
                }
            }
        }
        Ok(())
    }

    fn output_count(&self) -> usize {
        self.outputs.len()
    }

    fn output_tensor(&self, index: usize) -> anyhow::Result<RawTensor> {
        self.outputs
            .get(index)
            .cloned()
            .with_context(|| format!("No output tensor at index {index}"))
    }

    fn devices() -> Vec<AcceleratorDevice> {
        let cuda = CUDAExecutionProvider::default();
        if cuda.is_available().unwrap_or(false) {
            vec![AcceleratorDevice {
                kind: "cuda".to_string(),
                index: 0,
            }]
        } else {
            Vec::new()
        }
    }
}
