/// Affine quantization parameters attached to integer tensors.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct QuantParams {
    pub scale: f32,
    pub zero_point: i32,
}

/// Raw element storage for one output tensor.
#[derive(Debug, Clone)]
pub enum TensorData {
    U8(Vec<u8>),
    F32(Vec<f32>),
}

/// Dequantization convention for integer tensors.
///
/// The convention is a property of the model binding, decided once at load
/// time, never inferred per call. `Affine` applies the tensor's quantization
/// parameters; `Uniform255` maps the full u8 range onto [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DequantMode {
    Affine,
    Uniform255,
}

/// One output tensor copied out of an inference session.
#[derive(Debug, Clone)]
pub struct RawTensor {
    pub data: TensorData,
    pub shape: Vec<usize>,
    pub quantization: Option<QuantParams>,
}

impl RawTensor {
    pub fn from_f32(data: Vec<f32>, shape: Vec<usize>) -> Self {
        Self {
            data: TensorData::F32(data),
            shape,
            quantization: None,
        }
    }

    pub fn from_u8(data: Vec<u8>, shape: Vec<usize>, quantization: Option<QuantParams>) -> Self {
        Self {
            data: TensorData::U8(data),
            shape,
            quantization,
        }
    }

    /// Total element count, the product of the shape.
    pub fn element_count(&self) -> usize {
        self.shape.iter().product()
    }

    /// Flattens the tensor to f32 values.
    ///
    /// Float storage copies through untouched. Integer storage follows the
    /// binding's convention: affine `(raw - zero_point) * scale` when the
    /// parameters are present, `raw / 255` otherwise.
    pub fn dequantize(&self, mode: DequantMode) -> Vec<f32> {
        match &self.data {
            TensorData::F32(values) => values.clone(),
            TensorData::U8(values) => match (mode, self.quantization) {
                (DequantMode::Affine, Some(q)) => values
                    .iter()
                    .map(|&v| (v as f32 - q.zero_point as f32) * q.scale)
                    .collect(),
                _ => values.iter().map(|&v| v as f32 / 255.0).collect(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========== Affine Dequantization ==========

    #[test]
    fn affine_dequantization_inverts_quantization_within_one_step() {
        let scale = 0.0039;
        let zero_point = 12;
        let originals = [0.0f32, 0.25, 0.5013, 0.75, 0.9];

        let quantized: Vec<u8> = originals
            .iter()
            .map(|v| ((v / scale).round() as i32 + zero_point).clamp(0, 255) as u8)
            .collect();

        let tensor = RawTensor::from_u8(
            quantized,
            vec![1, originals.len()],
            Some(QuantParams { scale, zero_point }),
        );
        let decoded = tensor.dequantize(DequantMode::Affine);

        for (original, decoded) in originals.iter().zip(&decoded) {
            assert!(
                (original - decoded).abs() <= scale,
                "decoded {} should be within one quantization step of {}",
                decoded,
                original
            );
        }
    }

    #[test]
    fn affine_uses_zero_point() {
        let tensor = RawTensor::from_u8(
            vec![10],
            vec![1],
            Some(QuantParams {
                scale: 2.0,
                zero_point: 4,
            }),
        );
        assert_eq!(tensor.dequantize(DequantMode::Affine), vec![12.0]);
    }

    #[test]
    fn affine_without_parameters_falls_back_to_uniform() {
        let tensor = RawTensor::from_u8(vec![255, 0], vec![2], None);
        let decoded = tensor.dequantize(DequantMode::Affine);
        assert_eq!(decoded, vec![1.0, 0.0]);
    }

    // ========== Uniform Dequantization ==========

    #[test]
    fn uniform_maps_full_range_onto_unit_interval() {
        let tensor = RawTensor::from_u8(vec![0, 128, 255], vec![3], None);
        let decoded = tensor.dequantize(DequantMode::Uniform255);

        assert_eq!(decoded[0], 0.0);
        assert!((decoded[1] - 128.0 / 255.0).abs() < 1e-7);
        assert_eq!(decoded[2], 1.0);
    }

    #[test]
    fn uniform_ignores_attached_parameters() {
        let tensor = RawTensor::from_u8(
            vec![255],
            vec![1],
            Some(QuantParams {
                scale: 100.0,
                zero_point: 50,
            }),
        );
        assert_eq!(tensor.dequantize(DequantMode::Uniform255), vec![1.0]);
    }

    // ========== Float Passthrough & Shape ==========

    #[test]
    fn float_storage_passes_through() {
        let values = vec![0.1f32, -3.5, 42.0];
        let tensor = RawTensor::from_f32(values.clone(), vec![1, 3]);
        assert_eq!(tensor.dequantize(DequantMode::Affine), values);
        assert_eq!(tensor.dequantize(DequantMode::Uniform255), values);
    }

    #[test]
    fn decoded_length_equals_shape_product() {
        let tensor = RawTensor::from_u8(vec![7; 24], vec![1, 2, 3, 4], None);
        assert_eq!(tensor.element_count(), 24);
        assert_eq!(
            tensor.dequantize(DequantMode::Uniform255).len(),
            tensor.element_count()
        );
    }
}
