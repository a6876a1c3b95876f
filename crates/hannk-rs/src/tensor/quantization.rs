//! Quantization metadata carried alongside tensors.

use serde::{Deserialize, Serialize};

/// Scale and zero-point parameters for fixed-point tensors.
///
/// The memory model only stores and copies this; interpreting it is the kernels' job.
/// Per-tensor quantization uses single-element vectors; per-channel quantization stores
/// one entry per index of `dimension`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QuantizationInfo {
    pub dimension: i32,
    pub scale: Vec<f32>,
    pub zero: Vec<i32>,
}

impl QuantizationInfo {
    pub fn per_tensor(scale: f32, zero: i32) -> Self {
        QuantizationInfo {
            dimension: 0,
            scale: vec![scale],
            zero: vec![zero],
        }
    }

    /// Reports whether any quantization parameters are present.
    pub fn is_quantized(&self) -> bool {
        !self.scale.is_empty()
    }
}
