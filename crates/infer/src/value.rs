use base::Tensor;

/// Typed tensor handed to a backend as a named input.
///
/// Covers the element types the acoustic models exchange: float activations
/// and caches, integer symbol ids and offsets, boolean attention masks.
#[derive(Debug, Clone, PartialEq)]
pub enum TensorValue {
    F32(Tensor<f32>),
    I64(Tensor<i64>),
    Bool(Tensor<bool>),
}

impl TensorValue {
    /// Rank-0 integer tensor, as the streaming encoders expect for scalar
    /// inputs like `offset`.
    pub fn scalar_i64(value: i64) -> Self {
        TensorValue::I64(Tensor::scalar(value))
    }

    pub fn shape(&self) -> &[usize] {
        match self {
            TensorValue::F32(t) => &t.shape,
            TensorValue::I64(t) => &t.shape,
            TensorValue::Bool(t) => &t.shape,
        }
    }
}

impl From<Tensor<f32>> for TensorValue {
    fn from(tensor: Tensor<f32>) -> Self {
        TensorValue::F32(tensor)
    }
}

impl From<Tensor<i64>> for TensorValue {
    fn from(tensor: Tensor<i64>) -> Self {
        TensorValue::I64(tensor)
    }
}

impl From<Tensor<bool>> for TensorValue {
    fn from(tensor: Tensor<bool>) -> Self {
        TensorValue::Bool(tensor)
    }
}
