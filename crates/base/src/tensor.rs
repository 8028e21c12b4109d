use anyhow::{bail, Result};

/// Owned dense tensor: a shape and a flat row-major data buffer.
///
/// Sessions exchange these across the backend boundary; the backend adapter
/// binds them to whatever tensor abstraction the runtime exposes.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T> {
    pub shape: Vec<usize>,
    pub data: Vec<T>,
}

impl<T: Copy> Tensor<T> {
    /// Create a tensor, validating that the data length matches the shape.
    ///
    /// An empty shape denotes a scalar (one element).
    pub fn new(shape: Vec<usize>, data: Vec<T>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            bail!(
                "data length {} does not match shape {:?} (expected {})",
                data.len(),
                shape,
                expected
            );
        }
        Ok(Self { shape, data })
    }

    /// Scalar tensor (rank 0).
    pub fn scalar(value: T) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }

    /// Size of one axis. Out-of-range axes read as 1, matching the
    /// broadcasting convention used by the backends.
    pub fn dim(&self, axis: usize) -> usize {
        self.shape.get(axis).copied().unwrap_or(1)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl<T: Copy + Default> Tensor<T> {
    /// Zero-filled tensor of the given shape.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len: usize = shape.iter().product();
        Self {
            shape,
            data: vec![T::default(); len],
        }
    }
}
