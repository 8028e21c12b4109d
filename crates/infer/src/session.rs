use crate::{InferError, TensorValue};
use base::Tensor;
use std::collections::HashMap;

/// A loaded model exposing named tensor inputs and outputs.
///
/// `run` blocks until inference completes. Output tensors are keyed by the
/// model's declared output names; `output_names()` preserves the declared
/// order for callers with positional semantics.
pub trait Session: Send {
    fn run(
        &mut self,
        inputs: &[(&str, TensorValue)],
    ) -> Result<HashMap<String, Tensor<f32>>, InferError>;
    fn input_names(&self) -> &[String];
    fn output_names(&self) -> &[String];

    /// Look up a key in the model's embedded key/value metadata, when the
    /// backend carries any.
    fn metadata_value(&self, _key: &str) -> Option<String> {
        None
    }
}
