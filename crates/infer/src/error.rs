use crate::Device;
use std::fmt;

#[derive(Debug)]
pub enum InferError {
    Backend(String),
    ModelLoad(String),
    Shape(String),
    Io(String),
    InvalidInput {
        name: String,
        expected_names: Vec<String>,
    },
    UnsupportedDevice(Device),
}

impl fmt::Display for InferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InferError::Backend(msg) => write!(f, "backend error: {msg}"),
            InferError::ModelLoad(msg) => write!(f, "model load error: {msg}"),
            InferError::Shape(msg) => write!(f, "shape error: {msg}"),
            InferError::Io(msg) => write!(f, "io error: {msg}"),
            InferError::InvalidInput {
                name,
                expected_names,
            } => write!(
                f,
                "invalid input '{name}', model declares inputs {expected_names:?}"
            ),
            InferError::UnsupportedDevice(device) => write!(f, "unsupported device: {device}"),
        }
    }
}

impl std::error::Error for InferError {}

impl From<std::io::Error> for InferError {
    fn from(err: std::io::Error) -> Self {
        InferError::Io(err.to_string())
    }
}

impl From<ort::Error> for InferError {
    fn from(err: ort::Error) -> Self {
        InferError::Backend(err.to_string())
    }
}
