use infer::InferError;
use std::fmt;

#[derive(Debug)]
pub enum AsrError {
    /// `forward_chunk` received no frames, buffered or new.
    EmptyInput,
    /// The model was used before the first `reset()`.
    UninitializedModel,
    Metadata(String),
    Shape(String),
    Io(String),
    Infer(InferError),
}

impl fmt::Display for AsrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AsrError::EmptyInput => write!(f, "empty feature input"),
            AsrError::UninitializedModel => write!(f, "model used before reset"),
            AsrError::Metadata(msg) => write!(f, "metadata error: {msg}"),
            AsrError::Shape(msg) => write!(f, "shape error: {msg}"),
            AsrError::Io(msg) => write!(f, "io error: {msg}"),
            AsrError::Infer(err) => write!(f, "inference error: {err}"),
        }
    }
}

impl std::error::Error for AsrError {}

impl From<InferError> for AsrError {
    fn from(err: InferError) -> Self {
        AsrError::Infer(err)
    }
}

impl From<std::io::Error> for AsrError {
    fn from(err: std::io::Error) -> Self {
        AsrError::Io(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AsrError>;
