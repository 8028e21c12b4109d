pub mod decoder;
pub mod error;
pub mod metadata;
pub mod model;
pub mod rescore;
pub mod search;

pub use decoder::{DecodeResult, DecodeSession, DecodeState};
pub use error::{AsrError, Result};
pub use metadata::ModelMetadata;
pub use model::StreamingModel;
pub use search::{GreedySearch, Search};
