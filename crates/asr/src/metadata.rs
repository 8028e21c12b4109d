use crate::error::{AsrError, Result};
use base::{log_error, log_info};
use infer::Session;
use serde::Serialize;
use std::path::Path;

/// Architecture constants and streaming configuration baked into an
/// exported model. Every field is required; a model that fails to
/// declare one cannot be decoded and loading must fail.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    pub output_size: i64,
    pub num_blocks: i64,
    pub head: i64,
    pub cnn_module_kernel: i64,
    pub subsampling_rate: i64,
    pub right_context: i64,
    pub sos: i64,
    pub eos: i64,
    pub is_bidirectional_decoder: bool,
    pub chunk_size: i64,
    pub left_chunks: i64,
}

impl ModelMetadata {
    /// Reads all required keys through `lookup`, which abstracts over the
    /// concrete source (session metadata, a JSON sidecar, a test map).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let int = |key: &str| -> Result<i64> {
            let raw = lookup(key)
                .ok_or_else(|| metadata_error(format!("missing required metadata key '{key}'")))?;
            raw.trim().parse::<i64>().map_err(|_| {
                metadata_error(format!("metadata key '{key}' has non-integer value '{raw}'"))
            })
        };
        let flag = |key: &str| -> Result<bool> {
            let raw = lookup(key)
                .ok_or_else(|| metadata_error(format!("missing required metadata key '{key}'")))?;
            match raw.trim() {
                "true" => Ok(true),
                "false" => Ok(false),
                other => other.parse::<i64>().map(|v| v != 0).map_err(|_| {
                    metadata_error(format!("metadata key '{key}' has non-boolean value '{raw}'"))
                }),
            }
        };

        let meta = ModelMetadata {
            output_size: int("output_size")?,
            num_blocks: int("num_blocks")?,
            head: int("head")?,
            cnn_module_kernel: int("cnn_module_kernel")?,
            subsampling_rate: int("subsampling_rate")?,
            right_context: int("right_context")?,
            sos: int("sos_symbol")?,
            eos: int("eos_symbol")?,
            is_bidirectional_decoder: flag("is_bidirectional_decoder")?,
            chunk_size: int("chunk_size")?,
            left_chunks: int("left_chunks")?,
        };
        log_info!("model metadata: {:?}", meta);
        Ok(meta)
    }

    /// Reads the metadata embedded in an exported model's custom
    /// metadata map.
    pub fn from_session(session: &dyn Session) -> Result<Self> {
        Self::from_lookup(|key| session.metadata_value(key))
    }

    /// Reads the metadata from a JSON sidecar file, for model formats
    /// that cannot carry a custom metadata map.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| AsrError::Io(format!("{}: {e}", path.display())))?;
        let value: serde_json::Value = serde_json::from_str(&text)
            .map_err(|e| AsrError::Metadata(format!("{}: {e}", path.display())))?;
        let map = value.as_object().ok_or_else(|| {
            AsrError::Metadata(format!("{}: expected a JSON object", path.display()))
        })?;
        Self::from_lookup(|key| {
            map.get(key).map(|v| match v {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            })
        })
    }

    /// Cache-size value the encoder is asked for: the raw product
    /// `chunk_size * left_chunks`. Negative when the left context is
    /// unbounded, which the exported graphs read as "grow the cache
    /// without limit"; cache shaping clamps separately.
    pub fn required_cache_size(&self) -> i64 {
        self.chunk_size * self.left_chunks
    }
}

fn metadata_error(message: String) -> AsrError {
    log_error!("{message}");
    AsrError::Metadata(message)
}
