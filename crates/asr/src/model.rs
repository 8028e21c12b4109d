use crate::error::{AsrError, Result};
use crate::metadata::ModelMetadata;
use base::{Tensor, log_info};
use infer::{Backend, ModelSource, Session, TensorValue};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub(crate) type SharedSession = Arc<Mutex<Box<dyn Session>>>;

/// Input roles a streaming encoder declares by name. Unknown names are
/// skipped so that exports with fewer inputs (no mask, no caches) still
/// run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EncoderInput {
    Chunk,
    Offset,
    RequiredCacheSize,
    AttCache,
    CnnCache,
    AttMask,
}

impl EncoderInput {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "chunk" => Some(Self::Chunk),
            "offset" => Some(Self::Offset),
            "required_cache_size" => Some(Self::RequiredCacheSize),
            "att_cache" => Some(Self::AttCache),
            "cnn_cache" => Some(Self::CnnCache),
            "att_mask" => Some(Self::AttMask),
            _ => None,
        }
    }
}

/// Per-utterance streaming state. Owned buffers only; the previous
/// chunk's caches are fed back as inputs to the next one.
pub(crate) struct StreamingState {
    pub(crate) offset: i64,
    pub(crate) att_cache: Tensor<f32>,
    pub(crate) cnn_cache: Tensor<f32>,
    /// Encoder output of every chunk so far, in order, kept for rescoring.
    pub(crate) encoder_outs: Vec<Tensor<f32>>,
    /// Tail frames of the previous feature window, respliced in front of
    /// the next chunk to cover the subsampling right context.
    pub(crate) cached_feats: Vec<Vec<f32>>,
}

/// Chunk-wise encoder + CTC projection + attention rescorer over a
/// shared inference backend. Stateless apart from the explicit
/// per-utterance `StreamingState`.
pub struct StreamingModel {
    meta: ModelMetadata,
    encoder: SharedSession,
    ctc: SharedSession,
    pub(crate) rescore: SharedSession,
    pub(crate) state: Option<StreamingState>,
}

impl StreamingModel {
    pub fn new(
        meta: ModelMetadata,
        encoder: Box<dyn Session>,
        ctc: Box<dyn Session>,
        rescore: Box<dyn Session>,
    ) -> Self {
        Self {
            meta,
            encoder: Arc::new(Mutex::new(encoder)),
            ctc: Arc::new(Mutex::new(ctc)),
            rescore: Arc::new(Mutex::new(rescore)),
            state: None,
        }
    }

    /// Loads the three exported graphs from `model_dir` and reads the
    /// architecture metadata embedded in the encoder.
    pub fn load(model_dir: impl AsRef<Path>, backend: &dyn Backend) -> Result<Self> {
        let dir = model_dir.as_ref();
        let encoder = backend.load_model(ModelSource::File(dir.join("encoder.onnx")))?;
        let ctc = backend.load_model(ModelSource::File(dir.join("ctc.onnx")))?;
        let rescore = backend.load_model(ModelSource::File(dir.join("decoder.onnx")))?;
        let meta = ModelMetadata::from_session(encoder.as_ref())?;
        log_info!(
            "encoder inputs {:?} outputs {:?}",
            encoder.input_names(),
            encoder.output_names()
        );
        log_info!(
            "ctc inputs {:?} outputs {:?}",
            ctc.input_names(),
            ctc.output_names()
        );
        log_info!(
            "rescore inputs {:?} outputs {:?}",
            rescore.input_names(),
            rescore.output_names()
        );
        Ok(Self::new(meta, encoder, ctc, rescore))
    }

    pub fn metadata(&self) -> &ModelMetadata {
        &self.meta
    }

    /// Begins a new utterance. Caches are zero-filled at their full
    /// declared shapes so every chunk, including the first, runs the
    /// same graph.
    pub fn reset(&mut self) {
        let meta = &self.meta;
        let head_dim = (meta.output_size / meta.head) as usize;
        // Bounded left context starts with a zero-filled full-size cache
        // and the offset positioned past it; unbounded starts empty at 0.
        let (offset, cache_len) = if meta.left_chunks > 0 {
            let required = meta.required_cache_size();
            (required, required as usize)
        } else {
            (0, 0)
        };
        let att_cache = Tensor::zeros(vec![
            meta.num_blocks as usize,
            meta.head as usize,
            cache_len,
            2 * head_dim,
        ]);
        let cnn_cache = Tensor::zeros(vec![
            meta.num_blocks as usize,
            1,
            meta.output_size as usize,
            (meta.cnn_module_kernel - 1) as usize,
        ]);
        self.state = Some(StreamingState {
            offset,
            att_cache,
            cnn_cache,
            encoder_outs: Vec::new(),
            cached_feats: Vec::new(),
        });
    }

    /// A session running against the same loaded graphs but with fresh
    /// streaming state, ready for a new utterance.
    pub fn fork(&self) -> StreamingModel {
        let mut copy = StreamingModel {
            meta: self.meta.clone(),
            encoder: Arc::clone(&self.encoder),
            ctc: Arc::clone(&self.ctc),
            rescore: Arc::clone(&self.rescore),
            state: None,
        };
        copy.reset();
        copy
    }

    /// Feature frames needed before the next chunk can run: the first
    /// window also has to cover the subsampling right context. A
    /// non-positive chunk size means full-utterance decoding.
    pub fn num_frames_for_chunk(&self, start: bool) -> usize {
        if self.meta.chunk_size <= 0 {
            return usize::MAX;
        }
        if start {
            ((self.meta.chunk_size - 1) * self.meta.subsampling_rate
                + self.meta.right_context
                + 1) as usize
        } else {
            (self.meta.chunk_size * self.meta.subsampling_rate) as usize
        }
    }

    pub fn offset(&self) -> Option<i64> {
        self.state.as_ref().map(|s| s.offset)
    }

    pub fn att_cache(&self) -> Option<&Tensor<f32>> {
        self.state.as_ref().map(|s| &s.att_cache)
    }

    pub fn cnn_cache(&self) -> Option<&Tensor<f32>> {
        self.state.as_ref().map(|s| &s.cnn_cache)
    }

    pub fn num_encoder_chunks(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.encoder_outs.len())
    }

    /// Runs one encoder chunk followed by the CTC projection and returns
    /// per-frame symbol log-probabilities of shape `(frames, vocab)`.
    pub fn forward_chunk(&mut self, chunk_feats: &[Vec<f32>]) -> Result<Tensor<f32>> {
        let meta = self.meta.clone();
        let state = self
            .state
            .as_mut()
            .ok_or(AsrError::UninitializedModel)?;

        // Resplice the cached tail of the previous window in front of
        // the new frames.
        let spliced: Vec<&Vec<f32>> = state
            .cached_feats
            .iter()
            .chain(chunk_feats.iter())
            .collect();
        if spliced.is_empty() {
            return Err(AsrError::EmptyInput);
        }
        let feature_dim = spliced[0].len();
        let mut feats = Vec::with_capacity(spliced.len() * feature_dim);
        for frame in &spliced {
            if frame.len() != feature_dim {
                return Err(AsrError::Shape(format!(
                    "feature frame has dimension {} but expected {feature_dim}",
                    frame.len()
                )));
            }
            feats.extend_from_slice(frame);
        }
        let num_frames = spliced.len();
        drop(spliced);
        let chunk = Tensor::new(vec![1, num_frames, feature_dim], feats)
            .map_err(|e| AsrError::Shape(e.to_string()))?;

        let att_mask = build_att_mask(&meta, state.offset);

        let mut encoder = self.encoder.lock().unwrap_or_else(|e| e.into_inner());
        let declared = encoder.input_names().to_vec();
        let mut inputs: Vec<(&str, TensorValue)> = Vec::with_capacity(declared.len());
        for name in &declared {
            let Some(role) = EncoderInput::from_name(name) else {
                continue;
            };
            let value = match role {
                EncoderInput::Chunk => TensorValue::from(chunk.clone()),
                EncoderInput::Offset => TensorValue::scalar_i64(state.offset),
                EncoderInput::RequiredCacheSize => {
                    TensorValue::scalar_i64(meta.required_cache_size())
                }
                EncoderInput::AttCache => TensorValue::from(state.att_cache.clone()),
                EncoderInput::CnnCache => TensorValue::from(state.cnn_cache.clone()),
                EncoderInput::AttMask => match &att_mask {
                    Some(mask) => TensorValue::from(mask.clone()),
                    None => continue,
                },
            };
            inputs.push((name.as_str(), value));
        }
        let out_names = encoder.output_names().to_vec();
        if out_names.len() < 3 {
            return Err(AsrError::Shape(format!(
                "encoder declares {} outputs, expected encoder_out and two caches",
                out_names.len()
            )));
        }
        let mut outputs = encoder.run(&inputs)?;
        drop(encoder);

        let mut take = |name: &String| {
            outputs
                .remove(name)
                .ok_or_else(|| AsrError::Shape(format!("encoder output '{name}' missing")))
        };
        let encoder_out = take(&out_names[0])?;
        let att_cache = take(&out_names[1])?;
        let cnn_cache = take(&out_names[2])?;

        state.offset += encoder_out.dim(1) as i64;
        state.att_cache = att_cache;
        state.cnn_cache = cnn_cache;
        state.encoder_outs.push(encoder_out.clone());

        // Keep the window tail needed to resplice the next chunk.
        let cached_size = (1 + meta.right_context - meta.subsampling_rate).max(0) as usize;
        if cached_size > 0 && chunk_feats.len() >= cached_size {
            state.cached_feats = chunk_feats[chunk_feats.len() - cached_size..].to_vec();
        }

        self.ctc_log_probs(encoder_out)
    }

    /// Projects one chunk of encoder output to per-frame symbol
    /// log-probabilities, flattening the leading batch dimension.
    fn ctc_log_probs(&self, encoder_out: Tensor<f32>) -> Result<Tensor<f32>> {
        let mut ctc = self.ctc.lock().unwrap_or_else(|e| e.into_inner());
        let input_name = ctc
            .input_names()
            .first()
            .cloned()
            .ok_or_else(|| AsrError::Shape("ctc graph declares no inputs".to_string()))?;
        let output_name = ctc
            .output_names()
            .first()
            .cloned()
            .ok_or_else(|| AsrError::Shape("ctc graph declares no outputs".to_string()))?;
        let mut outputs = ctc.run(&[(input_name.as_str(), TensorValue::from(encoder_out))])?;
        drop(ctc);
        let log_probs = outputs
            .remove(&output_name)
            .ok_or_else(|| AsrError::Shape(format!("ctc output '{output_name}' missing")))?;
        let frames = log_probs.dim(1);
        let vocab = log_probs.dim(2);
        Tensor::new(vec![frames, vocab], log_probs.data)
            .map_err(|e| AsrError::Shape(e.to_string()))
    }
}

/// Attention mask over the cache-plus-chunk window. Positions of left
/// chunks that do not exist yet are masked off; once `left_chunks` real
/// chunks have been decoded the whole window is visible. No mask is
/// needed when the left context is unbounded.
pub(crate) fn build_att_mask(meta: &ModelMetadata, offset: i64) -> Option<Tensor<bool>> {
    if meta.left_chunks <= 0 {
        return None;
    }
    let window = (meta.required_cache_size() + meta.chunk_size) as usize;
    let mut mask = vec![true; window];
    let chunk_idx = offset / meta.chunk_size - meta.left_chunks;
    if chunk_idx < meta.left_chunks {
        let hidden = (((meta.left_chunks - chunk_idx) * meta.chunk_size) as usize).min(window);
        for slot in mask.iter_mut().take(hidden) {
            *slot = false;
        }
    }
    Some(Tensor {
        shape: vec![1, 1, window],
        data: mask,
    })
}
