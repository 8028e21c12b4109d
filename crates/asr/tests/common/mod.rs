#![allow(dead_code)]

use asr::{ModelMetadata, StreamingModel};
use base::Tensor;
use infer::{InferError, Session, TensorValue};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

/// CTC vocabulary of the fake model; symbol 0 is the blank.
pub const VOCAB: usize = 6;
/// Output vocabulary of the fake rescoring decoder.
pub const DECODE_VOCAB: usize = 12;

pub fn metadata_map() -> HashMap<String, String> {
    [
        ("output_size", "256"),
        ("num_blocks", "12"),
        ("head", "4"),
        ("cnn_module_kernel", "15"),
        ("subsampling_rate", "4"),
        ("right_context", "6"),
        ("sos_symbol", "2"),
        ("eos_symbol", "2"),
        ("is_bidirectional_decoder", "1"),
        ("chunk_size", "16"),
        ("left_chunks", "4"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

pub fn metadata_from(map: &HashMap<String, String>) -> ModelMetadata {
    ModelMetadata::from_lookup(|key| map.get(key).cloned()).unwrap()
}

pub fn metadata() -> ModelMetadata {
    metadata_from(&metadata_map())
}

pub fn frames(count: usize, dim: usize) -> Vec<Vec<f32>> {
    (0..count).map(|i| vec![0.01 * i as f32; dim]).collect()
}

/// Observation points into the fake sessions, usable after the sessions
/// have been moved into a model.
pub struct Handles {
    pub encoder_calls: Arc<AtomicUsize>,
    /// Frame count of the last encoder input window, after resplicing.
    pub encoder_frames: Arc<AtomicUsize>,
    /// Masked-off position count of the last attention mask, `None` when
    /// no mask was passed.
    pub mask_hidden: Arc<Mutex<Option<usize>>>,
    /// Cache-size scalar the encoder was last asked for.
    pub requested_cache: Arc<Mutex<Option<i64>>>,
    pub rescore_calls: Arc<AtomicUsize>,
    pub rescore_hyps: Arc<Mutex<Option<Tensor<i64>>>>,
    pub rescore_lens: Arc<Mutex<Option<Tensor<i64>>>>,
}

pub fn fake_model() -> (StreamingModel, Handles) {
    fake_model_with(metadata())
}

static LOGGING: Once = Once::new();

pub fn fake_model_with(meta: ModelMetadata) -> (StreamingModel, Handles) {
    LOGGING.call_once(base::init_stdout_logger);
    let encoder = FakeEncoder::new(&meta);
    let ctc = FakeCtc::new(meta.output_size as usize);
    let rescorer = FakeRescorer::new();
    let handles = Handles {
        encoder_calls: Arc::clone(&encoder.calls),
        encoder_frames: Arc::clone(&encoder.frames),
        mask_hidden: Arc::clone(&encoder.mask_hidden),
        requested_cache: Arc::clone(&encoder.requested_cache),
        rescore_calls: Arc::clone(&rescorer.calls),
        rescore_hyps: Arc::clone(&rescorer.hyps),
        rescore_lens: Arc::clone(&rescorer.lens),
    };
    let model = StreamingModel::new(meta, Box::new(encoder), Box::new(ctc), Box::new(rescorer));
    (model, handles)
}

fn find<'a>(inputs: &'a [(&str, TensorValue)], name: &str) -> Option<&'a TensorValue> {
    inputs.iter().find(|(n, _)| *n == name).map(|(_, v)| v)
}

fn f32_input<'a>(inputs: &'a [(&str, TensorValue)], name: &str) -> &'a Tensor<f32> {
    match find(inputs, name) {
        Some(TensorValue::F32(t)) => t,
        other => panic!("input '{name}' missing or not f32: {other:?}"),
    }
}

fn i64_input<'a>(inputs: &'a [(&str, TensorValue)], name: &str) -> &'a Tensor<i64> {
    match find(inputs, name) {
        Some(TensorValue::I64(t)) => t,
        other => panic!("input '{name}' missing or not i64: {other:?}"),
    }
}

/// Stands in for the exported encoder graph. The output is a
/// deterministic function of the offset so that identical input
/// sequences replay to identical outputs, and both caches evolve by a
/// fixed increment per call.
pub struct FakeEncoder {
    input_names: Vec<String>,
    output_names: Vec<String>,
    subsampling: usize,
    output_size: usize,
    pub calls: Arc<AtomicUsize>,
    pub frames: Arc<AtomicUsize>,
    pub mask_hidden: Arc<Mutex<Option<usize>>>,
    pub requested_cache: Arc<Mutex<Option<i64>>>,
}

impl FakeEncoder {
    pub fn new(meta: &ModelMetadata) -> Self {
        Self {
            input_names: [
                "chunk",
                "offset",
                "required_cache_size",
                "att_cache",
                "cnn_cache",
                "att_mask",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            output_names: ["output", "r_att_cache", "r_cnn_cache"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            subsampling: meta.subsampling_rate as usize,
            output_size: meta.output_size as usize,
            calls: Arc::new(AtomicUsize::new(0)),
            frames: Arc::new(AtomicUsize::new(0)),
            mask_hidden: Arc::new(Mutex::new(None)),
            requested_cache: Arc::new(Mutex::new(None)),
        }
    }
}

impl Session for FakeEncoder {
    fn run(
        &mut self,
        inputs: &[(&str, TensorValue)],
    ) -> Result<HashMap<String, Tensor<f32>>, InferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let chunk = f32_input(inputs, "chunk");
        let offset = i64_input(inputs, "offset").data[0];
        let att_cache = f32_input(inputs, "att_cache");
        let cnn_cache = f32_input(inputs, "cnn_cache");
        self.frames.store(chunk.dim(1), Ordering::SeqCst);
        *self.requested_cache.lock().unwrap() =
            Some(i64_input(inputs, "required_cache_size").data[0]);
        *self.mask_hidden.lock().unwrap() = match find(inputs, "att_mask") {
            Some(TensorValue::Bool(mask)) => Some(mask.data.iter().filter(|v| !**v).count()),
            _ => None,
        };

        let frames_out = chunk.dim(1) / self.subsampling;
        let out: Vec<f32> = (0..frames_out * self.output_size)
            .map(|i| offset as f32 + i as f32 * 0.001)
            .collect();
        let r_att: Vec<f32> = att_cache.data.iter().map(|v| v + 1.0).collect();
        let r_cnn: Vec<f32> = cnn_cache.data.iter().map(|v| v + 0.5).collect();

        let mut outputs = HashMap::new();
        outputs.insert(
            "output".to_string(),
            Tensor::new(vec![1, frames_out, self.output_size], out).unwrap(),
        );
        outputs.insert(
            "r_att_cache".to_string(),
            Tensor::new(att_cache.shape.clone(), r_att).unwrap(),
        );
        outputs.insert(
            "r_cnn_cache".to_string(),
            Tensor::new(cnn_cache.shape.clone(), r_cnn).unwrap(),
        );
        Ok(outputs)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

/// Stands in for the CTC projection graph. Frame `f` peaks at symbol
/// `f % VOCAB`; a data-dependent term that is constant within the frame
/// keeps the output sensitive to the encoder without moving the argmax.
pub struct FakeCtc {
    input_names: Vec<String>,
    output_names: Vec<String>,
    hidden_size: usize,
}

impl FakeCtc {
    pub fn new(hidden_size: usize) -> Self {
        Self {
            input_names: vec!["hidden".to_string()],
            output_names: vec!["probs".to_string()],
            hidden_size,
        }
    }
}

impl Session for FakeCtc {
    fn run(
        &mut self,
        inputs: &[(&str, TensorValue)],
    ) -> Result<HashMap<String, Tensor<f32>>, InferError> {
        let hidden = f32_input(inputs, "hidden");
        let frames = hidden.dim(1);
        let mut probs = Vec::with_capacity(frames * VOCAB);
        for f in 0..frames {
            let bias = hidden.data[f * self.hidden_size] * 0.001;
            for v in 0..VOCAB {
                probs.push(bias + if v == f % VOCAB { 1.0 } else { 0.0 });
            }
        }
        let mut outputs = HashMap::new();
        outputs.insert(
            "probs".to_string(),
            Tensor::new(vec![1, frames, VOCAB], probs).unwrap(),
        );
        Ok(outputs)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}

/// Per-step score of candidate `i`, step `j`, symbol `v` in the fake
/// forward decoder output. Tests compute expected sums from the same
/// formula.
pub fn fwd_score(i: usize, j: usize, v: usize) -> f32 {
    i as f32 * 100.0 + j as f32 + v as f32 * 0.01
}

/// Same for the reversed-direction output.
pub fn bwd_score(i: usize, j: usize, v: usize) -> f32 {
    i as f32 * 100.0 + j as f32 + v as f32 * 0.02
}

/// Stands in for the attention rescoring graph. Records the hypothesis
/// matrix and lengths it receives and emits scores from `fwd_score` and
/// `bwd_score`.
pub struct FakeRescorer {
    input_names: Vec<String>,
    output_names: Vec<String>,
    pub calls: Arc<AtomicUsize>,
    pub hyps: Arc<Mutex<Option<Tensor<i64>>>>,
    pub lens: Arc<Mutex<Option<Tensor<i64>>>>,
}

impl FakeRescorer {
    pub fn new() -> Self {
        Self {
            input_names: ["hyps", "hyps_lens", "encoder_out"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            output_names: ["score", "r_score"].iter().map(|s| s.to_string()).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
            hyps: Arc::new(Mutex::new(None)),
            lens: Arc::new(Mutex::new(None)),
        }
    }
}

impl Session for FakeRescorer {
    fn run(
        &mut self,
        inputs: &[(&str, TensorValue)],
    ) -> Result<HashMap<String, Tensor<f32>>, InferError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let hyps = i64_input(inputs, "hyps");
        let lens = i64_input(inputs, "hyps_lens");
        let _encoder_out = f32_input(inputs, "encoder_out");
        let num_hyps = hyps.dim(0);
        let max_len = hyps.dim(1);
        *self.hyps.lock().unwrap() = Some(hyps.clone());
        *self.lens.lock().unwrap() = Some(lens.clone());

        let mut score = Vec::with_capacity(num_hyps * max_len * DECODE_VOCAB);
        let mut r_score = Vec::with_capacity(num_hyps * max_len * DECODE_VOCAB);
        for i in 0..num_hyps {
            for j in 0..max_len {
                for v in 0..DECODE_VOCAB {
                    score.push(fwd_score(i, j, v));
                    r_score.push(bwd_score(i, j, v));
                }
            }
        }
        let shape = vec![num_hyps, max_len, DECODE_VOCAB];
        let mut outputs = HashMap::new();
        outputs.insert(
            "score".to_string(),
            Tensor::new(shape.clone(), score).unwrap(),
        );
        outputs.insert("r_score".to_string(), Tensor::new(shape, r_score).unwrap());
        Ok(outputs)
    }

    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }
}
