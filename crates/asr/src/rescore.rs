use crate::error::{AsrError, Result};
use crate::model::StreamingModel;
use base::{Tensor, log_warn};
use infer::TensorValue;

/// Input roles of the attention rescoring graph, bound by declared name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DecoderInput {
    Hyps,
    HypsLens,
    EncoderOut,
}

impl DecoderInput {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "hyps" => Some(Self::Hyps),
            "hyps_lens" => Some(Self::HypsLens),
            "encoder_out" => Some(Self::EncoderOut),
            _ => None,
        }
    }
}

/// Rows of the decoder input matrix: each hypothesis prefixed with the
/// start symbol and right-padded with zeros to `max_len`. A hypothesis
/// already at `max_len` gets no padding.
pub(crate) fn pad_hypotheses(hyps: &[Vec<i64>], sos: i64, max_len: usize) -> Vec<i64> {
    let mut padded = Vec::with_capacity(hyps.len() * max_len);
    for hyp in hyps {
        padded.push(sos);
        padded.extend_from_slice(hyp);
        padded.resize(padded.len() + max_len - (hyp.len() + 1), 0);
    }
    padded
}

/// Sum of per-step log-probabilities of the hypothesis tokens plus the
/// end-of-sequence term at the step after the last token.
pub(crate) fn attention_score(prob: &[f32], hyp: &[i64], eos: i64, decode_out_len: usize) -> f32 {
    let mut score = 0.0f32;
    for (step, &token) in hyp.iter().enumerate() {
        score += prob[step * decode_out_len + token as usize];
    }
    score + prob[hyp.len() * decode_out_len + eos as usize]
}

impl StreamingModel {
    /// Second-pass attention score for each candidate, blending forward
    /// and reversed decoder scores by `reverse_weight`. Candidates are
    /// scored against the full encoder output recorded so far; without
    /// any decoded chunks every score is zero and the graph never runs.
    pub fn attention_rescoring(&self, hyps: &[Vec<i64>], reverse_weight: f32) -> Result<Vec<f32>> {
        let num_hyps = hyps.len();
        if num_hyps == 0 {
            return Ok(Vec::new());
        }
        let meta = self.metadata().clone();
        let Some(state) = self.state.as_ref() else {
            return Ok(vec![0.0; num_hyps]);
        };
        if state.encoder_outs.is_empty() {
            return Ok(vec![0.0; num_hyps]);
        }

        // One decoder step per token plus the start symbol.
        let hyps_lens: Vec<i64> = hyps.iter().map(|h| h.len() as i64 + 1).collect();
        let max_len = hyps_lens.iter().copied().max().unwrap_or(1) as usize;

        let output_size = meta.output_size as usize;
        let mut encoder_seq = Vec::new();
        let mut encoder_len = 0usize;
        for chunk in &state.encoder_outs {
            encoder_seq.extend_from_slice(&chunk.data);
            encoder_len += chunk.dim(1);
        }
        let encoder_out = Tensor::new(vec![1, encoder_len, output_size], encoder_seq)
            .map_err(|e| AsrError::Shape(e.to_string()))?;
        let hyps_pad = Tensor::new(
            vec![num_hyps, max_len],
            pad_hypotheses(hyps, meta.sos, max_len),
        )
        .map_err(|e| AsrError::Shape(e.to_string()))?;
        let lens = Tensor::new(vec![num_hyps], hyps_lens).map_err(|e| AsrError::Shape(e.to_string()))?;

        let mut session = self.rescore.lock().unwrap_or_else(|e| e.into_inner());
        let declared = session.input_names().to_vec();
        let mut inputs: Vec<(&str, TensorValue)> = Vec::with_capacity(declared.len());
        for name in &declared {
            let Some(role) = DecoderInput::from_name(name) else {
                continue;
            };
            let value = match role {
                DecoderInput::Hyps => TensorValue::from(hyps_pad.clone()),
                DecoderInput::HypsLens => TensorValue::from(lens.clone()),
                DecoderInput::EncoderOut => TensorValue::from(encoder_out.clone()),
            };
            inputs.push((name.as_str(), value));
        }
        let out_names = session.output_names().to_vec();
        if out_names.is_empty() {
            return Err(AsrError::Shape(
                "rescoring graph declares no outputs".to_string(),
            ));
        }
        let mut outputs = session.run(&inputs)?;
        drop(session);

        let forward = outputs
            .remove(&out_names[0])
            .ok_or_else(|| AsrError::Shape(format!("rescoring output '{}' missing", out_names[0])))?;
        let backward = out_names.get(1).and_then(|name| outputs.remove(name));
        if meta.is_bidirectional_decoder && reverse_weight > 0.0 && backward.is_none() {
            log_warn!("bidirectional rescoring requested but the graph declares one output");
        }

        let decode_out_len = forward.dim(2);
        let mut scores = Vec::with_capacity(num_hyps);
        for (i, hyp) in hyps.iter().enumerate() {
            let row = i * max_len * decode_out_len;
            let fwd = attention_score(&forward.data[row..], hyp, meta.eos, decode_out_len);
            let mut bwd = 0.0f32;
            if meta.is_bidirectional_decoder && reverse_weight > 0.0 {
                if let Some(backward) = &backward {
                    let reversed: Vec<i64> = hyp.iter().rev().copied().collect();
                    bwd = attention_score(&backward.data[row..], &reversed, meta.eos, decode_out_len);
                }
            }
            scores.push(fwd * (1.0 - reverse_weight) + bwd * reverse_weight);
        }
        Ok(scores)
    }
}
