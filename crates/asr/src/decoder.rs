use crate::error::Result;
use crate::model::StreamingModel;
use crate::search::Search;
use base::log_debug;
use serde::Serialize;
use std::collections::VecDeque;

/// Outcome of one decoding step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// Not enough buffered frames for a chunk and more input is expected.
    WaitFeats,
    /// A chunk was decoded; partial results are available.
    EndBatch,
    /// A chunk was decoded and the search detected a mid-utterance endpoint.
    Endpoint,
    /// Input is finished and final, rescored results are available.
    EndFeats,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecodeResult {
    pub tokens: Vec<i64>,
    pub score: f32,
}

/// Single-utterance decoding loop: buffers feature frames, runs the
/// model chunk by chunk through a `Search`, and rescores once the input
/// is finished. Single-threaded; the caller drives it by alternating
/// `accept_frames` and `step`.
pub struct DecodeSession {
    model: StreamingModel,
    search: Box<dyn Search>,
    feature_buffer: VecDeque<Vec<f32>>,
    reverse_weight: f32,
    input_finished: bool,
    started: bool,
    finished: bool,
    results: Vec<DecodeResult>,
}

impl DecodeSession {
    pub fn new(mut model: StreamingModel, search: Box<dyn Search>, reverse_weight: f32) -> Self {
        model.reset();
        Self {
            model,
            search,
            feature_buffer: VecDeque::new(),
            reverse_weight,
            input_finished: false,
            started: false,
            finished: false,
            results: Vec::new(),
        }
    }

    pub fn accept_frames<I>(&mut self, frames: I)
    where
        I: IntoIterator<Item = Vec<f32>>,
    {
        self.feature_buffer.extend(frames);
    }

    /// Marks the feature stream as complete. The next `step` calls drain
    /// the remaining buffer, ending with a short final chunk if needed.
    pub fn set_input_finished(&mut self) {
        self.input_finished = true;
    }

    pub fn results(&self) -> &[DecodeResult] {
        &self.results
    }

    pub fn model(&self) -> &StreamingModel {
        &self.model
    }

    /// Decodes at most one chunk. After `EndFeats` further calls return
    /// `EndFeats` without running anything again.
    pub fn step(&mut self) -> Result<DecodeState> {
        if self.finished {
            return Ok(DecodeState::EndFeats);
        }
        let required = self.model.num_frames_for_chunk(!self.started);
        if self.feature_buffer.len() < required {
            if !self.input_finished {
                return Ok(DecodeState::WaitFeats);
            }
            if self.feature_buffer.is_empty() {
                self.finish()?;
                return Ok(DecodeState::EndFeats);
            }
        }
        let take = required.min(self.feature_buffer.len());
        let frames: Vec<Vec<f32>> = self.feature_buffer.drain(..take).collect();
        log_debug!("decoding chunk of {} frames", frames.len());
        let log_probs = self.model.forward_chunk(&frames)?;
        self.started = true;
        self.search.search(&log_probs);
        self.results = self
            .search
            .hypotheses()
            .into_iter()
            .map(|tokens| DecodeResult { tokens, score: 0.0 })
            .collect();
        if self.search.endpoint_detected() {
            Ok(DecodeState::Endpoint)
        } else {
            Ok(DecodeState::EndBatch)
        }
    }

    fn finish(&mut self) -> Result<()> {
        self.search.finalize();
        let hyps = self.search.hypotheses();
        let scores = self.model.attention_rescoring(&hyps, self.reverse_weight)?;
        let mut results: Vec<DecodeResult> = hyps
            .into_iter()
            .zip(scores)
            .map(|(tokens, score)| DecodeResult { tokens, score })
            .collect();
        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self.results = results;
        self.finished = true;
        Ok(())
    }

    /// Prepares the session for a new utterance on the same loaded model.
    pub fn reset(&mut self) {
        self.model.reset();
        self.search.reset();
        self.feature_buffer.clear();
        self.results.clear();
        self.input_finished = false;
        self.started = false;
        self.finished = false;
    }

    /// A fresh session over the same loaded graphs, for decoding another
    /// utterance concurrently with this one.
    pub fn fork(&self, search: Box<dyn Search>) -> DecodeSession {
        DecodeSession::new(self.model.fork(), search, self.reverse_weight)
    }
}
