use base::Tensor;

/// Frame-synchronous search over per-frame symbol log-probabilities.
/// Implementations own their candidate list; endpointing policy, when
/// any, also lives here.
pub trait Search {
    /// Consumes one chunk of log-probabilities of shape `(frames, vocab)`.
    fn search(&mut self, log_probs: &Tensor<f32>);

    /// Called once after the last chunk, before final hypotheses are read.
    fn finalize(&mut self) {}

    /// Current candidate token sequences, best first.
    fn hypotheses(&self) -> Vec<Vec<i64>>;

    /// Whether a mid-utterance endpoint was detected in the frames
    /// consumed so far.
    fn endpoint_detected(&self) -> bool {
        false
    }

    fn reset(&mut self);
}

/// Per-frame argmax with CTC blank and repeat collapse. Produces a
/// single hypothesis.
pub struct GreedySearch {
    blank: i64,
    prev: i64,
    hyp: Vec<i64>,
}

impl GreedySearch {
    pub fn new(blank: i64) -> Self {
        Self {
            blank,
            prev: blank,
            hyp: Vec::new(),
        }
    }
}

impl Search for GreedySearch {
    fn search(&mut self, log_probs: &Tensor<f32>) {
        let vocab = log_probs.dim(1);
        if vocab == 0 {
            return;
        }
        for frame in log_probs.data.chunks(vocab) {
            let best = argmax(frame);
            if best != self.blank && best != self.prev {
                self.hyp.push(best);
            }
            self.prev = best;
        }
    }

    fn hypotheses(&self) -> Vec<Vec<i64>> {
        vec![self.hyp.clone()]
    }

    fn reset(&mut self) {
        self.prev = self.blank;
        self.hyp.clear();
    }
}

fn argmax(values: &[f32]) -> i64 {
    let mut best = 0usize;
    for (i, value) in values.iter().enumerate() {
        if *value > values[best] {
            best = i;
        }
    }
    best as i64
}
