//! Temporal smoothing of the raw emotion signal: a confidence gate in front
//! of a rolling majority vote, emitting a change flag when the winner moves.

use crate::classify::{Emotion, RawObservation};
use crate::util::RollingWindow;

pub const DEFAULT_WINDOW_SIZE: usize = 5;
pub const DEFAULT_CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Outcome of one sampled observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Observation {
    /// No usable signal: the window was not touched. The caller should
    /// downgrade the displayed state to its sentinel.
    Rejected,
    /// Accepted sample. `changed` is true when the majority label differs
    /// from the previously emitted one, including the very first emission.
    Stable { emotion: Emotion, changed: bool },
}

pub struct EmotionStabilizer {
    window: RollingWindow<Emotion>,
    threshold: f32,
    last_stable: Option<Emotion>,
}

impl EmotionStabilizer {
    pub fn new(window_size: usize, threshold: f32) -> Self {
        Self {
            window: RollingWindow::new(window_size),
            threshold,
            last_stable: None,
        }
    }

    pub fn observe(&mut self, raw: &RawObservation) -> Observation {
        let Some(label) = raw.label else {
            return Observation::Rejected;
        };
        if raw.confidence < self.threshold {
            return Observation::Rejected;
        }

        self.window.push(label);
        let emotion = self.majority(label);
        let changed = self.last_stable != Some(emotion);
        self.last_stable = Some(emotion);
        Observation::Stable { emotion, changed }
    }

    /// Highest occurrence count in the window wins. Ties go to the label
    /// whose most recent occurrence is newest.
    fn majority(&self, just_pushed: Emotion) -> Emotion {
        let mut tally: Vec<(Emotion, usize, usize)> = Vec::new();
        for (index, &label) in self.window.iter().enumerate() {
            match tally.iter_mut().find(|(l, _, _)| *l == label) {
                Some(entry) => {
                    entry.1 += 1;
                    entry.2 = index;
                }
                None => tally.push((label, 1, index)),
            }
        }
        tally
            .into_iter()
            .max_by_key(|&(_, count, last_index)| (count, last_index))
            .map(|(label, _, _)| label)
            .unwrap_or(just_pushed)
    }
}
