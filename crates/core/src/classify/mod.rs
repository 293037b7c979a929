mod remote;

use bytes::Bytes;
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use remote::RemoteEmotionClassifier;

/// Closed emotion vocabulary. Labels outside this set never enter the
/// smoothing window.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Emotion {
    Happy,
    Neutral,
    Surprise,
    Sad,
    Angry,
    Fear,
    Disgust,
}

impl Emotion {
    pub const ALL: [Emotion; 7] = [
        Emotion::Happy,
        Emotion::Neutral,
        Emotion::Surprise,
        Emotion::Sad,
        Emotion::Angry,
        Emotion::Fear,
        Emotion::Disgust,
    ];

    pub fn from_label(label: &str) -> Option<Emotion> {
        match label.trim().to_ascii_lowercase().as_str() {
            "happy" => Some(Emotion::Happy),
            "neutral" => Some(Emotion::Neutral),
            "surprise" => Some(Emotion::Surprise),
            "sad" => Some(Emotion::Sad),
            "angry" => Some(Emotion::Angry),
            "fear" => Some(Emotion::Fear),
            "disgust" => Some(Emotion::Disgust),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Emotion::Happy => "happy",
            Emotion::Neutral => "neutral",
            Emotion::Surprise => "surprise",
            Emotion::Sad => "sad",
            Emotion::Angry => "angry",
            Emotion::Fear => "fear",
            Emotion::Disgust => "disgust",
        }
    }

    /// The subset that gets a coping suggestion.
    pub fn is_negative(self) -> bool {
        matches!(
            self,
            Emotion::Sad | Emotion::Angry | Emotion::Fear | Emotion::Disgust
        )
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One sampled classifier result. `label == None` means no signal (no face,
/// or nothing recognizable); confidence is in [0, 1].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RawObservation {
    pub label: Option<Emotion>,
    pub confidence: f32,
}

impl RawObservation {
    pub fn new(emotion: Emotion, confidence: f32) -> Self {
        Self {
            label: Some(emotion),
            confidence,
        }
    }

    pub fn none() -> Self {
        Self {
            label: None,
            confidence: 0.0,
        }
    }
}

#[derive(thiserror::Error, Debug)]
pub enum ClassifyError {
    #[error("classifier request failed: {0}")]
    Network(#[from] reqwest::Error),
    #[error("classifier returned HTTP {0}")]
    Api(u16),
    #[error("classifier response malformed: {0}")]
    InvalidResponse(String),
}

pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, jpeg: Bytes) -> BoxFuture<'_, Result<RawObservation, ClassifyError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_labels_round_trip() {
        for emotion in Emotion::ALL {
            assert_eq!(Emotion::from_label(emotion.as_str()), Some(emotion));
        }
    }

    #[test]
    fn label_parsing_is_case_insensitive() {
        assert_eq!(Emotion::from_label("  HAPPY "), Some(Emotion::Happy));
        assert_eq!(Emotion::from_label("Disgust"), Some(Emotion::Disgust));
    }

    #[test]
    fn unknown_labels_are_dropped() {
        assert_eq!(Emotion::from_label("contempt"), None);
        assert_eq!(Emotion::from_label(""), None);
    }

    #[test]
    fn negative_subset_matches_suggestion_set() {
        let negative: Vec<_> = Emotion::ALL.into_iter().filter(|e| e.is_negative()).collect();
        assert_eq!(
            negative,
            vec![Emotion::Sad, Emotion::Angry, Emotion::Fear, Emotion::Disgust]
        );
    }
}
