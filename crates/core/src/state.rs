use crate::classify::Emotion;
use crate::respond::{MoodReading, UNKNOWN_MOOD};
use serde::Serialize;

pub const DETECTING_SENTINEL: &str = "detecting";
pub const NO_FACE_SENTINEL: &str = "no face detected";

/// The single published snapshot. Written only by the orchestration loop and
/// read whole by every presentation surface, so a reader can never observe a
/// mood from one tick next to a joke from another.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct StableState {
    pub emotion: String,
    pub mood: String,
    pub suggestion: String,
    pub joke: String,
    pub face_detected: bool,
}

impl StableState {
    /// Startup value, before the first accepted classification.
    pub fn detecting() -> Self {
        Self {
            emotion: DETECTING_SENTINEL.to_string(),
            mood: UNKNOWN_MOOD.to_string(),
            suggestion: String::new(),
            joke: String::new(),
            face_detected: false,
        }
    }

    /// Downgrade after a classification failure or gate rejection.
    pub fn no_face() -> Self {
        Self {
            emotion: NO_FACE_SENTINEL.to_string(),
            mood: UNKNOWN_MOOD.to_string(),
            suggestion: String::new(),
            joke: String::new(),
            face_detected: false,
        }
    }

    pub fn from_reading(emotion: Emotion, reading: MoodReading) -> Self {
        Self {
            emotion: emotion.as_str().to_string(),
            mood: reading.mood,
            suggestion: reading.suggestion,
            joke: reading.joke,
            face_detected: true,
        }
    }
}
