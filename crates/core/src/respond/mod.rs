mod canned;
mod fallback;
mod openai;

use crate::classify::Emotion;
use futures::future::BoxFuture;

pub use canned::{pick_canned_joke, CannedJokes, FALLBACK_JOKES};
pub use fallback::FallbackJokeSource;
pub use openai::{OpenAiJokeClient, DEFAULT_JOKE_MODEL};

pub const UNKNOWN_MOOD: &str = "Unknown";

/// Fixed emotion-to-mood display table.
pub fn mood_label(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Happy => "Positive 😊",
        Emotion::Neutral => "Calm 😐",
        Emotion::Surprise => "Excited 😲",
        Emotion::Sad => "Low 😢",
        Emotion::Angry => "Stressed 😠",
        Emotion::Fear => "Anxious 😨",
        Emotion::Disgust => "Uncomfortable 😖",
    }
}

/// Supportive text for the negative subset; empty for everything else.
pub fn suggestion_for(emotion: Emotion) -> &'static str {
    match emotion {
        Emotion::Sad => "Take a deep breath and step outside for a minute 🌿",
        Emotion::Angry => "Pause for 10 seconds and unclench your jaw 🧘",
        Emotion::Fear => "Slow breathing helps, you are safe right now 💙",
        Emotion::Disgust => "Maybe a short break or some water would help 💧",
        _ => "",
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct MoodReading {
    pub mood: String,
    pub suggestion: String,
    pub joke: String,
}

#[derive(thiserror::Error, Debug)]
pub enum JokeError {
    #[error("joke request failed: {0}")]
    Network(String),
    #[error("joke service returned HTTP {0}")]
    Api(u16),
    #[error("joke response malformed: {0}")]
    InvalidResponse(String),
}

pub trait JokeSource: Send + Sync {
    fn tell(&self, emotion: Emotion) -> BoxFuture<'_, Result<String, JokeError>>;
}

impl JokeSource for Box<dyn JokeSource> {
    fn tell(&self, emotion: Emotion) -> BoxFuture<'_, Result<String, JokeError>> {
        (**self).tell(emotion)
    }
}

/// Maps a stable emotion to the displayed mood, suggestion and joke. The
/// joke is refreshed only on emotion transitions; otherwise the previous one
/// is carried forward untouched.
pub struct ResponseSelector<J> {
    jokes: J,
}

impl<J: JokeSource> ResponseSelector<J> {
    pub fn new(jokes: J) -> Self {
        Self { jokes }
    }

    pub async fn select(
        &self,
        emotion: Emotion,
        changed: bool,
        previous_joke: &str,
    ) -> MoodReading {
        let joke = if changed {
            match self.jokes.tell(emotion).await {
                Ok(joke) => joke,
                Err(e) => {
                    tracing::warn!(error = %e, "joke source failed, using canned joke");
                    pick_canned_joke()
                }
            }
        } else {
            previous_joke.to_owned()
        };

        MoodReading {
            mood: mood_label(emotion).to_owned(),
            suggestion: suggestion_for(emotion).to_owned(),
            joke,
        }
    }
}

/// Cleans up free text from the generator: trims, strips wrapping quotes,
/// splits run-together word boundaries and collapses whitespace runs.
pub fn normalize_generated(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('"').trim();
    let mut spaced = String::with_capacity(trimmed.len() + 8);
    let mut prev: Option<char> = None;
    for c in trimmed.chars() {
        if let Some(p) = prev {
            if p.is_lowercase() && c.is_uppercase() {
                spaced.push(' ');
            }
        }
        spaced.push(c);
        prev = Some(c);
    }
    spaced.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Clone)]
    struct CountingJokes {
        calls: Arc<AtomicUsize>,
    }

    impl JokeSource for CountingJokes {
        fn tell(&self, _emotion: Emotion) -> BoxFuture<'_, Result<String, JokeError>> {
            let n = self.calls.fetch_add(1, Ordering::Relaxed);
            async move { Ok(format!("joke-{n}")) }.boxed()
        }
    }

    #[derive(Clone)]
    struct BrokenJokes;

    impl JokeSource for BrokenJokes {
        fn tell(&self, _emotion: Emotion) -> BoxFuture<'_, Result<String, JokeError>> {
            async { Err(JokeError::Network("connection refused".into())) }.boxed()
        }
    }

    #[tokio::test]
    async fn joke_is_regenerated_only_on_transition() {
        let calls = Arc::new(AtomicUsize::new(0));
        let selector = ResponseSelector::new(CountingJokes {
            calls: calls.clone(),
        });

        let first = selector.select(Emotion::Happy, true, "").await;
        assert_eq!(first.joke, "joke-0");

        let second = selector.select(Emotion::Happy, false, &first.joke).await;
        assert_eq!(second.joke, first.joke);
        assert_eq!(calls.load(Ordering::Relaxed), 1);

        let third = selector.select(Emotion::Sad, true, &second.joke).await;
        assert_eq!(third.joke, "joke-1");
    }

    #[tokio::test]
    async fn suggestion_is_non_empty_iff_negative() {
        let selector = ResponseSelector::new(CannedJokes);
        for emotion in Emotion::ALL {
            let reading = selector.select(emotion, false, "").await;
            assert_eq!(
                !reading.suggestion.is_empty(),
                emotion.is_negative(),
                "suggestion mismatch for {emotion}"
            );
        }
    }

    #[tokio::test]
    async fn broken_source_still_yields_a_canned_joke() {
        let selector = ResponseSelector::new(BrokenJokes);
        let reading = selector.select(Emotion::Angry, true, "").await;
        assert!(FALLBACK_JOKES.contains(&reading.joke.as_str()));
    }

    #[test]
    fn mood_table_covers_the_vocabulary() {
        for emotion in Emotion::ALL {
            assert_ne!(mood_label(emotion), UNKNOWN_MOOD);
        }
    }

    #[test]
    fn normalization_splits_run_together_words() {
        assert_eq!(
            normalize_generated("Why did theComputer nap? ItWas tired."),
            "Why did the Computer nap? It Was tired."
        );
    }

    #[test]
    fn normalization_collapses_whitespace_and_quotes() {
        assert_eq!(
            normalize_generated("  \"A joke   with \n gaps\"  "),
            "A joke with gaps"
        );
    }

    #[test]
    fn normalization_leaves_clean_text_alone() {
        assert_eq!(
            normalize_generated("Why was the laptop calm? It had good cache control."),
            "Why was the laptop calm? It had good cache control."
        );
    }
}
