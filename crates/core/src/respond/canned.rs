use crate::classify::Emotion;
use crate::respond::{JokeError, JokeSource};
use futures::future::BoxFuture;
use futures::FutureExt;
use rand::seq::IndexedRandom;

/// Local joke list used whenever the text-generation service is missing or
/// failing.
pub const FALLBACK_JOKES: [&str; 4] = [
    "Why don't computers ever get tired? They take power naps ⚡😄",
    "I told my code a joke... it didn't laugh, but it executed 😂",
    "Why was the laptop calm? It had good cache control 😎",
    "Even WiFi disconnects sometimes, it's okay 😄",
];

pub fn pick_canned_joke() -> String {
    FALLBACK_JOKES
        .choose(&mut rand::rng())
        .copied()
        .unwrap_or(FALLBACK_JOKES[0])
        .to_owned()
}

#[derive(Clone, Copy, Debug, Default)]
pub struct CannedJokes;

impl JokeSource for CannedJokes {
    fn tell(&self, _emotion: Emotion) -> BoxFuture<'_, Result<String, JokeError>> {
        async { Ok(pick_canned_joke()) }.boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn always_serves_from_the_fixed_list() {
        for _ in 0..20 {
            let joke = CannedJokes.tell(Emotion::Happy).await.expect("never fails");
            assert!(FALLBACK_JOKES.contains(&joke.as_str()));
        }
    }
}
