use crate::classify::Emotion;
use crate::respond::{JokeError, JokeSource};
use futures::future::BoxFuture;
use futures::FutureExt;

const LOG_TARGET: &str = "respond::fallback";

/// Tries the primary joke source and falls back to the local one on any
/// error. Text generation is strictly best-effort: this wrapper only fails
/// if the local source does, which the canned source never does.
#[derive(Clone)]
pub struct FallbackJokeSource<P, L> {
    primary: P,
    local: L,
}

impl<P, L> FallbackJokeSource<P, L>
where
    P: JokeSource,
    L: JokeSource,
{
    pub fn new(primary: P, local: L) -> Self {
        Self { primary, local }
    }
}

impl<P, L> JokeSource for FallbackJokeSource<P, L>
where
    P: JokeSource + 'static,
    L: JokeSource + 'static,
{
    fn tell(&self, emotion: Emotion) -> BoxFuture<'_, Result<String, JokeError>> {
        async move {
            match self.primary.tell(emotion).await {
                Ok(joke) => Ok(joke),
                Err(e) => {
                    tracing::warn!(target: LOG_TARGET, error = %e, "joke service failed, serving local joke");
                    self.local.tell(emotion).await
                }
            }
        }
        .boxed()
    }
}
