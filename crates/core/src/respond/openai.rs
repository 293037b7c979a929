use crate::classify::Emotion;
use crate::respond::{mood_label, normalize_generated, JokeError, JokeSource};
use crate::util::{is_http_retryable, Backoff};
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_JOKE_MODEL: &str = "gpt-4o-mini";

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const JOKE_TIMEOUT: Duration = Duration::from_secs(8);
const JOKE_TEMPERATURE: f32 = 0.9;
const JOKE_MAX_TOKENS: u32 = 80;

/// Chat-completions client for joke generation. Bounded by a per-request
/// timeout and a small retry budget; callers wrap it in a fallback source so
/// a failure here is never visible to the end user.
#[derive(Clone)]
pub struct OpenAiJokeClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl OpenAiJokeClient {
    pub fn new(api_key: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_JOKE_MODEL.to_string(),
        }
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }

    async fn request_joke(&self, emotion: Emotion) -> Result<String, JokeError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: joke_prompt(emotion),
            }],
            temperature: JOKE_TEMPERATURE,
            max_tokens: JOKE_MAX_TOKENS,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .timeout(JOKE_TIMEOUT)
            .json(&request)
            .send()
            .await
            .map_err(|e| JokeError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(JokeError::Api(response.status().as_u16()));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| JokeError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| JokeError::InvalidResponse("no choices in response".to_string()))?;

        let joke = normalize_generated(&text);
        if joke.is_empty() {
            return Err(JokeError::InvalidResponse("empty completion".to_string()));
        }
        Ok(joke)
    }
}

fn joke_prompt(emotion: Emotion) -> String {
    format!(
        "Tell one short, wholesome joke for someone whose mood reads \"{}\". \
         One or two sentences, no preamble.",
        mood_label(emotion)
    )
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl JokeSource for OpenAiJokeClient {
    fn tell(&self, emotion: Emotion) -> BoxFuture<'_, Result<String, JokeError>> {
        let this = self.clone();
        async move {
            Backoff::default()
                .run(
                    || this.request_joke(emotion),
                    |e| match e {
                        JokeError::Network(_) => true,
                        JokeError::Api(status) => is_http_retryable(*status),
                        JokeError::InvalidResponse(_) => false,
                    },
                )
                .await
        }
        .boxed()
    }
}
