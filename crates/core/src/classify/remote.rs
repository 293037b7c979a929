use crate::classify::{ClassifyError, Emotion, EmotionClassifier, RawObservation};
use bytes::Bytes;
use futures::future::BoxFuture;
use futures::FutureExt;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

const CLASSIFY_TIMEOUT: Duration = Duration::from_secs(10);

/// Client for the sidecar emotion-inference service. Sends the sampled JPEG
/// and reads back per-label scores; the caller only ever sees the top known
/// label and its confidence.
#[derive(Clone)]
pub struct RemoteEmotionClassifier {
    client: Client,
    base_url: String,
}

impl RemoteEmotionClassifier {
    pub fn new(base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
        }
    }
}

#[derive(Deserialize)]
struct ClassifyResponse {
    #[serde(default = "default_true")]
    face_detected: bool,
    #[serde(default)]
    scores: HashMap<String, f32>,
}

fn default_true() -> bool {
    true
}

/// Derives the observation from a service response. Unknown labels are
/// skipped; scores above 1.0 are read as percentages.
fn observation_from_response(response: &ClassifyResponse) -> RawObservation {
    if !response.face_detected {
        return RawObservation::none();
    }
    let top = response
        .scores
        .iter()
        .filter_map(|(label, score)| Emotion::from_label(label).map(|e| (e, *score)))
        .max_by(|a, b| a.1.total_cmp(&b.1));
    match top {
        Some((emotion, score)) => RawObservation::new(emotion, normalize_score(score)),
        None => RawObservation::none(),
    }
}

fn normalize_score(score: f32) -> f32 {
    let score = if score > 1.0 { score / 100.0 } else { score };
    score.clamp(0.0, 1.0)
}

impl EmotionClassifier for RemoteEmotionClassifier {
    fn classify(&self, jpeg: Bytes) -> BoxFuture<'_, Result<RawObservation, ClassifyError>> {
        let this = self.clone();
        async move {
            let url = format!("{}/v1/classify", this.base_url.trim_end_matches('/'));
            let response = this
                .client
                .post(&url)
                .header("Content-Type", "image/jpeg")
                .timeout(CLASSIFY_TIMEOUT)
                .body(jpeg)
                .send()
                .await?;

            if !response.status().is_success() {
                return Err(ClassifyError::Api(response.status().as_u16()));
            }

            let parsed: ClassifyResponse = response
                .json()
                .await
                .map_err(|e| ClassifyError::InvalidResponse(e.to_string()))?;

            Ok(observation_from_response(&parsed))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(face_detected: bool, scores: &[(&str, f32)]) -> ClassifyResponse {
        ClassifyResponse {
            face_detected,
            scores: scores
                .iter()
                .map(|(label, score)| (label.to_string(), *score))
                .collect(),
        }
    }

    #[test]
    fn picks_top_known_label() {
        let obs = observation_from_response(&response(
            true,
            &[("happy", 0.7), ("sad", 0.2), ("neutral", 0.1)],
        ));
        assert_eq!(obs.label, Some(Emotion::Happy));
        assert!((obs.confidence - 0.7).abs() < 1e-6);
    }

    #[test]
    fn percentage_scores_are_normalized() {
        let obs = observation_from_response(&response(true, &[("angry", 92.0)]));
        assert_eq!(obs.label, Some(Emotion::Angry));
        assert!((obs.confidence - 0.92).abs() < 1e-6);
    }

    #[test]
    fn no_face_means_no_signal() {
        let obs = observation_from_response(&response(false, &[("happy", 0.9)]));
        assert_eq!(obs, RawObservation::none());
    }

    #[test]
    fn unknown_labels_alone_mean_no_signal() {
        let obs = observation_from_response(&response(true, &[("contempt", 0.9)]));
        assert_eq!(obs, RawObservation::none());
    }

    #[test]
    fn unknown_labels_do_not_outrank_known_ones() {
        let obs = observation_from_response(&response(
            true,
            &[("contempt", 0.9), ("surprise", 0.4)],
        ));
        assert_eq!(obs.label, Some(Emotion::Surprise));
    }
}
