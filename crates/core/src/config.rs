pub use crate::stabilize::{DEFAULT_CONFIDENCE_THRESHOLD, DEFAULT_WINDOW_SIZE};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const DEFAULT_SAMPLE_INTERVAL: u32 = 15;
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5000";
pub const DEFAULT_CLASSIFIER_URL: &str = "http://127.0.0.1:8500";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_CAMERA_INDEX: &str = "MOOD_MIRROR_CAMERA_INDEX";
pub const ENV_SAMPLE_INTERVAL: &str = "MOOD_MIRROR_SAMPLE_INTERVAL";
pub const ENV_WINDOW_SIZE: &str = "MOOD_MIRROR_WINDOW_SIZE";
pub const ENV_CONFIDENCE_THRESHOLD: &str = "MOOD_MIRROR_CONFIDENCE_THRESHOLD";
pub const ENV_CLASSIFIER_URL: &str = "MOOD_MIRROR_CLASSIFIER_URL";

/// Every how many captured frames one is classified.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SampleInterval(u32);

impl SampleInterval {
    pub fn new(value: u32) -> Result<Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::ZeroSampleInterval);
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> u32 {
        self.0
    }
}

impl Default for SampleInterval {
    fn default() -> Self {
        Self(DEFAULT_SAMPLE_INTERVAL)
    }
}

/// How many accepted observations the majority vote looks back over.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WindowSize(usize);

impl WindowSize {
    pub fn new(value: usize) -> Result<Self, ConfigError> {
        if value == 0 {
            return Err(ConfigError::ZeroWindowSize);
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> usize {
        self.0
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self(DEFAULT_WINDOW_SIZE)
    }
}

/// Minimum classifier confidence for an observation to enter the vote.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceThreshold(f32);

impl ConfidenceThreshold {
    pub fn new(value: f32) -> Result<Self, ConfigError> {
        if !(0.0..=1.0).contains(&value) {
            return Err(ConfigError::ThresholdOutOfRange(value));
        }
        Ok(Self(value))
    }

    pub fn get(&self) -> f32 {
        self.0
    }
}

impl Default for ConfidenceThreshold {
    fn default() -> Self {
        Self(DEFAULT_CONFIDENCE_THRESHOLD)
    }
}

#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new<S: Into<String>>(value: S) -> Result<Self, ConfigError> {
        let v = value.into();
        if v.trim().is_empty() {
            return Err(ConfigError::EmptyApiKey);
        }
        Ok(Self(v))
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(**redacted**)")
    }
}

#[derive(Clone, Debug)]
pub struct MirrorConfig {
    pub camera_index: Option<u32>,
    pub sample_interval: SampleInterval,
    pub window_size: WindowSize,
    pub confidence_threshold: ConfidenceThreshold,
    pub classifier_url: String,
    pub openai_api_key: Option<ApiKey>,
    pub joke_model: String,
}

#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("sample interval must be > 0")]
    ZeroSampleInterval,
    #[error("window size must be > 0")]
    ZeroWindowSize,
    #[error("confidence threshold must be within 0.0..=1.0, got {0}")]
    ThresholdOutOfRange(f32),
    #[error("api key must not be empty")]
    EmptyApiKey,
}

pub trait Env {
    fn var(&self, key: &str) -> Option<String>;
}

#[derive(Clone, Debug, Default)]
pub struct StdEnv;

impl Env for StdEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

#[derive(Clone, Debug, Default)]
pub struct MapEnv {
    vars: std::collections::BTreeMap<String, String>,
}

impl MapEnv {
    pub fn with_var(mut self, key: &str, value: &str) -> Self {
        self.vars.insert(key.to_owned(), value.to_owned());
        self
    }
}

impl Env for MapEnv {
    fn var(&self, key: &str) -> Option<String> {
        self.vars.get(key).cloned()
    }
}

pub fn resolve_api_key(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
) -> Result<Option<ApiKey>, ConfigError> {
    match cli_value {
        Some(v) => Ok(Some(ApiKey::new(v)?)),
        None => match env.var(env_key) {
            Some(v) => Ok(Some(ApiKey::new(v)?)),
            None => Ok(None),
        },
    }
}

pub fn resolve_string_with_default(
    cli_value: Option<String>,
    env_key: &str,
    env: &impl Env,
    default: &str,
) -> String {
    match cli_value {
        Some(v) => v,
        None => env.var(env_key).unwrap_or_else(|| default.to_owned()),
    }
}
