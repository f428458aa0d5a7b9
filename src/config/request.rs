//! Per-request synthesis settings and the job envelope.

use serde::{Deserialize, Serialize};

use crate::error::{TtsError, TtsResult};
use crate::text::{DEFAULT_MAX_CHUNK_CHARS, DEFAULT_TOKEN_LIMIT};
use crate::tts::VoiceParams;

/// Speaker used when the command line does not name one.
pub const DEFAULT_SPEAKER: &str = "osim";

fn default_top_k() -> u32 {
    15
}

fn default_temperature() -> f32 {
    0.6
}

fn default_true() -> bool {
    true
}

fn default_max_chunk_chars() -> usize {
    DEFAULT_MAX_CHUNK_CHARS
}

fn default_token_limit() -> usize {
    DEFAULT_TOKEN_LIMIT
}

/// Read-only settings for one synthesis request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestConfig {
    /// Speaker prompt name. Required in job files.
    pub speaker: String,
    #[serde(default = "default_top_k")]
    pub top_k: u32,
    #[serde(default = "default_temperature")]
    pub temperature: f32,
    #[serde(default = "default_true")]
    pub use_mbd: bool,
    #[serde(default = "default_true")]
    pub enable_chunking: bool,
    #[serde(default = "default_max_chunk_chars")]
    pub max_chunk_chars: usize,
    /// Model limit per call; chunks estimated at or above it are flagged.
    #[serde(default = "default_token_limit")]
    pub token_limit: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            speaker: DEFAULT_SPEAKER.to_string(),
            top_k: default_top_k(),
            temperature: default_temperature(),
            use_mbd: true,
            enable_chunking: true,
            max_chunk_chars: DEFAULT_MAX_CHUNK_CHARS,
            token_limit: DEFAULT_TOKEN_LIMIT,
        }
    }
}

impl RequestConfig {
    /// Voice parameters passed to every synthesis call.
    pub fn voice_params(&self) -> VoiceParams {
        VoiceParams { speaker: self.speaker.clone(), top_k: self.top_k, temperature: self.temperature, use_mbd: self.use_mbd }
    }

    /// Check value ranges.
    ///
    /// # Errors
    /// Returns [`TtsError::Config`] naming the first invalid field.
    pub fn validate(&self) -> TtsResult<()> {
        if self.speaker.trim().is_empty() {
            return Err(TtsError::config("speaker cannot be empty"));
        }
        if self.top_k == 0 {
            return Err(TtsError::config("top_k must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(TtsError::config(format!("temperature must be between 0.0 and 2.0, got {}", self.temperature)));
        }
        if self.max_chunk_chars == 0 {
            return Err(TtsError::config("max_chunk_chars must be at least 1"));
        }
        if self.token_limit == 0 {
            return Err(TtsError::config("token_limit must be at least 1"));
        }
        Ok(())
    }
}

/// Text plus settings for one request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobInput {
    pub text: String,
    #[serde(flatten)]
    pub config: RequestConfig,
}

/// Job envelope: `{"input": {"text": ..., "speaker": ..., ...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub input: JobInput,
}

impl Job {
    /// Parse a job from JSON.
    ///
    /// # Errors
    /// Returns [`TtsError::Config`] if the JSON is malformed or lacks `text`/`speaker`.
    pub fn from_json(json: &str) -> TtsResult<Self> {
        serde_json::from_str(json).map_err(|e| TtsError::config(format!("invalid job: {}", e)))
    }
}
