//! Synthesis engine seam and the shared model handle.

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, info};

/// Failure reported by a synthesis engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The model ran but could not produce audio.
    #[error("inference failed: {0}")]
    Inference(String),

    /// The engine refused the input (e.g. unknown speaker, empty text).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The model is not loaded or has been released.
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

impl EngineError {
    /// Create an inference error with message.
    pub fn inference(msg: impl Into<String>) -> Self {
        Self::Inference(msg.into())
    }

    /// Create an invalid input error with message.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Per-request voice parameters passed through to the model.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParams {
    pub speaker: String,  // Speaker prompt name
    pub top_k: u32,       // Top-k sampling
    pub temperature: f32, // Sampling temperature
    pub use_mbd: bool,    // Multi-band diffusion decoder
}

/// Raw audio returned by one synthesis call.
///
/// Samples are interleaved when `channels > 1`.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl SynthesizedAudio {
    /// Mono audio.
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self { samples, sample_rate, channels: 1 }
    }
}

/// A text-to-speech model: blocking and not reentrant.
///
/// Implementations are driven through a [`ModelHandle`], which guarantees
/// that at most one call runs at a time.
pub trait SpeechSynthesizer: Send {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Synthesize `text` with the given voice parameters.
    ///
    /// # Errors
    /// Returns an [`EngineError`] if the model cannot produce audio.
    fn synthesize(&mut self, text: &str, params: &VoiceParams) -> Result<SynthesizedAudio, EngineError>;
}

/// Process-wide handle to a loaded model.
///
/// Loaded once, shared by cloning the handle, and released explicitly.
/// Every call goes through a mutex, so only one synthesis is in flight
/// across all requests.
pub struct ModelHandle<E> {
    engine: Arc<Mutex<Option<E>>>,
}

impl<E> Clone for ModelHandle<E> {
    fn clone(&self) -> Self {
        Self { engine: self.engine.clone() }
    }
}

impl<E: SpeechSynthesizer> ModelHandle<E> {
    /// Load the model once.
    ///
    /// # Arguments
    /// * `loader` - Builds the engine (reads weights, allocates device memory)
    ///
    /// # Errors
    /// Returns the loader's error if the model cannot be loaded.
    pub fn load<F>(loader: F) -> Result<Self, EngineError>
    where
        F: FnOnce() -> Result<E, EngineError>,
    {
        let engine = loader()?;
        info!("🧠 Model loaded: {}", engine.name());
        Ok(Self { engine: Arc::new(Mutex::new(Some(engine))) })
    }

    /// Run one synthesis call with exclusive access to the model.
    ///
    /// # Errors
    /// Returns [`EngineError::Unavailable`] after [`ModelHandle::release`],
    /// otherwise whatever the engine reports.
    pub fn synthesize(&self, text: &str, params: &VoiceParams) -> Result<SynthesizedAudio, EngineError> {
        let mut guard = self.engine.lock();
        let engine = guard.as_mut().ok_or_else(|| EngineError::Unavailable("model has been released".to_string()))?;
        debug!("Synthesizing {} chars with {}", text.chars().count(), engine.name());
        engine.synthesize(text, params)
    }

    /// Whether the model is still loaded.
    pub fn is_loaded(&self) -> bool {
        self.engine.lock().is_some()
    }

    /// Release the model. Waits for an in-flight call to finish first.
    pub fn release(&self) {
        if let Some(engine) = self.engine.lock().take() {
            info!("Model released: {}", engine.name());
        }
    }
}
