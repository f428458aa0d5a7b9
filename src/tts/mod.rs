//! Text-to-speech module.
//!
//! Defines the engine seam, the shared model handle, and the sequential
//! per-chunk orchestrator.

mod engine;
mod orchestrator;
mod synthesizer;

pub use engine::{EngineError, ModelHandle, SpeechSynthesizer, SynthesizedAudio, VoiceParams};
pub use orchestrator::{FailurePolicy, Orchestrator, SynthesisResult};
pub use synthesizer::{DEFAULT_SAMPLE_RATE, ToneSynthesizer};
