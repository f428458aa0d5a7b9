//! Long-text synthesis for a Hebrew TTS model.
//!
//! The model accepts a bounded number of tokens per call, so long input is
//! split into chunks at the strongest linguistic boundary available, each
//! chunk is synthesized in order through a single shared model handle, and
//! the per-chunk audio is stitched back into one waveform with metadata.

pub mod audio;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod text;
pub mod tts;
pub mod worker;

pub use error::{TtsError, TtsResult};
