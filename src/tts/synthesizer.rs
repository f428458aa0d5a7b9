//! Built-in tone synthesizer for running the pipeline without model weights.

use std::f32::consts::TAU;

use tracing::{debug, info};

use super::engine::{EngineError, SpeechSynthesizer, SynthesizedAudio, VoiceParams};

/// Default output sample rate (matches the neural model's 24 kHz output).
pub const DEFAULT_SAMPLE_RATE: u32 = 24000;

/// Duration of the tone emitted per character, in milliseconds.
const CHAR_DURATION_MS: u32 = 60;

/// Peak amplitude of generated tones.
const AMPLITUDE: f32 = 0.25;

/// Deterministic stand-in for the neural model.
///
/// Emits one short tone per character (silence for whitespace) so output
/// length tracks input length. Useful for smoke-testing chunking and
/// stitching end to end.
pub struct ToneSynthesizer {
    sample_rate: u32,        // Output sample rate
    samples_per_char: usize, // Samples emitted per character
}

impl ToneSynthesizer {
    /// Create a new tone synthesizer.
    ///
    /// # Arguments
    /// * `sample_rate` - Output sample rate in Hz
    ///
    /// # Errors
    /// Returns an error if the sample rate is zero.
    pub fn new(sample_rate: u32) -> Result<Self, EngineError> {
        if sample_rate == 0 {
            return Err(EngineError::Unavailable("sample rate must be positive".to_string()));
        }

        let samples_per_char = (sample_rate as usize * CHAR_DURATION_MS as usize) / 1000;
        info!("Initializing tone synthesizer at {} Hz ({} samples per char)", sample_rate, samples_per_char);

        Ok(Self { sample_rate, samples_per_char })
    }

    /// Get the sample rate of the synthesized audio.
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Base pitch for a speaker, so different speakers sound different.
    fn base_frequency(speaker: &str) -> f32 {
        let hash = speaker.bytes().fold(0u32, |acc, b| acc.wrapping_mul(31).wrapping_add(b as u32));
        110.0 + (hash % 80) as f32
    }
}

impl SpeechSynthesizer for ToneSynthesizer {
    fn name(&self) -> &str {
        "tone"
    }

    fn synthesize(&mut self, text: &str, params: &VoiceParams) -> Result<SynthesizedAudio, EngineError> {
        if text.trim().is_empty() {
            return Err(EngineError::invalid_input("text is empty"));
        }

        debug!("Synthesizing text: \"{}\"", text);

        let base = Self::base_frequency(&params.speaker);
        let mut samples = Vec::with_capacity(text.chars().count() * self.samples_per_char);

        for c in text.chars() {
            if c.is_whitespace() {
                samples.extend(std::iter::repeat_n(0.0, self.samples_per_char));
                continue;
            }

            let frequency = base + (c as u32 % 24) as f32 * 15.0;
            let step = TAU * frequency / self.sample_rate as f32;
            samples.extend((0..self.samples_per_char).map(|i| AMPLITUDE * (step * i as f32).sin()));
        }

        info!("🎵 Generated speech ({} samples)", samples.len());
        Ok(SynthesizedAudio::mono(samples, self.sample_rate))
    }
}
