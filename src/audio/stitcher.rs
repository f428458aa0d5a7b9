//! Joins per-chunk audio into one continuous track.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::util::{duration_secs, silence_len};
use crate::error::{TtsError, TtsResult};
use crate::text::BoundaryTier;
use crate::tts::SynthesisResult;

/// Silence inserted after each boundary tier, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PauseConfig {
    pub sentence_ms: u32, // After sentence-final punctuation
    pub clause_ms: u32,   // After clause marks and conjunctions
    pub word_ms: u32,     // At plain word boundaries
    pub forced_ms: u32,   // Inside a word (hard cut)
}

impl Default for PauseConfig {
    fn default() -> Self {
        Self { sentence_ms: 300, clause_ms: 200, word_ms: 100, forced_ms: 0 }
    }
}

impl PauseConfig {
    /// Pause length for a boundary tier.
    pub fn for_tier(&self, tier: BoundaryTier) -> u32 {
        match tier {
            BoundaryTier::Sentence => self.sentence_ms,
            BoundaryTier::Clause => self.clause_ms,
            BoundaryTier::Word => self.word_ms,
            BoundaryTier::Forced => self.forced_ms,
        }
    }
}

/// The final waveform for one request.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioTrack {
    pub samples: Vec<f32>, // Interleaved when channels > 1
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioTrack {
    /// Playback duration in seconds.
    pub fn duration_secs(&self) -> f64 {
        duration_secs(self.samples.len(), self.sample_rate, self.channels)
    }
}

/// Concatenates chunk audio in chunk order, with optional pauses between chunks.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stitcher {
    pauses: Option<PauseConfig>,
}

impl Stitcher {
    /// Create a stitcher. `None` joins chunks back to back.
    pub fn new(pauses: Option<PauseConfig>) -> Self {
        Self { pauses }
    }

    /// Stitch chunk results into one track.
    ///
    /// Results are ordered by `chunk_index` before joining. The pause after
    /// chunk *i* is taken from `boundary_tiers[i]`; a missing entry means no
    /// pause. Channel layout is passed through unchanged.
    ///
    /// # Arguments
    /// * `results` - One result per chunk
    /// * `boundary_tiers` - Tier of each split, in plan order
    ///
    /// # Errors
    /// - [`TtsError::EmptyAudio`] if `results` is empty
    /// - [`TtsError::SampleRateMismatch`] / [`TtsError::ChannelMismatch`] if
    ///   results disagree on format
    pub fn stitch(&self, mut results: Vec<SynthesisResult>, boundary_tiers: &[BoundaryTier]) -> TtsResult<AudioTrack> {
        results.sort_by_key(|r| r.chunk_index);

        let first = results.first().ok_or(TtsError::EmptyAudio)?;
        let (sample_rate, channels) = (first.sample_rate, first.channels);

        for result in &results {
            if result.sample_rate != sample_rate {
                return Err(TtsError::SampleRateMismatch { chunk_index: result.chunk_index, expected: sample_rate, found: result.sample_rate });
            }
            if result.channels != channels {
                return Err(TtsError::ChannelMismatch { chunk_index: result.chunk_index, expected: channels, found: result.channels });
            }
        }

        let pause_lens: Vec<usize> = (0..results.len() - 1)
            .map(|i| match (self.pauses, boundary_tiers.get(i)) {
                (Some(pauses), Some(&tier)) => silence_len(pauses.for_tier(tier), sample_rate, channels),
                _ => 0,
            })
            .collect();

        let total_len = results.iter().map(|r| r.samples.len()).sum::<usize>() + pause_lens.iter().sum::<usize>();
        let mut samples = Vec::with_capacity(total_len);

        let chunk_count = results.len();
        for (i, result) in results.into_iter().enumerate() {
            samples.extend(result.samples);
            if let Some(&pause) = pause_lens.get(i)
                && pause > 0
            {
                debug!("Inserting {} silent samples after chunk {}", pause, i + 1);
                samples.resize(samples.len() + pause, 0.0);
            }
        }

        let track = AudioTrack { samples, sample_rate, channels };
        if chunk_count > 1 {
            info!("🧵 Stitched {} chunks into {:.2}s of audio", chunk_count, track.duration_secs());
        }
        Ok(track)
    }
}
