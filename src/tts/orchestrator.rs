//! Sequential per-chunk synthesis.

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::engine::{EngineError, ModelHandle, SpeechSynthesizer, VoiceParams};
use crate::error::{TtsError, TtsResult};
use crate::text::{ChunkPlan, TextChunk};

/// Characters of chunk text quoted in synthesis errors.
const ERROR_PREVIEW_CHARS: usize = 40;

/// What to do when a chunk fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum FailurePolicy {
    /// Abort the request on the first failing chunk.
    #[default]
    FailFast,
    /// Retry a failing chunk up to `attempts` more times, then abort.
    Retry { attempts: u32 },
}

/// Audio produced for one chunk.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    pub chunk_index: usize, // 1-based chunk position
    pub samples: Vec<f32>,  // Interleaved when channels > 1
    pub sample_rate: u32,
    pub channels: u16,
}

/// Drives one synthesis call per chunk, strictly in plan order.
#[derive(Debug, Clone, Copy, Default)]
pub struct Orchestrator {
    policy: FailurePolicy,
}

impl Orchestrator {
    /// Create an orchestrator with the given failure policy.
    pub fn new(policy: FailurePolicy) -> Self {
        Self { policy }
    }

    /// The configured failure policy.
    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Synthesize every chunk of `plan` in order.
    ///
    /// Calls are made one at a time through `model`. Cancellation is checked
    /// before each chunk; an in-flight call is always allowed to finish.
    ///
    /// # Arguments
    /// * `plan` - Chunks to synthesize
    /// * `model` - Loaded model handle
    /// * `params` - Voice parameters applied to every chunk
    /// * `cancel` - Token checked between chunks
    ///
    /// # Returns
    /// One result per chunk, in plan order.
    ///
    /// # Errors
    /// - [`TtsError::Synthesis`] for the first chunk that fails (after retries)
    /// - [`TtsError::Cancelled`] if the token fires between chunks
    pub fn run<E: SpeechSynthesizer>(&self, plan: &ChunkPlan, model: &ModelHandle<E>, params: &VoiceParams, cancel: &CancellationToken) -> TtsResult<Vec<SynthesisResult>> {
        let total = plan.len();
        let mut results = Vec::with_capacity(total);

        for chunk in plan.chunks() {
            if cancel.is_cancelled() {
                warn!("⏸️  Request cancelled after {}/{} chunks", results.len(), total);
                return Err(TtsError::Cancelled { completed: results.len(), total });
            }

            debug!("Synthesizing chunk {}/{} ({} chars): {}", chunk.index, total, chunk.char_count, chunk.preview(100));

            let audio = self.synthesize_chunk(chunk, total, model, params)?;

            info!("🔊 Chunk {}/{} done ({} samples)", chunk.index, total, audio.samples.len());
            results.push(SynthesisResult { chunk_index: chunk.index, samples: audio.samples, sample_rate: audio.sample_rate, channels: audio.channels });
        }

        Ok(results)
    }

    fn synthesize_chunk<E: SpeechSynthesizer>(&self, chunk: &TextChunk, total: usize, model: &ModelHandle<E>, params: &VoiceParams) -> TtsResult<super::SynthesizedAudio> {
        let retries = match self.policy {
            FailurePolicy::FailFast => 0,
            FailurePolicy::Retry { attempts } => attempts,
        };

        let mut attempt = 0;
        loop {
            match model.synthesize(&chunk.text, params) {
                Ok(audio) => return Ok(audio),
                // A released model will not come back; retrying is pointless.
                Err(e) if attempt < retries && !matches!(e, EngineError::Unavailable(_)) => {
                    attempt += 1;
                    warn!("Chunk {}/{} failed ({}), retry {}/{}", chunk.index, total, e, attempt, retries);
                }
                Err(e) => {
                    error!("❌ Synthesis failed for chunk {}/{}: {}", chunk.index, total, e);
                    return Err(TtsError::Synthesis { chunk_index: chunk.index, preview: chunk.preview(ERROR_PREVIEW_CHARS), source: e });
                }
            }
        }
    }
}
