//! End-to-end request pipeline: plan, synthesize, stitch, assemble.

mod response;

pub use response::{ChunkInfo, ResponseMetadata, SynthesisResponse, assemble};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::audio::{PauseConfig, Stitcher};
use crate::config::JobInput;
use crate::error::TtsResult;
use crate::text::{BoundaryClassifier, ChunkPlan, ChunkPlanner, RuleSet, TokenEstimator};
use crate::tts::{FailurePolicy, ModelHandle, Orchestrator, SpeechSynthesizer};

/// Request-independent pipeline components.
///
/// Built once at startup and shared by every request.
#[derive(Debug)]
pub struct ChunkedPipeline {
    classifier: BoundaryClassifier,
    estimator: TokenEstimator,
    orchestrator: Orchestrator,
    stitcher: Stitcher,
}

impl ChunkedPipeline {
    /// Create a pipeline.
    ///
    /// # Arguments
    /// * `rule_set` - Boundary rules for the input script
    /// * `estimator` - Token estimator for chunk sizing checks
    /// * `policy` - What to do when a chunk fails
    /// * `pauses` - Inter-chunk silence; `None` disables it
    ///
    /// # Errors
    /// Returns a config error if the boundary rules fail to compile.
    pub fn new(rule_set: RuleSet, estimator: TokenEstimator, policy: FailurePolicy, pauses: Option<PauseConfig>) -> TtsResult<Self> {
        Ok(Self { classifier: BoundaryClassifier::for_rule_set(rule_set)?, estimator, orchestrator: Orchestrator::new(policy), stitcher: Stitcher::new(pauses) })
    }

    /// Build the chunk plan for a request without synthesizing.
    ///
    /// # Errors
    /// Returns a config error for invalid settings, or
    /// [`crate::TtsError::EmptyText`] for blank input.
    pub fn plan(&self, input: &JobInput) -> TtsResult<ChunkPlan> {
        input.config.validate()?;

        let safe_chars = self.estimator.max_chars_below(input.config.token_limit);
        if input.config.enable_chunking && input.config.max_chunk_chars > safe_chars {
            warn!("max_chunk_chars {} may exceed the {} token limit (safe up to {} chars)", input.config.max_chunk_chars, input.config.token_limit, safe_chars);
        }

        ChunkPlanner::new(&self.classifier, self.estimator, input.config.max_chunk_chars, input.config.enable_chunking)?.plan(&input.text)
    }

    /// Run one request to completion.
    ///
    /// # Arguments
    /// * `input` - Text and request settings
    /// * `model` - Loaded model handle
    /// * `cancel` - Checked between chunks
    ///
    /// # Returns
    /// The stitched waveform with its metadata. No audio is returned if any
    /// chunk fails.
    ///
    /// # Errors
    /// Any [`crate::TtsError`] raised by planning, synthesis or stitching.
    pub fn run<E: SpeechSynthesizer>(&self, input: &JobInput, model: &ModelHandle<E>, cancel: &CancellationToken) -> TtsResult<SynthesisResponse> {
        let plan = self.plan(input)?;
        let warnings = self.plan_warnings(&plan, input.config.token_limit);

        let results = self.orchestrator.run(&plan, model, &input.config.voice_params(), cancel)?;
        let track = self.stitcher.stitch(results, &plan.boundary_tiers())?;

        let mut metadata = assemble(&input.text, &plan, &track);
        metadata.warnings = warnings;

        info!("✅ Synthesized {} chars in {} chunk(s), {:.2}s of audio", metadata.original_length, metadata.chunks_processed, metadata.duration_secs);
        Ok(SynthesisResponse { track, metadata })
    }

    fn plan_warnings(&self, plan: &ChunkPlan, token_limit: usize) -> Vec<String> {
        let mut warnings = Vec::new();
        for chunk in plan.chunks() {
            if chunk.is_forced() {
                warnings.push(format!("chunk {} was cut inside a word (no boundary within {} chars)", chunk.index, plan.max_chunk_chars()));
            }
            if chunk.estimated_tokens >= token_limit {
                warn!("⚠️  Chunk {} estimated at {} tokens (limit {})", chunk.index, chunk.estimated_tokens, token_limit);
                warnings.push(format!("chunk {} estimated at {} tokens, at or above the {} token limit", chunk.index, chunk.estimated_tokens, token_limit));
            }
        }
        warnings
    }
}
