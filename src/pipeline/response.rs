//! Response metadata for a finished request.

use serde::Serialize;

use crate::audio::AudioTrack;
use crate::text::{BoundaryTier, ChunkPlan};

/// Per-chunk summary included in the response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChunkInfo {
    pub index: usize,
    pub char_count: usize,
    pub estimated_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub boundary: Option<BoundaryTier>,
}

/// Aggregate metadata returned alongside the waveform.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResponseMetadata {
    pub chunked: bool,
    pub chunks_processed: usize,
    pub original_length: usize, // In characters
    pub sample_rate: u32,
    pub channels: u16,
    pub duration_secs: f64,
    pub forced_splits: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    pub chunk_info: Vec<ChunkInfo>,
}

/// Waveform plus metadata. Encoding for transport is left to the caller.
#[derive(Debug, Clone)]
pub struct SynthesisResponse {
    pub track: AudioTrack,
    pub metadata: ResponseMetadata,
}

/// Build response metadata from the plan and the stitched track.
pub fn assemble(original_text: &str, plan: &ChunkPlan, track: &AudioTrack) -> ResponseMetadata {
    ResponseMetadata {
        chunked: plan.len() > 1,
        chunks_processed: plan.len(),
        original_length: original_text.chars().count(),
        sample_rate: track.sample_rate,
        channels: track.channels,
        duration_secs: track.duration_secs(),
        forced_splits: plan.forced_splits(),
        warnings: Vec::new(),
        chunk_info: plan
            .chunks()
            .iter()
            .map(|c| ChunkInfo { index: c.index, char_count: c.char_count, estimated_tokens: c.estimated_tokens, boundary: c.boundary })
            .collect(),
    }
}
