//! Error taxonomy for the chunked synthesis pipeline.

use crate::tts::EngineError;

/// Errors surfaced to callers of the pipeline.
///
/// Every failure a caller can observe is one of these kinds, with a stable
/// message. Underlying engine errors are kept as the `source` of
/// [`TtsError::Synthesis`] rather than being flattened into the message.
#[derive(Debug, thiserror::Error)]
pub enum TtsError {
    /// Input text was empty or whitespace-only.
    #[error("text cannot be empty")]
    EmptyText,

    /// One chunk's synthesis call failed; the whole request is aborted.
    #[error("synthesis failed for chunk {chunk_index} (\"{preview}\"): {source}")]
    Synthesis {
        chunk_index: usize,
        preview: String,
        #[source]
        source: EngineError,
    },

    /// Chunk results disagree on sample rate. Indicates an upstream defect.
    #[error("sample rate mismatch at chunk {chunk_index}: expected {expected} Hz, found {found} Hz")]
    SampleRateMismatch { chunk_index: usize, expected: u32, found: u32 },

    /// Chunk results disagree on channel layout.
    #[error("channel layout mismatch at chunk {chunk_index}: expected {expected}, found {found}")]
    ChannelMismatch { chunk_index: usize, expected: u16, found: u16 },

    /// The stitcher was handed no results at all.
    #[error("no audio to stitch")]
    EmptyAudio,

    /// Request was cancelled between chunk boundaries.
    #[error("request cancelled after {completed} of {total} chunks")]
    Cancelled { completed: usize, total: usize },

    /// Invalid pipeline configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// The synthesis worker has shut down and can no longer take jobs.
    #[error("synthesis worker unavailable")]
    WorkerUnavailable,
}

/// Convenience type alias for Results with TtsError.
pub type TtsResult<T> = Result<T, TtsError>;

impl TtsError {
    /// Create a config error with message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Index of the chunk the error is attributed to, if any.
    pub fn chunk_index(&self) -> Option<usize> {
        match self {
            Self::Synthesis { chunk_index, .. } | Self::SampleRateMismatch { chunk_index, .. } | Self::ChannelMismatch { chunk_index, .. } => Some(*chunk_index),
            _ => None,
        }
    }
}
