//! Text chunking module.
//!
//! Splits long input into chunks the synthesis model can take in one call,
//! cutting at the strongest linguistic boundary available.

pub mod boundary;
mod planner;
mod tokens;

pub use boundary::{BoundaryClassifier, BoundaryStrategy, BoundaryTier, PatternRule, RuleSet, SearchWindow, SplitCandidate, WhitespaceRule};
pub use planner::{ChunkPlan, ChunkPlanner, DEFAULT_MAX_CHUNK_CHARS, TextChunk};
pub use tokens::{DEFAULT_CHARS_PER_TOKEN, DEFAULT_TOKEN_LIMIT, MAX_CHARS_PER_TOKEN, TokenEstimator};
