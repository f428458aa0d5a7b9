//! Chunk planning: partitions long text into bounded, gap-free chunks.

use serde::Serialize;
use tracing::{debug, info, warn};

use super::boundary::{BoundaryClassifier, BoundaryTier, SplitCandidate, best_candidate};
use super::tokens::TokenEstimator;
use crate::error::{TtsError, TtsResult};

/// Default character budget per chunk (the model's sweet spot from training data).
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 150;

/// One contiguous piece of the source text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TextChunk {
    /// 1-based position in the plan.
    pub index: usize,
    /// The chunk text, sent to the synthesizer as-is.
    pub text: String,
    /// Length in characters.
    pub char_count: usize,
    /// Ratio-based token estimate for `text`.
    pub estimated_tokens: usize,
    /// Tier of the split that ended this chunk; `None` for the last chunk.
    pub boundary: Option<BoundaryTier>,
    /// Whitespace consumed by the split, between this chunk and the next.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub separator: String,
}

impl TextChunk {
    /// Whether this chunk ends in a hard cut.
    pub fn is_forced(&self) -> bool {
        self.boundary == Some(BoundaryTier::Forced)
    }

    /// First `max_chars` characters of the chunk, for diagnostics.
    pub fn preview(&self, max_chars: usize) -> String {
        match self.text.char_indices().nth(max_chars) {
            Some((end, _)) => format!("{}...", &self.text[..end]),
            None => self.text.clone(),
        }
    }
}

/// Ordered, immutable sequence of chunks for one request.
#[derive(Debug, Clone, Serialize)]
pub struct ChunkPlan {
    original_length: usize,
    max_chunk_chars: usize,
    /// Whitespace before the first chunk, kept only when the text was split.
    #[serde(skip_serializing_if = "String::is_empty")]
    leading: String,
    chunks: Vec<TextChunk>,
}

impl ChunkPlan {
    /// Chunks in text order.
    pub fn chunks(&self) -> &[TextChunk] {
        &self.chunks
    }

    /// Number of chunks (always at least one).
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Plans always hold at least one chunk.
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Whether the text was split into more than one chunk.
    pub fn is_chunked(&self) -> bool {
        self.chunks.len() > 1
    }

    /// Source text length in characters.
    pub fn original_length(&self) -> usize {
        self.original_length
    }

    /// Character budget the plan was built with.
    pub fn max_chunk_chars(&self) -> usize {
        self.max_chunk_chars
    }

    /// Number of hard cuts made inside words.
    pub fn forced_splits(&self) -> usize {
        self.chunks.iter().filter(|c| c.is_forced()).count()
    }

    /// Tiers of the splits between adjacent chunks (`len() - 1` entries).
    pub fn boundary_tiers(&self) -> Vec<BoundaryTier> {
        self.chunks.iter().filter_map(|c| c.boundary).collect()
    }

    /// Rebuild the source text from chunks and consumed separators.
    pub fn reconstruct(&self) -> String {
        let mut text = self.leading.clone();
        for chunk in &self.chunks {
            text.push_str(&chunk.text);
            text.push_str(&chunk.separator);
        }
        text
    }
}

/// Splits text at the strongest boundary available inside each window.
#[derive(Debug)]
pub struct ChunkPlanner<'a> {
    classifier: &'a BoundaryClassifier,
    estimator: TokenEstimator,
    max_chunk_chars: usize,
    enable_chunking: bool,
}

impl<'a> ChunkPlanner<'a> {
    /// Create a planner.
    ///
    /// # Arguments
    /// * `classifier` - Boundary rules for the text's script
    /// * `estimator` - Token estimator attached to each chunk
    /// * `max_chunk_chars` - Character budget per chunk
    /// * `enable_chunking` - When false, every plan is a single chunk
    ///
    /// # Errors
    /// Returns a config error if `max_chunk_chars` is zero.
    pub fn new(classifier: &'a BoundaryClassifier, estimator: TokenEstimator, max_chunk_chars: usize, enable_chunking: bool) -> TtsResult<Self> {
        if max_chunk_chars == 0 {
            return Err(TtsError::config("max_chunk_chars must be at least 1"));
        }
        Ok(Self { classifier, estimator, max_chunk_chars, enable_chunking })
    }

    /// Partition `text` into chunks.
    ///
    /// Text that fits the budget, or any text when chunking is disabled, comes
    /// back as a single chunk identical to the input.
    ///
    /// # Errors
    /// Returns [`TtsError::EmptyText`] for empty or whitespace-only input.
    pub fn plan(&self, text: &str) -> TtsResult<ChunkPlan> {
        if text.trim().is_empty() {
            return Err(TtsError::EmptyText);
        }

        let original_length = text.chars().count();
        if !self.enable_chunking || original_length <= self.max_chunk_chars {
            debug!("Single chunk plan ({} chars, chunking {})", original_length, if self.enable_chunking { "enabled" } else { "disabled" });
            let chunks = vec![self.make_chunk(1, text, None, "")];
            return Ok(ChunkPlan { original_length, max_chunk_chars: self.max_chunk_chars, leading: String::new(), chunks });
        }

        info!("Chunking text of {} characters (max {} per chunk)", original_length, self.max_chunk_chars);

        let mut chunks: Vec<TextChunk> = Vec::new();
        let mut cursor = text.len() - text.trim_start().len();
        let leading = text[..cursor].to_string();

        while cursor < text.len() {
            let remaining = &text[cursor..];

            // Byte offset of the char just past the budget; None means the rest fits.
            let Some((window_len, _)) = remaining.char_indices().nth(self.max_chunk_chars) else {
                chunks.push(self.make_chunk(chunks.len() + 1, remaining, None, ""));
                break;
            };

            let window_end = cursor + window_len;
            let candidates = self.classifier.find_candidates(text, cursor..window_end);
            let cut = best_candidate(&candidates).unwrap_or(SplitCandidate::new(window_end, BoundaryTier::Forced));

            let rest = &text[cut.offset..];
            let next = cut.offset + (rest.len() - rest.trim_start().len());

            if cut.tier == BoundaryTier::Forced {
                warn!("⚠️  Forced split inside a word at chunk {} (no boundary within {} chars)", chunks.len() + 1, self.max_chunk_chars);
            }

            chunks.push(self.make_chunk(chunks.len() + 1, &text[cursor..cut.offset], Some(cut.tier), &text[cut.offset..next]));
            cursor = next;
        }

        // Trailing whitespace may have been consumed by the last cut; nothing follows it.
        if let Some(last) = chunks.last_mut() {
            last.boundary = None;
        }

        info!("✂️  Split into {} chunks", chunks.len());
        for chunk in &chunks {
            debug!("Chunk {}: {} chars, ~{} tokens, boundary {:?}", chunk.index, chunk.char_count, chunk.estimated_tokens, chunk.boundary);
        }

        Ok(ChunkPlan { original_length, max_chunk_chars: self.max_chunk_chars, leading, chunks })
    }

    fn make_chunk(&self, index: usize, text: &str, boundary: Option<BoundaryTier>, separator: &str) -> TextChunk {
        let char_count = text.chars().count();
        TextChunk {
            index,
            text: text.to_string(),
            char_count,
            estimated_tokens: self.estimator.estimate(char_count),
            boundary,
            separator: separator.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hebrew() -> BoundaryClassifier {
        BoundaryClassifier::hebrew().unwrap()
    }

    fn plan(text: &str, max_chunk_chars: usize) -> ChunkPlan {
        let classifier = hebrew();
        ChunkPlanner::new(&classifier, TokenEstimator::default(), max_chunk_chars, true).unwrap().plan(text).unwrap()
    }

    fn assert_plan_invariants(text: &str, plan: &ChunkPlan) {
        assert_eq!(plan.reconstruct(), text, "plan must be lossless");
        for chunk in plan.chunks() {
            assert!(chunk.char_count <= plan.max_chunk_chars(), "chunk {} has {} chars", chunk.index, chunk.char_count);
            assert!(chunk.char_count > 0);
            if chunk.is_forced() {
                assert_eq!(chunk.char_count, plan.max_chunk_chars());
            }
        }
        let indices: Vec<_> = plan.chunks().iter().map(|c| c.index).collect();
        assert_eq!(indices, (1..=plan.len()).collect::<Vec<_>>());
    }

    #[test]
    fn test_short_text_is_single_verbatim_chunk() {
        let text = "שלום עולם";
        let plan = plan(text, DEFAULT_MAX_CHUNK_CHARS);
        assert_eq!(plan.len(), 1);
        assert!(!plan.is_chunked());
        assert_eq!(plan.chunks()[0].text, text);
        assert_eq!(plan.chunks()[0].char_count, 9);
        assert_eq!(plan.original_length(), 9);
    }

    #[test]
    fn test_text_at_exact_budget_is_not_split() {
        let text = "א".repeat(150);
        let plan = plan(&text, 150);
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.chunks()[0].text, text);
    }

    #[test]
    fn test_disabled_chunking_keeps_long_text_whole() {
        let classifier = hebrew();
        let text = "טקסט ארוך שלא יעבור חלוקה. ".repeat(10);
        let planner = ChunkPlanner::new(&classifier, TokenEstimator::default(), 50, false).unwrap();
        let plan = planner.plan(&text).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.chunks()[0].text, text);
        assert_eq!(plan.chunks()[0].boundary, None);
    }

    #[test]
    fn test_425_chars_make_three_chunks() {
        let text = format!("{}שלום!", "שלום עולם ".repeat(42));
        assert_eq!(text.chars().count(), 425);

        let plan = plan(&text, 150);
        assert_eq!(plan.len(), 3);
        assert!(plan.is_chunked());
        assert_eq!(plan.chunks()[0].char_count, 149);
        assert_eq!(plan.chunks()[0].boundary, Some(BoundaryTier::Word));
        assert_plan_invariants(&text, &plan);
    }

    #[test]
    fn test_prefers_sentence_boundary_over_later_word_boundary() {
        let text = "המשפט הראשון קצר. המשפט השני ארוך יותר ונמשך עוד ועוד";
        let plan = plan(text, 30);
        assert_eq!(plan.chunks()[0].text, "המשפט הראשון קצר.");
        assert_eq!(plan.chunks()[0].boundary, Some(BoundaryTier::Sentence));
        assert_plan_invariants(text, &plan);
    }

    #[test]
    fn test_packs_sentences_up_to_the_edge() {
        let text = "אחת. שתיים. שלוש. ארבע. חמש. שש.";
        let plan = plan(text, 20);
        assert_eq!(plan.chunks()[0].text, "אחת. שתיים. שלוש.");
        assert_plan_invariants(text, &plan);
    }

    #[test]
    fn test_boundary_free_text_uses_forced_cuts() {
        let text = "ש".repeat(1000);
        let plan = plan(&text, 150);
        assert_eq!(plan.len(), 1000_usize.div_ceil(150));
        assert_eq!(plan.forced_splits(), plan.len() - 1);
        assert_plan_invariants(&text, &plan);
    }

    #[test]
    fn test_pathological_run_terminates_without_recursion() {
        let text = "x".repeat(100_000);
        let plan = plan(&text, 150);
        assert_eq!(plan.len(), 100_000_usize.div_ceil(150));
        assert_eq!(plan.reconstruct().len(), text.len());
    }

    #[test]
    fn test_consumed_whitespace_is_preserved_for_reconstruction() {
        let text = "  פתיחה עם רווחים,   ואחריה\n\nפסקה חדשה לגמרי עם עוד מילים   ";
        let plan = plan(text, 12);
        assert!(plan.is_chunked());
        assert_plan_invariants(text, &plan);
        for chunk in plan.chunks() {
            assert!(!chunk.text.starts_with(char::is_whitespace));
            assert!(chunk.boundary.is_none() || !chunk.text.ends_with(char::is_whitespace));
        }
    }

    #[test]
    fn test_leading_whitespace_never_forms_a_chunk() {
        let text = "     אבג";
        let plan = plan(text, 2);
        assert!(plan.chunks().iter().all(|c| !c.text.trim().is_empty()));
        assert_plan_invariants(text, &plan);
    }

    #[test]
    fn test_chunks_carry_token_estimates() {
        let classifier = hebrew();
        let estimator = TokenEstimator::new(2.0).unwrap();
        let planner = ChunkPlanner::new(&classifier, estimator, 10, true).unwrap();
        let plan = planner.plan("אבגד הוזח טיכל").unwrap();
        for chunk in plan.chunks() {
            assert_eq!(chunk.estimated_tokens, chunk.char_count.div_ceil(2));
        }
    }

    #[test]
    fn test_boundary_tiers_between_chunks() {
        let text = "ראשון, שני. שלישי רביעי";
        let plan = plan(text, 12);
        assert_eq!(plan.boundary_tiers().len(), plan.len() - 1);
        assert_eq!(plan.chunks().last().unwrap().boundary, None);
        assert_plan_invariants(text, &plan);
    }

    #[test]
    fn test_rejects_empty_text() {
        let classifier = hebrew();
        let planner = ChunkPlanner::new(&classifier, TokenEstimator::default(), 150, true).unwrap();
        assert!(matches!(planner.plan(""), Err(TtsError::EmptyText)));
        assert!(matches!(planner.plan(" \n\t "), Err(TtsError::EmptyText)));
    }

    #[test]
    fn test_rejects_zero_budget() {
        let classifier = hebrew();
        assert!(matches!(ChunkPlanner::new(&classifier, TokenEstimator::default(), 0, true), Err(TtsError::Config(_))));
    }

    #[test]
    fn test_preview_truncates_on_char_boundary() {
        let plan = plan("שלום עולם", 150);
        assert_eq!(plan.chunks()[0].preview(4), "שלום...");
        assert_eq!(plan.chunks()[0].preview(50), "שלום עולם");
    }

    #[test]
    fn test_mixed_texts_round_trip() {
        let texts = [
            "זהו טקסט ארוך מאוד בעברית שנועד לבדוק את יכולות החלוקה של המערכת. הטקסט הזה כולל מספר משפטים, פסיקים, ונקודותיים: כמו כאן; וגם כאן.",
            "מילה־מילה־מילה־מילה־מילה־מילה־מילה",
            "a\u{05B0}\u{05B4}b c\u{200F}d, e.f! ...\n\n\n   ",
            "רק_מילה_אחת_ארוכה_מאוד_בלי_רווחים_בכלל ואז רווח",
        ];
        for text in texts {
            for max in [1, 2, 5, 7, 13, 40] {
                let plan = plan(text, max);
                assert_plan_invariants(text, &plan);
            }
        }
    }
}
