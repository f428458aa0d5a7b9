//! Boundary classification: proposes split points ranked by linguistic strength.
//!
//! A [`BoundaryClassifier`] is an ordered list of independent
//! [`BoundaryStrategy`] implementations. Script-specific knowledge lives only
//! in the rule data handed to the classifier, so adding a new script or a
//! domain punctuation set never touches the planner.

use std::fmt;
use std::ops::Range;

use clap::ValueEnum;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{TtsError, TtsResult};

/// How many characters past the window edge a rule may look at.
///
/// Rules such as "terminator followed by whitespace" or a conjunction that
/// starts right after the edge need some right context.
const LOOKAHEAD_CHARS: usize = 32;

/// Linguistic strength of a split point, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BoundaryTier {
    /// End of a sentence or paragraph.
    Sentence,
    /// Clause punctuation or a coordinating conjunction.
    Clause,
    /// Plain whitespace between words.
    Word,
    /// Arbitrary offset, used only when nothing better exists.
    Forced,
}

impl fmt::Display for BoundaryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoundaryTier::Sentence => write!(f, "sentence"),
            BoundaryTier::Clause => write!(f, "clause"),
            BoundaryTier::Word => write!(f, "word"),
            BoundaryTier::Forced => write!(f, "forced"),
        }
    }
}

/// A proposed cut position.
///
/// `offset` is a byte offset into the source text, always on a char
/// boundary. The chunk ends there (exclusive); any whitespace starting at
/// `offset` is consumed by the split.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitCandidate {
    pub offset: usize,
    pub tier: BoundaryTier,
}

impl SplitCandidate {
    pub fn new(offset: usize, tier: BoundaryTier) -> Self {
        Self { offset, tier }
    }
}

/// Built-in rule sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuleSet {
    /// Hebrew punctuation, sof pasuq, maqaf and Hebrew conjunctions
    #[default]
    Hebrew,
    /// Latin-script punctuation and English conjunctions
    Latin,
}

impl fmt::Display for RuleSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleSet::Hebrew => write!(f, "hebrew"),
            RuleSet::Latin => write!(f, "latin"),
        }
    }
}

/// Region of the text a strategy is asked to inspect.
#[derive(Debug, Clone, Copy)]
pub struct SearchWindow<'a> {
    /// Full source text.
    pub text: &'a str,
    /// Byte offset of the chunk start (the planner cursor).
    pub start: usize,
    /// Byte offset of the right window edge, inclusive for candidates.
    pub end: usize,
    /// Byte offset up to which strategies may read right context.
    pub lookahead_end: usize,
}

impl SearchWindow<'_> {
    /// Whether a candidate offset is a usable cut in this window.
    ///
    /// Cuts must leave a non-empty chunk and must not exceed the edge.
    pub fn accepts(&self, offset: usize) -> bool {
        offset > self.start && offset <= self.end
    }

    fn haystack(&self) -> &str {
        &self.text[self.start..self.lookahead_end]
    }

    fn is_truncated(&self) -> bool {
        self.lookahead_end < self.text.len()
    }
}

/// Capability to propose split candidates with a strength tier.
pub trait BoundaryStrategy: Send + Sync {
    /// Short rule name used in logs.
    fn name(&self) -> &str;

    /// Tier assigned to every candidate this strategy proposes.
    fn tier(&self) -> BoundaryTier;

    /// Append candidates found inside `window` to `out`.
    fn propose(&self, window: &SearchWindow<'_>, out: &mut Vec<SplitCandidate>);
}

/// Regex-driven rule. The cut is the end of the `cut` capture group.
pub struct PatternRule {
    name: String,
    tier: BoundaryTier,
    pattern: Regex,
    anchored: Regex, // Same pattern, matching only at the haystack start
}

impl PatternRule {
    /// Compile a rule.
    ///
    /// # Errors
    /// Returns a config error if the pattern is invalid or lacks a `cut` group.
    pub fn new(name: impl Into<String>, tier: BoundaryTier, pattern: &str) -> TtsResult<Self> {
        let name = name.into();
        let compile = |p: &str| Regex::new(p).map_err(|e| TtsError::config(format!("invalid boundary rule '{}': {}", name, e)));
        let anchored = compile(&format!(r"\A(?:{})", pattern))?;
        let pattern = compile(pattern)?;
        if !pattern.capture_names().any(|n| n == Some("cut")) {
            return Err(TtsError::config(format!("boundary rule '{}' has no 'cut' group", name)));
        }
        Ok(Self { name, tier, pattern, anchored })
    }
}

impl BoundaryStrategy for PatternRule {
    fn name(&self) -> &str {
        &self.name
    }

    fn tier(&self) -> BoundaryTier {
        self.tier
    }

    fn propose(&self, window: &SearchWindow<'_>, out: &mut Vec<SplitCandidate>) {
        let haystack = window.haystack();
        let truncated = window.is_truncated();

        for caps in self.pattern.captures_iter(haystack) {
            let Some(whole) = caps.get(0) else { continue };
            if window.start + whole.start() > window.end {
                break;
            }

            let cut = if truncated && whole.end() == haystack.len() {
                // Match ran into the artificial end of the haystack; redo it
                // against the full text so `$` and greedy runs see the real context.
                let at = window.start + whole.start();
                self.anchored.captures(&window.text[at..]).and_then(|full| full.name("cut")).map(|g| at + g.end())
            } else {
                caps.name("cut").map(|g| window.start + g.end())
            };

            if let Some(offset) = cut
                && window.accepts(offset)
            {
                out.push(SplitCandidate::new(offset, self.tier));
            }
        }
    }
}

/// Cuts at the start of every whitespace run.
#[derive(Debug, Default)]
pub struct WhitespaceRule;

impl BoundaryStrategy for WhitespaceRule {
    fn name(&self) -> &str {
        "whitespace"
    }

    fn tier(&self) -> BoundaryTier {
        BoundaryTier::Word
    }

    fn propose(&self, window: &SearchWindow<'_>, out: &mut Vec<SplitCandidate>) {
        let mut prev_was_space = false;
        for (i, c) in window.text[window.start..].char_indices() {
            let offset = window.start + i;
            if offset > window.end {
                break;
            }
            let is_space = c.is_whitespace();
            if is_space && !prev_was_space && window.accepts(offset) {
                out.push(SplitCandidate::new(offset, BoundaryTier::Word));
            }
            prev_was_space = is_space;
        }
    }
}

/// Ordered collection of boundary strategies.
pub struct BoundaryClassifier {
    strategies: Vec<Box<dyn BoundaryStrategy>>,
}

impl fmt::Debug for BoundaryClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.strategies.iter().map(|s| format!("{}:{}", s.tier(), s.name()))).finish()
    }
}

impl BoundaryClassifier {
    /// Build a classifier from explicit strategies.
    pub fn new(strategies: Vec<Box<dyn BoundaryStrategy>>) -> Self {
        Self { strategies }
    }

    /// Build a classifier for one of the built-in rule sets.
    ///
    /// # Errors
    /// Returns a config error if a built-in pattern fails to compile.
    pub fn for_rule_set(rule_set: RuleSet) -> TtsResult<Self> {
        match rule_set {
            RuleSet::Hebrew => Self::hebrew(),
            RuleSet::Latin => Self::latin(),
        }
    }

    /// Hebrew rules: `. ! ? ׃ …` end sentences (optionally followed by
    /// closing quotes such as gershayim `״` or geresh `׳`), line breaks end
    /// paragraphs, `, ; : – —` and maqaf `־` end clauses, and the
    /// standalone conjunctions אבל, אך, אולם, או, אלא, לכן, כי open one.
    pub fn hebrew() -> TtsResult<Self> {
        Ok(Self::new(vec![
            Box::new(PatternRule::new("sentence-end", BoundaryTier::Sentence, r#"(?P<cut>[.!?׃…]+[״׳"'”’)\]]*)(?:\s|$)"#)?),
            Box::new(PatternRule::new("line-break", BoundaryTier::Sentence, r"(?P<cut>)[^\S\n]*\n\s*")?),
            Box::new(PatternRule::new("clause-mark", BoundaryTier::Clause, r"(?P<cut>[,;:–—]+)(?:\s|$)")?),
            Box::new(PatternRule::new("maqaf", BoundaryTier::Clause, r"(?P<cut>־)")?),
            Box::new(PatternRule::new("conjunction", BoundaryTier::Clause, r"(?P<cut>)\s+(?:אבל|אך|אולם|או|אלא|לכן|כי)(?:\s|$)")?),
            Box::new(WhitespaceRule),
        ]))
    }

    /// Latin-script rules with English conjunctions.
    pub fn latin() -> TtsResult<Self> {
        Ok(Self::new(vec![
            Box::new(PatternRule::new("sentence-end", BoundaryTier::Sentence, r#"(?P<cut>[.!?…]+["'”’)\]]*)(?:\s|$)"#)?),
            Box::new(PatternRule::new("line-break", BoundaryTier::Sentence, r"(?P<cut>)[^\S\n]*\n\s*")?),
            Box::new(PatternRule::new("clause-mark", BoundaryTier::Clause, r"(?P<cut>[,;:–—]+)(?:\s|$)")?),
            Box::new(PatternRule::new("conjunction", BoundaryTier::Clause, r"(?i)(?P<cut>)\s+(?:and|but|or|yet|so)(?:\s|$)")?),
            Box::new(WhitespaceRule),
        ]))
    }

    /// Find split candidates in `window` (byte offsets into `text`).
    ///
    /// Returns candidates sorted by offset; when several rules propose the
    /// same offset only the strongest tier is kept. If no rule fires, the
    /// result is a single forced candidate at the window edge.
    ///
    /// # Panics
    /// Panics if `window` is reversed, runs past `text.len()`, or either end
    /// is not on a char boundary.
    pub fn find_candidates(&self, text: &str, window: Range<usize>) -> Vec<SplitCandidate> {
        assert!(
            window.start <= window.end && text.is_char_boundary(window.start) && text.is_char_boundary(window.end),
            "invalid boundary search window {:?} for text of {} bytes",
            window,
            text.len()
        );
        let lookahead_end = text[window.end..].char_indices().nth(LOOKAHEAD_CHARS).map_or(text.len(), |(i, _)| window.end + i);
        let search = SearchWindow { text, start: window.start, end: window.end, lookahead_end };

        let mut candidates = Vec::new();
        for strategy in &self.strategies {
            strategy.propose(&search, &mut candidates);
        }

        candidates.sort_by_key(|c| (c.offset, c.tier));
        candidates.dedup_by_key(|c| c.offset);

        if candidates.is_empty() && search.accepts(window.end) {
            candidates.push(SplitCandidate::new(window.end, BoundaryTier::Forced));
        }
        candidates
    }
}

/// Pick the strongest candidate, preferring the one closest to the window edge.
pub fn best_candidate(candidates: &[SplitCandidate]) -> Option<SplitCandidate> {
    candidates.iter().copied().min_by(|a, b| a.tier.cmp(&b.tier).then(b.offset.cmp(&a.offset)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_for(text: &str, max_chars: usize) -> Range<usize> {
        let end = text.char_indices().nth(max_chars).map_or(text.len(), |(i, _)| i);
        0..end
    }

    fn tiers_at(text: &str, candidates: &[SplitCandidate]) -> Vec<(String, BoundaryTier)> {
        candidates.iter().map(|c| (text[..c.offset].to_string(), c.tier)).collect()
    }

    #[test]
    fn test_hebrew_sentence_candidates() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "שלום עולם. מה שלומך? טוב מאוד";
        let candidates = classifier.find_candidates(text, window_for(text, 25));

        let sentence: Vec<_> = candidates.iter().filter(|c| c.tier == BoundaryTier::Sentence).collect();
        assert_eq!(sentence.len(), 2);
        assert_eq!(&text[..sentence[0].offset], "שלום עולם.");
        assert_eq!(&text[..sentence[1].offset], "שלום עולם. מה שלומך?");
    }

    #[test]
    fn test_same_offset_keeps_strongest_tier() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "אחת, שתיים שלוש";
        let candidates = classifier.find_candidates(text, 0..text.len());

        // The comma cut and the following space share an offset; the clause tier wins.
        let found = tiers_at(text, &candidates);
        assert!(found.contains(&("אחת,".to_string(), BoundaryTier::Clause)));
        assert!(!found.contains(&("אחת,".to_string(), BoundaryTier::Word)));
        assert!(found.contains(&("אחת, שתיים".to_string(), BoundaryTier::Word)));
        assert!(!found.iter().any(|(_, t)| *t == BoundaryTier::Forced));
    }

    #[test]
    fn test_terminator_inside_word_is_not_a_boundary() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "צה״ל הגיע ב-3.5 שעות";
        let candidates = classifier.find_candidates(text, 0..text.len());
        assert!(candidates.iter().all(|c| c.tier != BoundaryTier::Sentence));
    }

    #[test]
    fn test_closing_gershayim_stays_with_sentence() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "הוא אמר ״כן.״ ואז הלך";
        let candidates = classifier.find_candidates(text, 0..text.len());
        let sentence = candidates.iter().find(|c| c.tier == BoundaryTier::Sentence).unwrap();
        assert_eq!(&text[..sentence.offset], "הוא אמר ״כן.״");
    }

    #[test]
    fn test_maqaf_and_conjunction_are_clause_boundaries() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "בית־ספר גדול אבל ישן";
        let found = tiers_at(text, &classifier.find_candidates(text, 0..text.len()));
        assert!(found.contains(&("בית־".to_string(), BoundaryTier::Clause)));
        assert!(found.contains(&("בית־ספר גדול".to_string(), BoundaryTier::Clause)));
    }

    #[test]
    fn test_conjunction_prefix_of_longer_word_is_ignored() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "ראינו אור חזק";
        let candidates = classifier.find_candidates(text, 0..text.len());
        assert!(candidates.iter().all(|c| c.tier == BoundaryTier::Word));
    }

    #[test]
    fn test_line_break_is_sentence_tier() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "שורה ראשונה  \nשורה שנייה";
        let candidates = classifier.find_candidates(text, 0..text.len());
        let sentence = candidates.iter().find(|c| c.tier == BoundaryTier::Sentence).unwrap();
        assert_eq!(&text[..sentence.offset], "שורה ראשונה");
    }

    #[test]
    fn test_forced_candidate_only_without_boundaries() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "א".repeat(40);
        let window = window_for(&text, 10);
        let candidates = classifier.find_candidates(&text, window.clone());
        assert_eq!(candidates, vec![SplitCandidate::new(window.end, BoundaryTier::Forced)]);
    }

    #[test]
    fn test_candidates_respect_window_edge() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = "אבג דהו. זחט יכל מנס";
        let window = window_for(text, 6);
        let candidates = classifier.find_candidates(text, window.clone());
        assert!(candidates.iter().all(|c| c.offset > 0 && c.offset <= window.end));
        // The sentence end lies past the edge, so only the first space is usable.
        assert_eq!(tiers_at(text, &candidates), vec![("אבג".to_string(), BoundaryTier::Word)]);
    }

    #[test]
    fn test_truncated_lookahead_sees_real_context() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        // The haystack is cut right after "או", which looks like a standalone
        // conjunction until the full text shows it is the start of a longer word.
        let text = format!("אחד שניים{}או{}", " ".repeat(LOOKAHEAD_CHARS - 2), "ק".repeat(LOOKAHEAD_CHARS * 2));
        let window = window_for(&text, 9);
        let candidates = classifier.find_candidates(&text, window);
        assert!(candidates.iter().all(|c| c.tier != BoundaryTier::Clause));

        // A real conjunction further along must not rescue the rejected match.
        let text = format!("{} או סוף", text);
        let candidates = classifier.find_candidates(&text, window_for(&text, 9));
        assert!(candidates.iter().all(|c| c.tier != BoundaryTier::Clause));
    }

    #[test]
    fn test_truncated_lookahead_keeps_confirmed_match() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        let text = format!("אחד שניים{}או {}", " ".repeat(LOOKAHEAD_CHARS - 2), "ק".repeat(LOOKAHEAD_CHARS * 2));
        let window = window_for(&text, 9);
        let end = window.end;
        let candidates = classifier.find_candidates(&text, window);
        assert!(candidates.contains(&SplitCandidate::new(end, BoundaryTier::Clause)));
    }

    #[test]
    #[should_panic(expected = "invalid boundary search window")]
    fn test_window_inside_a_char_panics() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        // "ש" is two bytes; offset 1 splits it.
        classifier.find_candidates("שלום", 0..1);
    }

    #[test]
    #[should_panic(expected = "invalid boundary search window")]
    fn test_window_past_end_panics() {
        let classifier = BoundaryClassifier::hebrew().unwrap();
        classifier.find_candidates("abc", 0..10);
    }

    #[test]
    fn test_latin_rules() {
        let classifier = BoundaryClassifier::latin().unwrap();
        let text = "It rained, and then it stopped. Fine";
        let found = tiers_at(text, &classifier.find_candidates(text, 0..text.len()));
        assert!(found.contains(&("It rained,".to_string(), BoundaryTier::Clause)));
        assert!(found.contains(&("It rained, and then it stopped.".to_string(), BoundaryTier::Sentence)));
    }

    #[test]
    fn test_best_candidate_prefers_tier_then_edge() {
        let candidates = vec![
            SplitCandidate::new(5, BoundaryTier::Word),
            SplitCandidate::new(10, BoundaryTier::Sentence),
            SplitCandidate::new(20, BoundaryTier::Sentence),
            SplitCandidate::new(30, BoundaryTier::Word),
        ];
        assert_eq!(best_candidate(&candidates), Some(SplitCandidate::new(20, BoundaryTier::Sentence)));
        assert_eq!(best_candidate(&[]), None);
    }

    #[test]
    fn test_invalid_rule_is_config_error() {
        assert!(matches!(PatternRule::new("broken", BoundaryTier::Word, "(?P<cut>["), Err(TtsError::Config(_))));
        assert!(matches!(PatternRule::new("nocut", BoundaryTier::Word, r"\s+"), Err(TtsError::Config(_))));
    }
}
