//! Ratio-based token estimation for chunk sizing.

use serde::{Deserialize, Serialize};

use crate::error::{TtsError, TtsResult};

/// Characters per token used when no calibration is available.
///
/// Hebrew averages roughly two characters per model token; 1.5 keeps the
/// estimate above the real count.
pub const DEFAULT_CHARS_PER_TOKEN: f32 = 1.5;

/// Hard per-call token ceiling of the synthesis model.
pub const DEFAULT_TOKEN_LIMIT: usize = 512;

/// Largest accepted characters-per-token ratio.
pub const MAX_CHARS_PER_TOKEN: f32 = 64.0;

/// Correction steps allowed around the float estimate in `max_chars_below`.
const MAX_ADJUST_STEPS: usize = MAX_CHARS_PER_TOKEN as usize + 2;

/// Estimates model tokens from a character count.
///
/// The ratio is a parameter, not a constant: it should come from
/// [`TokenEstimator::calibrate`] against the real tokenizer whenever samples
/// are available, so the estimate stays an upper bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TokenEstimator {
    chars_per_token: f32,
}

impl Default for TokenEstimator {
    fn default() -> Self {
        Self { chars_per_token: DEFAULT_CHARS_PER_TOKEN }
    }
}

impl TokenEstimator {
    /// Create an estimator with an explicit characters-per-token ratio.
    ///
    /// # Errors
    /// Returns a config error unless `0 < chars_per_token <= MAX_CHARS_PER_TOKEN`.
    pub fn new(chars_per_token: f32) -> TtsResult<Self> {
        if !chars_per_token.is_finite() || chars_per_token <= 0.0 || chars_per_token > MAX_CHARS_PER_TOKEN {
            return Err(TtsError::config(format!("chars-per-token must be in (0, {}], got {}", MAX_CHARS_PER_TOKEN, chars_per_token)));
        }
        Ok(Self { chars_per_token })
    }

    /// Derive the ratio from `(char_count, token_count)` pairs measured with
    /// the model tokenizer.
    ///
    /// Takes the smallest observed ratio, i.e. the densest tokenization seen,
    /// so that estimates never undercount for any calibration sample.
    /// The ratio is capped at [`MAX_CHARS_PER_TOKEN`]. Returns `None` when no
    /// usable sample is given.
    pub fn calibrate(samples: &[(usize, usize)]) -> Option<Self> {
        samples
            .iter()
            .filter(|(chars, tokens)| *chars > 0 && *tokens > 0)
            .map(|&(chars, tokens)| chars as f32 / tokens as f32)
            .min_by(|a, b| a.total_cmp(b))
            .map(|chars_per_token| Self { chars_per_token: chars_per_token.min(MAX_CHARS_PER_TOKEN) })
    }

    /// The configured characters-per-token ratio.
    pub fn chars_per_token(&self) -> f32 {
        self.chars_per_token
    }

    /// Estimated token count for `char_count` characters (rounded up).
    pub fn estimate(&self, char_count: usize) -> usize {
        (char_count as f64 / f64::from(self.chars_per_token)).ceil() as usize
    }

    /// Largest character budget whose estimate stays strictly below `token_limit`.
    pub fn max_chars_below(&self, token_limit: usize) -> usize {
        if token_limit == 0 {
            return 0;
        }
        let bound = ((token_limit - 1) as f64 * f64::from(self.chars_per_token)).floor();
        let mut chars = if bound >= (usize::MAX / 2) as f64 { usize::MAX / 2 } else { bound as usize };

        // Float rounding can land a few either side of the true bound.
        for _ in 0..MAX_ADJUST_STEPS {
            if chars == 0 || self.estimate(chars) < token_limit {
                break;
            }
            chars -= 1;
        }
        for _ in 0..MAX_ADJUST_STEPS {
            match chars.checked_add(1) {
                Some(next) if self.estimate(next) < token_limit => chars = next,
                _ => break,
            }
        }
        chars
    }
}
