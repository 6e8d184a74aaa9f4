use std::fmt;

/// Counts tokens for one model family.
///
/// Implementations must be deterministic and monotonic (`count(a + b) >= count(a)`).
pub trait Tokenizer: Send + Sync + fmt::Debug {
    /// Short identifier used in logs and plan rationales
    fn name(&self) -> &str;

    /// Number of tokens in `text`
    fn count(&self, text: &str) -> usize;

    /// Whether counts are exact for the family this tokenizer is registered under
    fn is_exact(&self) -> bool {
        true
    }

    /// Identifies the counts this tokenizer produces; tokenizers with equal
    /// fingerprints must count every text alike
    fn fingerprint(&self) -> String {
        self.name().to_string()
    }
}

/// Approximation: one token per `chars_per_token` characters, rounded up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharRatioTokenizer {
    chars_per_token: f64,
    exact: bool,
}

impl CharRatioTokenizer {
    /// Approximate tokenizer; `chars_per_token` must be positive.
    #[must_use]
    pub fn new(chars_per_token: f64) -> Self {
        Self {
            chars_per_token,
            exact: false,
        }
    }

    /// Ratio tokenizer calibrated against a real vocabulary and trusted as exact.
    #[must_use]
    pub fn calibrated(chars_per_token: f64) -> Self {
        Self {
            chars_per_token,
            exact: true,
        }
    }

    #[must_use]
    pub const fn chars_per_token(&self) -> f64 {
        self.chars_per_token
    }
}

impl Tokenizer for CharRatioTokenizer {
    fn name(&self) -> &str {
        if self.exact {
            "calibrated-ratio"
        } else {
            "char-ratio"
        }
    }

    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count();
        (chars as f64 / self.chars_per_token).ceil() as usize
    }

    fn is_exact(&self) -> bool {
        self.exact
    }

    fn fingerprint(&self) -> String {
        format!("{}/{}", self.name(), self.chars_per_token)
    }
}
