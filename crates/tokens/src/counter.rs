use crate::tokenizer::Tokenizer;
use std::sync::Arc;

/// Token counting handle bound to one model family.
///
/// Cheap to clone; shared by the analyzer, the chunk planner and the pass planner so
/// they all count with the same tokenizer.
#[derive(Debug, Clone)]
pub struct TokenCounter {
    family: String,
    tokenizer: Arc<dyn Tokenizer>,
    safety_margin: f64,
}

impl TokenCounter {
    pub(crate) fn new(family: String, tokenizer: Arc<dyn Tokenizer>, safety_margin: f64) -> Self {
        Self {
            family,
            tokenizer,
            safety_margin,
        }
    }

    #[must_use]
    pub fn count(&self, text: &str) -> usize {
        self.tokenizer.count(text)
    }

    #[must_use]
    pub fn family(&self) -> &str {
        &self.family
    }

    #[must_use]
    pub fn tokenizer_name(&self) -> &str {
        self.tokenizer.name()
    }

    /// Changes whenever counts could change, for keying cached token counts
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!("{}:{}", self.family, self.tokenizer.fingerprint())
    }

    #[must_use]
    pub fn is_exact(&self) -> bool {
        self.tokenizer.is_exact()
    }

    /// Fraction of headroom to keep because counts may be under-estimated
    #[must_use]
    pub const fn safety_margin(&self) -> f64 {
        self.safety_margin
    }

    /// `budget` shrunk by the safety margin, never below one token
    #[must_use]
    pub fn with_margin(&self, budget: usize) -> usize {
        let shrunk = (budget as f64 * (1.0 - self.safety_margin)).floor() as usize;
        shrunk.max(1).min(budget.max(1))
    }
}

impl Default for TokenCounter {
    fn default() -> Self {
        crate::TokenEstimator::default().counter("default")
    }
}
