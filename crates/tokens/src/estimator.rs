use crate::config::EstimatorConfig;
use crate::counter::TokenCounter;
use crate::error::{Result, TokenError};
use crate::tokenizer::{CharRatioTokenizer, Tokenizer};
use std::collections::HashMap;
use std::sync::Arc;

/// Registry of tokenizers keyed by model family, with a conservative fallback.
#[derive(Debug, Clone)]
pub struct TokenEstimator {
    tokenizers: HashMap<String, Arc<dyn Tokenizer>>,
    fallback: Arc<dyn Tokenizer>,
    fallback_margin: f64,
}

impl TokenEstimator {
    /// Create an estimator with only the fallback tokenizer
    pub fn new(config: EstimatorConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            tokenizers: HashMap::new(),
            fallback: Arc::new(CharRatioTokenizer::new(config.fallback_chars_per_token)),
            fallback_margin: config.fallback_safety_margin,
        })
    }

    /// Register a tokenizer for a model family (case-insensitive, replaces any previous one)
    pub fn register(&mut self, family: &str, tokenizer: impl Tokenizer + 'static) -> Result<()> {
        let key = normalize_family(family);
        if key.is_empty() {
            return Err(TokenError::EmptyFamily);
        }
        log::debug!("Registered tokenizer '{}' for family '{key}'", tokenizer.name());
        self.tokenizers.insert(key, Arc::new(tokenizer));
        Ok(())
    }

    /// Builder: register a tokenizer
    pub fn with_tokenizer(
        mut self,
        family: &str,
        tokenizer: impl Tokenizer + 'static,
    ) -> Result<Self> {
        self.register(family, tokenizer)?;
        Ok(self)
    }

    /// Estimate tokens of `text` for `model_family`
    #[must_use]
    pub fn estimate_tokens(&self, text: &str, model_family: &str) -> usize {
        self.resolve(model_family).count(text)
    }

    /// Whether `model_family` resolves to an exact tokenizer
    #[must_use]
    pub fn is_exact(&self, model_family: &str) -> bool {
        self.resolve(model_family).is_exact()
    }

    /// Handle bound to one family, for components that count many texts
    #[must_use]
    pub fn counter(&self, model_family: &str) -> TokenCounter {
        let tokenizer = Arc::clone(self.resolve(model_family));
        let safety_margin = if tokenizer.is_exact() {
            0.0
        } else {
            self.fallback_margin
        };
        TokenCounter::new(normalize_family(model_family), tokenizer, safety_margin)
    }

    /// Registered families, sorted
    #[must_use]
    pub fn families(&self) -> Vec<&str> {
        let mut families: Vec<&str> = self.tokenizers.keys().map(String::as_str).collect();
        families.sort_unstable();
        families
    }

    /// Exact match first, then the prefix before the first '-' ("claude-3-opus" -> "claude")
    fn resolve(&self, model_family: &str) -> &Arc<dyn Tokenizer> {
        let key = normalize_family(model_family);
        if let Some(tokenizer) = self.tokenizers.get(&key) {
            return tokenizer;
        }
        key.split('-')
            .next()
            .and_then(|prefix| self.tokenizers.get(prefix))
            .unwrap_or(&self.fallback)
    }
}

impl Default for TokenEstimator {
    fn default() -> Self {
        let config = EstimatorConfig::default();
        Self {
            tokenizers: HashMap::new(),
            fallback: Arc::new(CharRatioTokenizer::new(config.fallback_chars_per_token)),
            fallback_margin: config.fallback_safety_margin,
        }
    }
}

fn normalize_family(family: &str) -> String {
    family.trim().to_ascii_lowercase()
}
