use crate::error::{PlannerError, Result};
use anyhow::Context;
use review_analyzer::{AnalyzerConfig, DEFAULT_CACHE_CAPACITY};
use review_chunker::ChunkerConfig;
use review_tokens::{EstimatorConfig, FALLBACK_SAFETY_MARGIN};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Configuration for pass planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassConfig {
    /// Share of every pass held back for carried context (0.0..1.0)
    pub carryover_fraction: f64,

    /// Minimum share held back regardless of `carryover_fraction`.
    ///
    /// Raised to the token counter's margin when counts are approximate.
    pub safety_margin: f64,

    /// Summary tokens carried into the second pass
    pub carryover_base_tokens: usize,

    /// Extra summary tokens carried per further pass
    pub carryover_tokens_per_pass: usize,
}

impl Default for PassConfig {
    fn default() -> Self {
        Self {
            carryover_fraction: 0.15,
            safety_margin: FALLBACK_SAFETY_MARGIN,
            carryover_base_tokens: 2_000,
            carryover_tokens_per_pass: 500,
        }
    }
}

impl PassConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.carryover_fraction) {
            return Err(PlannerError::invalid_config(format!(
                "carryover_fraction must be in [0, 1), got {}",
                self.carryover_fraction
            )));
        }

        if !(0.0..1.0).contains(&self.safety_margin) {
            return Err(PlannerError::invalid_config(format!(
                "safety_margin must be in [0, 1), got {}",
                self.safety_margin
            )));
        }

        Ok(())
    }
}

/// Everything the review pipeline can be configured with.
///
/// Every field is optional in TOML; missing sections take their defaults:
///
/// ```toml
/// chunk_budget_tokens = 60000
///
/// [passes]
/// carryover_fraction = 0.2
///
/// [chunker]
/// line_window = 300
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    /// Chunk budget; None uses the first pass's nominal budget
    pub chunk_budget_tokens: Option<usize>,

    /// Entries kept by caches created with [`PlannerConfig::new_cache`]
    pub cache_capacity: usize,

    pub analyzer: AnalyzerConfig,
    pub estimator: EstimatorConfig,
    pub chunker: ChunkerConfig,
    pub passes: PassConfig,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            chunk_budget_tokens: None,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            analyzer: AnalyzerConfig::default(),
            estimator: EstimatorConfig::default(),
            chunker: ChunkerConfig::default(),
            passes: PassConfig::default(),
        }
    }
}

impl PlannerConfig {
    /// Parse from TOML text
    pub fn from_toml_str(text: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse planner configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read planner configuration {}", path.display()))?;
        Self::from_toml_str(&text)
            .with_context(|| format!("Invalid configuration in {}", path.display()))
    }

    /// Render as TOML
    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        toml::to_string_pretty(self).context("Failed to render planner configuration")
    }

    /// Validate every section
    pub fn validate(&self) -> Result<()> {
        self.analyzer.validate()?;
        self.estimator.validate()?;
        self.chunker.validate()?;
        self.passes.validate()?;

        if self.chunk_budget_tokens == Some(0) {
            return Err(PlannerError::invalid_config("chunk_budget_tokens must be > 0"));
        }
        if self.cache_capacity == 0 {
            return Err(PlannerError::invalid_config("cache_capacity must be > 0"));
        }

        Ok(())
    }

    /// Analysis cache sized by this configuration
    #[must_use]
    pub fn new_cache(&self) -> review_analyzer::AnalysisCache {
        review_analyzer::AnalysisCache::new(self.cache_capacity)
    }
}
