use crate::error::{ChunkerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for chunk planning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkerConfig {
    /// Headroom kept below the budget when packing (0.0..1.0).
    ///
    /// The effective margin is never lower than the token counter's own margin.
    pub safety_margin: f64,

    /// Share of structural tokens containers must hold for hierarchical chunking
    pub container_dominance: f64,

    /// Most units the individual strategy accepts
    pub few_units_threshold: usize,

    /// Average unit size, as a fraction of the budget, that counts as large
    pub large_unit_fraction: f64,

    /// Complexity score that makes a unit worth reviewing alone
    pub high_complexity_threshold: u32,

    /// Maximum lines per line-based window
    pub line_window: usize,

    /// Try strategies that keep declarations intact before falling back to lines
    pub semantic: bool,
}

impl Default for ChunkerConfig {
    fn default() -> Self {
        Self {
            safety_margin: 0.10,
            container_dominance: 0.5,
            few_units_threshold: 8,
            large_unit_fraction: 0.25,
            high_complexity_threshold: 15,
            line_window: 500,
            semantic: true,
        }
    }
}

impl ChunkerConfig {
    /// Models with small windows: shorter line windows, fewer solo units
    pub fn for_small_context() -> Self {
        Self {
            few_units_threshold: 4,
            line_window: 200,
            ..Default::default()
        }
    }

    /// Models with very large windows
    pub fn for_large_context() -> Self {
        Self {
            few_units_threshold: 16,
            large_unit_fraction: 0.1,
            line_window: 1000,
            ..Default::default()
        }
    }

    /// Skip structural strategies entirely
    pub fn line_based_only() -> Self {
        Self {
            semantic: false,
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.safety_margin) {
            return Err(ChunkerError::invalid_config(format!(
                "safety_margin must be in [0, 1), got {}",
                self.safety_margin
            )));
        }

        if !(0.0..=1.0).contains(&self.container_dominance) {
            return Err(ChunkerError::invalid_config(format!(
                "container_dominance must be in [0, 1], got {}",
                self.container_dominance
            )));
        }

        if !(self.large_unit_fraction > 0.0 && self.large_unit_fraction <= 1.0) {
            return Err(ChunkerError::invalid_config(format!(
                "large_unit_fraction must be in (0, 1], got {}",
                self.large_unit_fraction
            )));
        }

        if self.few_units_threshold == 0 {
            return Err(ChunkerError::invalid_config("few_units_threshold must be > 0"));
        }

        if self.line_window == 0 {
            return Err(ChunkerError::invalid_config("line_window must be > 0"));
        }

        Ok(())
    }
}
