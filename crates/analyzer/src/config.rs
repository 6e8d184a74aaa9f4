use crate::error::{AnalyzerError, Result};
use serde::{Deserialize, Serialize};

/// Configuration for structural analysis
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Files above this size are not parsed
    pub max_file_bytes: usize,

    /// Upper bound on dependencies kept per declaration
    pub max_references_per_declaration: usize,

    /// Worker threads for batch analysis (None = available cores)
    pub max_workers: Option<usize>,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            max_file_bytes: 1024 * 1024,
            max_references_per_declaration: 64,
            max_workers: None,
        }
    }
}

impl AnalyzerConfig {
    /// Single-threaded analysis, useful for deterministic debugging
    pub fn sequential() -> Self {
        Self {
            max_workers: Some(1),
            ..Default::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_file_bytes == 0 {
            return Err(AnalyzerError::invalid_config("max_file_bytes must be > 0"));
        }

        if self.max_references_per_declaration == 0 {
            return Err(AnalyzerError::invalid_config(
                "max_references_per_declaration must be > 0",
            ));
        }

        if self.max_workers == Some(0) {
            return Err(AnalyzerError::invalid_config("max_workers must be > 0"));
        }

        Ok(())
    }

    /// Number of threads batch analysis runs on
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.max_workers.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(std::num::NonZeroUsize::get)
                .unwrap_or(1)
        })
    }

    /// Settings that change analysis output; part of every cache key
    #[must_use]
    pub fn fingerprint(&self) -> String {
        format!(
            "max_bytes={};max_refs={}",
            self.max_file_bytes, self.max_references_per_declaration
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
        assert!(AnalyzerConfig::sequential().validate().is_ok());
        assert_eq!(AnalyzerConfig::sequential().worker_count(), 1);
    }

    #[test]
    fn test_config_validation() {
        let mut config = AnalyzerConfig {
            max_file_bytes: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.max_file_bytes = 10;
        config.max_workers = Some(0);
        assert!(config.validate().is_err());

        config.max_workers = Some(4);
        config.max_references_per_declaration = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_fingerprint_tracks_output_settings() {
        let base = AnalyzerConfig::default();
        let workers = AnalyzerConfig {
            max_workers: Some(2),
            ..Default::default()
        };
        let smaller = AnalyzerConfig {
            max_file_bytes: 1024,
            ..Default::default()
        };

        assert_eq!(base.fingerprint(), workers.fingerprint());
        assert_ne!(base.fingerprint(), smaller.fingerprint());
    }
}
