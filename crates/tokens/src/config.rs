use crate::error::{Result, TokenError};
use crate::{FALLBACK_CHARS_PER_TOKEN, FALLBACK_SAFETY_MARGIN};
use serde::{Deserialize, Serialize};

/// Configuration of the fallback estimator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EstimatorConfig {
    /// Characters per token assumed for families without a registered tokenizer
    pub fallback_chars_per_token: f64,

    /// Documented worst-case under-count of the fallback (0.0..1.0)
    pub fallback_safety_margin: f64,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            fallback_chars_per_token: FALLBACK_CHARS_PER_TOKEN,
            fallback_safety_margin: FALLBACK_SAFETY_MARGIN,
        }
    }
}

impl EstimatorConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if !(self.fallback_chars_per_token.is_finite() && self.fallback_chars_per_token > 0.0) {
            return Err(TokenError::invalid_config(format!(
                "fallback_chars_per_token must be a positive number, got {}",
                self.fallback_chars_per_token
            )));
        }

        if !(0.0..1.0).contains(&self.fallback_safety_margin) {
            return Err(TokenError::invalid_config(format!(
                "fallback_safety_margin must be in [0, 1), got {}",
                self.fallback_safety_margin
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_valid() {
        assert!(EstimatorConfig::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        let mut config = EstimatorConfig {
            fallback_chars_per_token: 0.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        config.fallback_chars_per_token = f64::NAN;
        assert!(config.validate().is_err());

        config.fallback_chars_per_token = 3.5;
        config.fallback_safety_margin = 1.0;
        assert!(config.validate().is_err());

        config.fallback_safety_margin = 0.2;
        assert!(config.validate().is_ok());
    }
}
