use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Price table for one model, in currency units per token.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ProviderPrices {
    pub input_per_token: f64,
    pub output_per_token: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl ProviderPrices {
    #[must_use]
    pub fn new(input_per_token: f64, output_per_token: f64) -> Self {
        Self {
            input_per_token,
            output_per_token,
            currency: default_currency(),
        }
    }

    /// Providers usually quote prices per million tokens.
    #[must_use]
    pub fn per_million(input: f64, output: f64) -> Self {
        Self::new(input / 1_000_000.0, output / 1_000_000.0)
    }

    #[must_use]
    pub fn free() -> Self {
        Self::new(0.0, 0.0)
    }
}

/// Static description of a model the review can target.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, JsonSchema)]
pub struct ModelProfile {
    pub name: String,
    /// Tokenizer family used for token estimation (e.g. "claude", "gpt")
    pub family: String,
    pub context_window: usize,
    pub max_output_tokens: usize,
    pub prices: ProviderPrices,
}

impl ModelProfile {
    pub fn new(
        name: impl Into<String>,
        family: impl Into<String>,
        context_window: usize,
        max_output_tokens: usize,
        prices: ProviderPrices,
    ) -> Self {
        Self {
            name: name.into(),
            family: family.into(),
            context_window,
            max_output_tokens,
            prices,
        }
    }
}

/// Lookup table of known models. Never fetched from the network.
#[derive(Debug, Serialize, Deserialize, Clone, Default, JsonSchema)]
pub struct ModelCatalog {
    pub models: Vec<ModelProfile>,
}

impl ModelCatalog {
    /// Built-in table with list prices at the time of writing.
    #[must_use]
    pub fn builtin() -> Self {
        let models = vec![
            ModelProfile::new(
                "claude-sonnet-4",
                "claude",
                200_000,
                64_000,
                ProviderPrices::per_million(3.0, 15.0),
            ),
            ModelProfile::new(
                "claude-opus-4",
                "claude",
                200_000,
                32_000,
                ProviderPrices::per_million(15.0, 75.0),
            ),
            ModelProfile::new(
                "claude-3-5-haiku",
                "claude",
                200_000,
                8_192,
                ProviderPrices::per_million(0.8, 4.0),
            ),
            ModelProfile::new(
                "gpt-4o",
                "gpt",
                128_000,
                16_384,
                ProviderPrices::per_million(2.5, 10.0),
            ),
            ModelProfile::new(
                "gpt-4.1",
                "gpt",
                1_047_576,
                32_768,
                ProviderPrices::per_million(2.0, 8.0),
            ),
            ModelProfile::new(
                "gemini-2.5-pro",
                "gemini",
                1_048_576,
                65_536,
                ProviderPrices::per_million(1.25, 10.0),
            ),
            ModelProfile::new(
                "gemini-2.0-flash",
                "gemini",
                1_048_576,
                8_192,
                ProviderPrices::per_million(0.1, 0.4),
            ),
        ];
        Self { models }
    }

    /// Case-insensitive lookup by model name.
    #[must_use]
    pub fn find(&self, name: &str) -> Option<&ModelProfile> {
        let name = name.trim();
        self.models
            .iter()
            .find(|model| model.name.eq_ignore_ascii_case(name))
    }

    /// Add or replace a model (matched by name).
    #[must_use]
    pub fn with_model(mut self, profile: ModelProfile) -> Self {
        self.models
            .retain(|model| !model.name.eq_ignore_ascii_case(&profile.name));
        self.models.push(profile);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_million_converts_to_per_token() {
        let prices = ProviderPrices::per_million(3.0, 15.0);
        assert!((prices.input_per_token - 0.000_003).abs() < 1e-15);
        assert!((prices.output_per_token - 0.000_015).abs() < 1e-15);
        assert_eq!(prices.currency, "USD");
    }

    #[test]
    fn builtin_lookup_is_case_insensitive() {
        let catalog = ModelCatalog::builtin();
        let model = catalog.find("GPT-4o").expect("gpt-4o in catalog");
        assert_eq!(model.family, "gpt");
        assert_eq!(model.context_window, 128_000);
        assert!(catalog.find("no-such-model").is_none());
    }

    #[test]
    fn with_model_replaces_existing_entry() {
        let catalog = ModelCatalog::builtin().with_model(ModelProfile::new(
            "gpt-4o",
            "gpt",
            64_000,
            4_096,
            ProviderPrices::free(),
        ));
        let matches = catalog
            .models
            .iter()
            .filter(|m| m.name == "gpt-4o")
            .count();
        assert_eq!(matches, 1);
        assert_eq!(catalog.find("gpt-4o").unwrap().context_window, 64_000);
    }

    #[test]
    fn prices_deserialize_with_default_currency() {
        let prices: ProviderPrices =
            serde_json::from_str(r#"{"input_per_token":0.000007,"output_per_token":0.000021}"#)
                .unwrap();
        assert_eq!(prices.currency, "USD");
    }
}
