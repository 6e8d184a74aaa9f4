use crate::passes::PassPlan;
use review_protocol::ProviderPrices;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cost of one pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassCost {
    pub index: usize,
    pub input_tokens: usize,
    pub output_tokens: usize,
    pub total_tokens: usize,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub exceeds_nominal_budget: bool,
}

/// Projected cost of a pass plan. Totals are sums of the rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostReport {
    pub passes: Vec<PassCost>,
    pub total_input_tokens: usize,
    pub total_output_tokens: usize,
    pub total_tokens: usize,
    pub input_cost: f64,
    pub output_cost: f64,
    pub total_cost: f64,
    pub currency: String,

    /// Passes the caller should warn about
    pub oversized_passes: Vec<usize>,
}

impl CostReport {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.passes.is_empty()
    }
}

impl fmt::Display for CostReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Passes: {} | Input: {} | Output: {} | Cost: {:.4} {}",
            self.passes.len(),
            self.total_input_tokens,
            self.total_output_tokens,
            self.total_cost,
            self.currency
        )?;
        if !self.oversized_passes.is_empty() {
            write!(f, " | Oversized: {:?}", self.oversized_passes)?;
        }
        Ok(())
    }
}

/// Prices a pass plan. Pure arithmetic, no I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct CostEstimator;

impl CostEstimator {
    #[must_use]
    pub fn estimate_cost(plan: &PassPlan, prices: &ProviderPrices) -> CostReport {
        let passes: Vec<PassCost> = plan
            .passes
            .iter()
            .map(|pass| {
                let input_cost = pass.input_tokens as f64 * prices.input_per_token;
                let output_cost = pass.output_tokens as f64 * prices.output_per_token;
                PassCost {
                    index: pass.index,
                    input_tokens: pass.input_tokens,
                    output_tokens: pass.output_tokens,
                    total_tokens: pass.input_tokens + pass.output_tokens,
                    input_cost,
                    output_cost,
                    total_cost: input_cost + output_cost,
                    exceeds_nominal_budget: pass.exceeds_nominal_budget,
                }
            })
            .collect();

        // totals come from the rows
        let total_input_tokens: usize = passes.iter().map(|p| p.input_tokens).sum();
        let total_output_tokens: usize = passes.iter().map(|p| p.output_tokens).sum();
        let input_cost: f64 = passes.iter().map(|p| p.input_cost).sum();
        let output_cost: f64 = passes.iter().map(|p| p.output_cost).sum();
        let total_cost: f64 = passes.iter().map(|p| p.total_cost).sum();
        let oversized_passes = passes
            .iter()
            .filter(|p| p.exceeds_nominal_budget)
            .map(|p| p.index)
            .collect();

        CostReport {
            total_tokens: total_input_tokens + total_output_tokens,
            total_input_tokens,
            total_output_tokens,
            input_cost,
            output_cost,
            total_cost,
            currency: prices.currency.clone(),
            oversized_passes,
            passes,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::passes::Pass;

    fn pass(index: usize, input_tokens: usize, output_tokens: usize, oversized: bool) -> Pass {
        Pass {
            index,
            chunks: Vec::new(),
            chunk_tokens: input_tokens,
            carried_tokens: 0,
            input_tokens,
            output_tokens,
            nominal_budget: 1_000,
            exceeds_nominal_budget: oversized,
        }
    }

    fn plan(passes: Vec<Pass>) -> PassPlan {
        PassPlan {
            total_passes: passes.len(),
            total_input_tokens: passes.iter().map(|p| p.input_tokens).sum(),
            total_output_tokens: passes.iter().map(|p| p.output_tokens).sum(),
            passes,
            context_window: 128_000,
            carryover_fraction: 0.15,
            chunking_required: false,
        }
    }

    #[test]
    fn test_single_pass_cost() {
        let report = CostEstimator::estimate_cost(
            &plan(vec![pass(0, 10_000, 2_000, false)]),
            &ProviderPrices::new(0.000_007, 0.000_021),
        );

        assert!((report.input_cost - 0.07).abs() < 1e-9);
        assert!((report.output_cost - 0.042).abs() < 1e-9);
        assert!((report.total_cost - 0.112).abs() < 1e-9);
        assert_eq!(report.total_tokens, 12_000);
        assert_eq!(report.currency, "USD");
    }

    #[test]
    fn test_totals_match_rows() {
        let report = CostEstimator::estimate_cost(
            &plan(vec![
                pass(0, 90_000, 9_000, false),
                pass(1, 60_000, 6_000, false),
                pass(2, 150_000, 15_000, true),
            ]),
            &ProviderPrices::per_million(3.0, 15.0),
        );

        let row_sum: f64 = report.passes.iter().map(|p| p.total_cost).sum();
        assert_eq!(report.total_cost, row_sum);
        assert_eq!(report.total_input_tokens, 300_000);
        assert_eq!(report.total_output_tokens, 30_000);
        assert!((report.total_cost - 1.35).abs() < 1e-9);
        assert_eq!(report.oversized_passes, vec![2]);
        assert!(report.to_string().ends_with("| Oversized: [2]"));
    }

    #[test]
    fn test_empty_plan_costs_nothing() {
        let report = CostEstimator::estimate_cost(
            &PassPlan::empty(),
            &ProviderPrices::per_million(3.0, 15.0),
        );
        assert!(report.is_empty());
        assert_eq!(report.total_cost, 0.0);
        assert_eq!(
            report.to_string(),
            "Passes: 0 | Input: 0 | Output: 0 | Cost: 0.0000 USD"
        );
    }

    #[test]
    fn test_free_model() {
        let report = CostEstimator::estimate_cost(
            &plan(vec![pass(0, 5_000, 500, false)]),
            &ProviderPrices::free(),
        );
        assert_eq!(report.total_cost, 0.0);
        assert_eq!(report.total_tokens, 5_500);
    }
}
