use crate::config::PlannerConfig;
use crate::cost::{CostEstimator, CostReport};
use crate::error::{PlannerError, Result};
use crate::passes::{PassPlan, PassPlanner};
use log::{debug, info};
use review_analyzer::{
    analyze_all, AnalysisCache, AnalysisResult, FallbackReason, Language, SourceUnit,
};
use review_chunker::{ChunkPlanner, ChunkingRecommendation};
use review_protocol::{ModelProfile, ReviewKind, PLAN_SCHEMA_VERSION};
use review_tokens::TokenEstimator;
use serde::{Deserialize, Serialize};

/// What analysis found in one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub path: String,
    pub language: Language,
    pub structural: bool,
    pub declarations: usize,
    pub tokens: usize,
    pub lines: usize,
    pub fallback: Option<FallbackReason>,
}

impl From<&AnalysisResult> for FileSummary {
    fn from(result: &AnalysisResult) -> Self {
        Self {
            path: result.path.clone(),
            language: result.language,
            structural: result.structural,
            declarations: result.declaration_count(),
            tokens: result.estimated_tokens,
            lines: result.line_count,
            fallback: result.fallback,
        }
    }
}

/// Complete plan of one review run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewPlan {
    pub schema_version: u32,
    pub review_kind: ReviewKind,
    pub model: String,
    pub context_window: usize,

    /// Budget the chunks were sized for
    pub chunk_budget_tokens: usize,

    pub files: Vec<FileSummary>,
    pub chunking: ChunkingRecommendation,
    pub passes: PassPlan,
    pub cost: CostReport,
}

impl ReviewPlan {
    #[must_use]
    pub fn total_passes(&self) -> usize {
        self.passes.total_passes
    }

    #[must_use]
    pub fn chunking_required(&self) -> bool {
        self.passes.chunking_required
    }
}

/// End-to-end planner: analysis, chunking, passes and cost.
///
/// ```rust
/// use review_analyzer::SourceUnit;
/// use review_planner::{PlannerConfig, ReviewPlanner};
/// use review_protocol::{ModelCatalog, ReviewKind};
///
/// let model = ModelCatalog::builtin().find("gpt-4o").cloned().unwrap();
/// let units = vec![SourceUnit::new("lib.rs", "pub fn one() -> u8 {\n    1\n}\n")];
///
/// let planner = ReviewPlanner::new(PlannerConfig::default()).unwrap();
/// let plan = planner.plan(&units, ReviewKind::QuickFixes, &model, None).unwrap();
///
/// assert_eq!(plan.total_passes(), 1);
/// assert!(!plan.chunking_required());
/// ```
#[derive(Debug, Clone)]
pub struct ReviewPlanner {
    config: PlannerConfig,
    estimator: TokenEstimator,
}

impl ReviewPlanner {
    pub fn new(config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        let estimator = TokenEstimator::new(config.estimator.clone())?;
        Ok(Self { config, estimator })
    }

    /// Replace the token estimator (e.g. one with exact tokenizers registered)
    #[must_use]
    pub fn with_estimator(mut self, estimator: TokenEstimator) -> Self {
        self.estimator = estimator;
        self
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn estimator(&self) -> &TokenEstimator {
        &self.estimator
    }

    /// Analysis cache sized by the configuration, to hold across runs
    #[must_use]
    pub fn new_cache(&self) -> AnalysisCache {
        self.config.new_cache()
    }

    /// Plan a review of `units` with `model`.
    ///
    /// Pass `cache` to reuse analyses of unchanged files from earlier runs.
    pub fn plan(
        &self,
        units: &[SourceUnit],
        kind: ReviewKind,
        model: &ModelProfile,
        cache: Option<&mut AnalysisCache>,
    ) -> Result<ReviewPlan> {
        if model.context_window == 0 {
            return Err(PlannerError::invalid_config(format!(
                "model '{}' has no context window",
                model.name
            )));
        }

        let counter = self.estimator.counter(&model.family);
        let pass_planner = PassPlanner::new(self.config.passes.clone(), kind)?
            .with_max_output_tokens(Some(model.max_output_tokens))
            .with_min_margin(counter.safety_margin());
        let fraction = self.config.passes.carryover_fraction;

        let results = analyze_all(units, &self.config.analyzer, &counter, cache)?;

        let chunk_budget = self
            .config
            .chunk_budget_tokens
            .unwrap_or_else(|| pass_planner.nominal_budget(model.context_window, fraction, 0));
        debug!(
            "Chunk budget {chunk_budget} tokens for {} ({} tokenizer)",
            model.name,
            counter.tokenizer_name()
        );

        let chunking = ChunkPlanner::new(self.config.chunker.clone(), counter)?.plan(
            units,
            &results,
            kind,
            chunk_budget,
        )?;

        let passes = pass_planner.plan_passes(&chunking.chunks, model.context_window, fraction)?;
        check_assignment(&chunking, &passes)?;

        let cost = CostEstimator::estimate_cost(&passes, &model.prices);

        info!(
            "Review plan for {}: {} files, {} chunks, {} passes, {}",
            model.name,
            units.len(),
            chunking.chunk_count(),
            passes.total_passes,
            cost
        );

        Ok(ReviewPlan {
            schema_version: PLAN_SCHEMA_VERSION,
            review_kind: kind,
            model: model.name.clone(),
            context_window: model.context_window,
            chunk_budget_tokens: chunk_budget,
            files: results.iter().map(|r| FileSummary::from(&**r)).collect(),
            chunking,
            passes,
            cost,
        })
    }
}

/// Every chunk must sit in exactly one pass, in chunk order
fn check_assignment(chunking: &ChunkingRecommendation, passes: &PassPlan) -> Result<()> {
    let assigned: Vec<usize> = passes.chunks().map(|c| c.priority).collect();
    let planned: Vec<usize> = chunking.chunks.iter().map(|c| c.priority).collect();

    if assigned != planned {
        return Err(PlannerError::invariant(format!(
            "{} chunks planned but passes hold {} ({:?})",
            planned.len(),
            assigned.len(),
            assigned
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use review_protocol::ProviderPrices;

    fn model(context_window: usize) -> ModelProfile {
        ModelProfile::new(
            "test-model",
            "test",
            context_window,
            4_096,
            ProviderPrices::per_million(1.0, 2.0),
        )
    }

    fn rust_file(functions: usize) -> String {
        (0..functions)
            .map(|i| format!("pub fn f{i}(x: u32) -> u32 {{\n    x + {i}\n}}\n\n"))
            .collect()
    }

    #[test]
    fn test_small_review_is_one_pass() {
        let planner = ReviewPlanner::new(PlannerConfig::default()).unwrap();
        let units = vec![SourceUnit::new("lib.rs", rust_file(5))];

        let plan = planner
            .plan(&units, ReviewKind::QuickFixes, &model(100_000), None)
            .unwrap();

        assert_eq!(plan.schema_version, PLAN_SCHEMA_VERSION);
        assert_eq!(plan.chunk_budget_tokens, 85_000);
        assert_eq!(plan.files[0].declarations, 5);
        assert_eq!(plan.total_passes(), 1);
        assert!(!plan.chunking_required());
        assert!(plan.cost.total_cost > 0.0);
    }

    #[test]
    fn test_configured_chunk_budget_wins() {
        let config = PlannerConfig {
            chunk_budget_tokens: Some(40),
            ..Default::default()
        };
        let planner = ReviewPlanner::new(config).unwrap();
        let units = vec![SourceUnit::new("lib.rs", rust_file(10))];

        let plan = planner
            .plan(&units, ReviewKind::QuickFixes, &model(100_000), None)
            .unwrap();

        assert_eq!(plan.chunk_budget_tokens, 40);
        assert!(plan.chunking.chunk_count() > 1);
        // small chunks still share one pass
        assert_eq!(plan.total_passes(), 1);
    }

    #[test]
    fn test_cache_is_reused_across_runs() {
        let planner = ReviewPlanner::new(PlannerConfig::default()).unwrap();
        let mut cache = planner.new_cache();
        let units = vec![
            SourceUnit::new("a.rs", rust_file(2)),
            SourceUnit::new("b.rs", rust_file(3)),
        ];

        let first = planner
            .plan(&units, ReviewKind::Security, &model(50_000), Some(&mut cache))
            .unwrap();
        let second = planner
            .plan(&units, ReviewKind::Security, &model(50_000), Some(&mut cache))
            .unwrap();

        assert_eq!(first, second);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn test_zero_context_window_is_rejected() {
        let planner = ReviewPlanner::new(PlannerConfig::default()).unwrap();
        let err = planner
            .plan(&[], ReviewKind::QuickFixes, &model(0), None)
            .unwrap_err();
        assert!(matches!(err, PlannerError::InvalidConfig(_)));
    }

    #[test]
    fn test_check_assignment_detects_lost_chunk() {
        let planner = ReviewPlanner::new(PlannerConfig::default()).unwrap();
        let units = vec![SourceUnit::new("lib.rs", rust_file(3))];
        let mut plan = planner
            .plan(&units, ReviewKind::QuickFixes, &model(100_000), None)
            .unwrap();

        plan.passes.passes[0].chunks.clear();
        let err = check_assignment(&plan.chunking, &plan.passes).unwrap_err();
        assert!(matches!(err, PlannerError::InvariantViolation(_)));
    }
}
