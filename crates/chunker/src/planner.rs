use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::ladder::{self, LadderInput};
use crate::types::{ChunkingRecommendation, LadderState};
use log::info;
use review_analyzer::{AnalysisResult, SourceUnit};
use review_protocol::ReviewKind;
use review_tokens::TokenCounter;

/// Budget-aware chunk planner
#[derive(Debug, Clone)]
pub struct ChunkPlanner {
    config: ChunkerConfig,
    counter: TokenCounter,
}

impl ChunkPlanner {
    /// Create a planner counting tokens with `counter`
    pub fn new(config: ChunkerConfig, counter: TokenCounter) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, counter })
    }

    #[must_use]
    pub const fn config(&self) -> &ChunkerConfig {
        &self.config
    }

    #[must_use]
    pub const fn counter(&self) -> &TokenCounter {
        &self.counter
    }

    /// Configured margin, raised to the counter's own margin when that is larger
    #[must_use]
    pub fn safety_margin(&self) -> f64 {
        self.config.safety_margin.max(self.counter.safety_margin())
    }

    /// Tokens a chunk is packed up to for `budget`
    #[must_use]
    pub fn packing_target(&self, budget: usize) -> usize {
        ((budget as f64 * (1.0 - self.safety_margin())).floor() as usize).max(1)
    }

    /// Split `units` into chunks of at most `budget` tokens where possible.
    ///
    /// `results[i]` must be the analysis of `units[i]`. Files that cannot be chunked
    /// semantically degrade individually; the plan as a whole walks down the ladder
    /// until one state produces a plan that covers every file exactly.
    pub fn plan<R: AsRef<AnalysisResult>>(
        &self,
        units: &[SourceUnit],
        results: &[R],
        kind: ReviewKind,
        budget: usize,
    ) -> Result<ChunkingRecommendation> {
        if units.len() != results.len() {
            return Err(ChunkerError::InputMismatch {
                units: units.len(),
                results: results.len(),
            });
        }
        if budget == 0 {
            return Err(ChunkerError::invalid_config("budget must be > 0"));
        }

        let input = LadderInput::new(
            units,
            results.iter().map(AsRef::as_ref).collect(),
            kind,
            budget,
            self.safety_margin(),
            &self.config,
            &self.counter,
        );
        let start = if units.is_empty() {
            LadderState::EmergencySingleChunk
        } else {
            LadderState::Semantic
        };
        let recommendation = ladder::run(&input, start)?;

        info!(
            "Planned {} chunks for {} files ({}, {} review): {}",
            recommendation.chunk_count(),
            units.len(),
            recommendation.strategy,
            kind,
            recommendation.stats()
        );
        Ok(recommendation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ladder::Step;
    use crate::types::{ChunkingStrategy, SegmentKind};
    use review_analyzer::{AnalyzerConfig, StructuralAnalyzer};
    use std::collections::BTreeSet;

    fn analyze(units: &[SourceUnit]) -> Vec<AnalysisResult> {
        let mut analyzer =
            StructuralAnalyzer::new(AnalyzerConfig::default(), TokenCounter::default()).unwrap();
        units.iter().map(|u| analyzer.analyze(u)).collect()
    }

    fn planner() -> ChunkPlanner {
        ChunkPlanner::new(ChunkerConfig::default(), TokenCounter::default()).unwrap()
    }

    fn rust_file(functions: usize, body_lines: usize) -> String {
        (0..functions)
            .map(|i| {
                let body: String = (0..body_lines)
                    .map(|j| format!("    let v{j} = {j} + {i};\n"))
                    .collect();
                format!("pub fn f{i}() {{\n{body}}}\n\n")
            })
            .collect()
    }

    #[test]
    fn test_small_file_is_one_chunk() {
        let units = vec![SourceUnit::new("lib.rs", rust_file(3, 5))];
        let results = analyze(&units);
        let plan = planner()
            .plan(&units, &results, ReviewKind::QuickFixes, 100_000)
            .unwrap();

        assert_eq!(plan.strategy, ChunkingStrategy::Grouped);
        assert_eq!(plan.chunk_count(), 1);
        assert!(!plan.chunking_required);
        assert!(!plan.is_degraded());
        assert_eq!(plan.chunks[0].declaration_names(), vec!["f0", "f1", "f2"]);
    }

    #[test]
    fn test_units_never_split_under_tight_budget() {
        let code = rust_file(12, 10);
        let units = vec![SourceUnit::new("lib.rs", code.clone())];
        let results = analyze(&units);
        let plan = planner()
            .plan(&units, &results, ReviewKind::QuickFixes, 400)
            .unwrap();

        assert_eq!(plan.final_state(), LadderState::Semantic);
        assert!(plan.chunk_count() > 1);
        assert!(plan.chunking_required);
        let names: BTreeSet<&str> = plan
            .chunks
            .iter()
            .flat_map(|c| c.declaration_names())
            .collect();
        assert_eq!(names.len(), 12);
        for chunk in &plan.chunks {
            assert!(chunk.estimated_tokens <= planner().packing_target(400));
        }
        let covered: usize = plan
            .chunks
            .iter()
            .flat_map(|c| &c.segments)
            .map(|s| s.byte_len())
            .sum();
        assert_eq!(covered, code.len());
    }

    #[test]
    fn test_non_structural_file_degrades_alone() {
        let units = vec![
            SourceUnit::new("lib.rs", rust_file(2, 3)),
            SourceUnit::new("data.json", "{\"a\": 1}\n"),
        ];
        let results = analyze(&units);
        let plan = planner()
            .plan(&units, &results, ReviewKind::QuickFixes, 100_000)
            .unwrap();

        assert_eq!(plan.final_state(), LadderState::Semantic);
        assert_eq!(plan.degradations.len(), 1);
        assert_eq!(plan.degradations[0].path, "data.json");
        assert_eq!(
            plan.degradations[0].reason,
            "unsupported language; chunked as whole file"
        );
        let json_segments: Vec<_> = plan
            .chunks
            .iter()
            .flat_map(|c| &c.segments)
            .filter(|s| s.path == "data.json")
            .collect();
        assert_eq!(json_segments.len(), 1);
        assert_eq!(json_segments[0].kind, SegmentKind::WholeFile);
    }

    #[test]
    fn test_no_structural_file_goes_line_based() {
        let units = vec![SourceUnit::new("notes.md", "# Title\n\nSome text.\n")];
        let results = analyze(&units);
        let plan = planner()
            .plan(&units, &results, ReviewKind::QuickFixes, 1_000)
            .unwrap();

        assert_eq!(plan.strategy, ChunkingStrategy::LineBased);
        assert_eq!(plan.transitions.len(), 1);
        assert_eq!(plan.transitions[0].from, LadderState::Semantic);
        assert_eq!(plan.transitions[0].reason, "no structurally analyzable file");
    }

    #[test]
    fn test_giant_line_stays_one_line_window() {
        let units = vec![SourceUnit::new("blob.txt", "z".repeat(8_000))];
        let results = analyze(&units);
        let plan = planner()
            .plan(&units, &results, ReviewKind::QuickFixes, 1_000)
            .unwrap();

        assert_eq!(plan.final_state(), LadderState::LineBased);
        assert_eq!(plan.strategy, ChunkingStrategy::LineBased);
        assert_eq!(plan.chunk_count(), 1);
        assert_eq!(plan.chunks[0].estimated_tokens, 2_000);
        assert_eq!(plan.transitions.len(), 1);
        assert_eq!(plan.degradations.len(), 1);
        assert_eq!(
            plan.degradations[0].reason,
            "line 1 of 2000 tokens kept whole over the budget of 1000"
        );
    }

    #[test]
    fn test_split_oversized_chunk_still_degrades() {
        let units = vec![SourceUnit::new("a.txt", "aaa\nbbb\n")];
        let results = analyze(&units);
        let config = ChunkerConfig::default();
        let counter = TokenCounter::default();
        let input = LadderInput::new(
            &units,
            results.iter().collect(),
            ReviewKind::QuickFixes,
            1,
            0.1,
            &config,
            &counter,
        );

        let chunks = match ladder::step(LadderState::WholeFile, &input, None).unwrap() {
            Step::Done(plan) => plan.chunks,
            Step::Degrade { next, reason } => panic!("degraded to {next}: {reason}"),
        };
        assert_eq!(chunks[0].segments[0].line_count(), 2);
        assert_eq!(input.oversized(&chunks), Some(chunks[0].estimated_tokens));
    }

    #[test]
    fn test_empty_input() {
        let plan = planner()
            .plan::<AnalysisResult>(&[], &[], ReviewKind::Security, 1_000)
            .unwrap();
        assert_eq!(plan.strategy, ChunkingStrategy::EmergencySingleChunk);
        assert_eq!(plan.chunk_count(), 0);
        assert!(!plan.chunking_required);
        assert!(plan.transitions.is_empty());
    }

    #[test]
    fn test_mismatched_input_is_rejected() {
        let units = vec![SourceUnit::new("a.rs", "fn a() {}\n")];
        let err = planner()
            .plan::<AnalysisResult>(&units, &[], ReviewKind::Security, 1_000)
            .unwrap_err();
        assert!(matches!(err, ChunkerError::InputMismatch { units: 1, results: 0 }));
        assert!(planner().plan(&units, &analyze(&units), ReviewKind::Security, 0).is_err());
    }

    #[test]
    fn test_each_ladder_state_directly() {
        let units = vec![
            SourceUnit::new("a.rs", rust_file(2, 2)),
            SourceUnit::new("b.rs", ""),
        ];
        let results = analyze(&units);
        let config = ChunkerConfig::default();
        let counter = TokenCounter::default();
        let input = LadderInput::new(
            &units,
            results.iter().collect(),
            ReviewKind::QuickFixes,
            10_000,
            0.1,
            &config,
            &counter,
        );

        for state in [
            LadderState::Semantic,
            LadderState::LineBased,
            LadderState::WholeFile,
            LadderState::EmergencySingleChunk,
        ] {
            match ladder::step(state, &input, Some("test")).unwrap() {
                Step::Done(plan) => {
                    let covered: usize = plan
                        .chunks
                        .iter()
                        .flat_map(|c| &c.segments)
                        .map(|s| s.byte_len())
                        .sum();
                    assert_eq!(covered, units[0].content.len(), "{state}");
                    let files: BTreeSet<usize> = plan.chunks.iter().flat_map(|c| c.files()).collect();
                    assert_eq!(files.len(), 2, "{state}");
                }
                Step::Degrade { next, reason } => panic!("{state} degraded to {next}: {reason}"),
            }
        }
    }

    #[test]
    fn test_disabled_semantic_degrades_immediately() {
        let units = vec![SourceUnit::new("a.rs", rust_file(1, 1))];
        let results = analyze(&units);
        let config = ChunkerConfig::line_based_only();
        let counter = TokenCounter::default();
        let input = LadderInput::new(
            &units,
            results.iter().collect(),
            ReviewKind::QuickFixes,
            10_000,
            0.1,
            &config,
            &counter,
        );

        match ladder::semantic(&input, None).unwrap() {
            Step::Degrade { next, reason } => {
                assert_eq!(next, LadderState::LineBased);
                assert_eq!(reason, "semantic chunking disabled");
            }
            Step::Done(_) => panic!("semantic state accepted a plan while disabled"),
        }
    }
}
