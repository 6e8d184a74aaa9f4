//! Strategy selection as an ordered rule table.
//!
//! Every rule is a plain predicate over the semantic layout reporting how strongly its
//! strategy applies. The strongest level present wins; strategies tied at that level
//! are all built and compared by the planner.

use crate::atoms::Atom;
use crate::config::ChunkerConfig;
use crate::types::ChunkingStrategy;
use review_protocol::{ReviewFocus, ReviewKind};

/// How strongly a rule applies
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub(crate) enum Applicability {
    Default,
    Shape,
    ReviewFocus,
}

/// What the rules look at
pub(crate) struct StrategyInput<'a> {
    pub kind: ReviewKind,
    /// Unit atoms of every file laid out as units, in input order
    pub units: &'a [&'a Atom],
    pub budget: usize,
    pub config: &'a ChunkerConfig,
}

impl StrategyInput<'_> {
    fn structural_tokens(&self) -> usize {
        self.units.iter().map(|u| u.tokens).sum()
    }
}

type Rule = fn(&StrategyInput<'_>) -> Option<Applicability>;

pub(crate) struct StrategyRule {
    pub strategy: ChunkingStrategy,
    pub rule: Rule,
    pub description: &'static str,
}

pub(crate) static STRATEGY_TABLE: [StrategyRule; 5] = [
    StrategyRule {
        strategy: ChunkingStrategy::Hierarchical,
        rule: hierarchical,
        description: "architecture review of container-dominated code, one container per chunk",
    },
    StrategyRule {
        strategy: ChunkingStrategy::Contextual,
        rule: contextual,
        description: "data-flow review, units grouped with their direct dependencies",
    },
    StrategyRule {
        strategy: ChunkingStrategy::Functional,
        rule: functional,
        description: "performance review, units that reference each other kept together",
    },
    StrategyRule {
        strategy: ChunkingStrategy::Individual,
        rule: individual,
        description: "few large or complex units, one per chunk",
    },
    StrategyRule {
        strategy: ChunkingStrategy::Grouped,
        rule: grouped,
        description: "units bin-packed first-fit-decreasing",
    },
];

pub(crate) fn hierarchical(input: &StrategyInput<'_>) -> Option<Applicability> {
    if !input.kind.favors(ReviewFocus::Architecture) {
        return None;
    }
    let total = input.structural_tokens();
    let containers: usize = input
        .units
        .iter()
        .filter(|u| u.unit().is_some_and(|info| info.container))
        .map(|u| u.tokens)
        .sum();
    let dominant =
        containers > 0 && containers as f64 >= input.config.container_dominance * total as f64;
    dominant.then_some(Applicability::ReviewFocus)
}

pub(crate) fn contextual(input: &StrategyInput<'_>) -> Option<Applicability> {
    (input.kind.favors(ReviewFocus::DataFlow) && !input.units.is_empty())
        .then_some(Applicability::ReviewFocus)
}

pub(crate) fn functional(input: &StrategyInput<'_>) -> Option<Applicability> {
    (input.kind.favors(ReviewFocus::Performance) && !input.units.is_empty())
        .then_some(Applicability::ReviewFocus)
}

pub(crate) fn individual(input: &StrategyInput<'_>) -> Option<Applicability> {
    let count = input.units.len();
    if count == 0 || count > input.config.few_units_threshold {
        return None;
    }
    let average = input.structural_tokens() as f64 / count as f64;
    let large = average >= input.config.large_unit_fraction * input.budget as f64;
    let complex = input
        .units
        .iter()
        .filter_map(|u| u.unit())
        .any(|info| info.complexity >= input.config.high_complexity_threshold);
    (large || complex).then_some(Applicability::Shape)
}

pub(crate) fn grouped(_input: &StrategyInput<'_>) -> Option<Applicability> {
    Some(Applicability::Default)
}

/// Rules at the strongest applicability level present, in table order
pub(crate) fn candidates(input: &StrategyInput<'_>) -> Vec<&'static StrategyRule> {
    let scored: Vec<(&'static StrategyRule, Applicability)> = STRATEGY_TABLE
        .iter()
        .filter_map(|entry| (entry.rule)(input).map(|level| (entry, level)))
        .collect();
    let Some(best) = scored.iter().map(|(_, level)| *level).max() else {
        return Vec::new();
    };
    scored
        .into_iter()
        .filter(|(_, level)| *level == best)
        .map(|(entry, _)| entry)
        .collect()
}
