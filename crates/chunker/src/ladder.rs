//! The degradation ladder.
//!
//! ```text
//! Semantic ──> LineBased ──> WholeFile ──> EmergencySingleChunk
//! ```
//!
//! Each state is a function of the planning input and the reason the previous state
//! gave up. It either accepts a plan or names the next state and why.

use crate::atoms::{self, Atom, AtomKind, LineIndex};
use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::packing;
use crate::strategy::{self, StrategyInput};
use crate::types::{
    Chunk, ChunkingRecommendation, ChunkingStrategy, LadderState, Segment, SegmentKind, Transition,
};
use crate::verify::verify_coverage;
use log::{debug, warn};
use review_analyzer::{AnalysisResult, SourceUnit};
use review_protocol::{DegradationNote, ReviewKind};
use review_tokens::TokenCounter;

/// Everything a ladder state may look at
pub(crate) struct LadderInput<'a> {
    pub units: &'a [SourceUnit],
    pub results: Vec<&'a AnalysisResult>,
    pub lines: Vec<LineIndex>,
    pub kind: ReviewKind,
    pub budget: usize,
    /// Packing target below the budget
    pub target: usize,
    /// Largest acceptable chunk: the budget plus the safety margin
    pub limit: usize,
    pub total_tokens: usize,
    pub config: &'a ChunkerConfig,
    pub counter: &'a TokenCounter,
}

impl<'a> LadderInput<'a> {
    pub fn new(
        units: &'a [SourceUnit],
        results: Vec<&'a AnalysisResult>,
        kind: ReviewKind,
        budget: usize,
        margin: f64,
        config: &'a ChunkerConfig,
        counter: &'a TokenCounter,
    ) -> Self {
        let target = ((budget as f64 * (1.0 - margin)).floor() as usize).max(1);
        let limit = (budget as f64 * (1.0 + margin)).floor() as usize;
        Self {
            lines: units.iter().map(|u| LineIndex::new(&u.content)).collect(),
            total_tokens: units.iter().map(|u| counter.count(&u.content)).sum(),
            units,
            results,
            kind,
            budget,
            target,
            limit: limit.max(budget),
            config,
            counter,
        }
    }

    fn lengths(&self) -> Vec<usize> {
        self.units.iter().map(|u| u.content.len()).collect()
    }

    fn recommendation(
        &self,
        strategy: ChunkingStrategy,
        rationale: String,
        degradations: Vec<DegradationNote>,
        chunks: Vec<Chunk>,
    ) -> ChunkingRecommendation {
        ChunkingRecommendation {
            strategy,
            rationale,
            degradations,
            transitions: Vec::new(),
            chunks,
            chunking_required: self.total_tokens > self.budget,
            budget_tokens: self.budget,
            total_tokens: self.total_tokens,
        }
    }

    /// First chunk over the limit that a lower state could still split
    pub(crate) fn oversized(&self, chunks: &[Chunk]) -> Option<usize> {
        chunks
            .iter()
            .filter(|c| self.oversized_line(c).is_none())
            .map(|c| c.estimated_tokens)
            .find(|&tokens| tokens > self.limit)
    }

    /// A chunk over the limit holding a single line, which no state can split
    fn oversized_line<'c>(&self, chunk: &'c Chunk) -> Option<&'c Segment> {
        match chunk.segments.as_slice() {
            [segment]
                if chunk.estimated_tokens > self.limit
                    && segment.start_line == segment.end_line
                    && matches!(segment.kind, SegmentKind::Lines | SegmentKind::WholeFile) =>
            {
                Some(segment)
            }
            _ => None,
        }
    }

    /// Record each oversized line on its file's degradation note
    fn note_oversized_lines(&self, chunks: &[Chunk], notes: &mut Vec<DegradationNote>) {
        for segment in chunks.iter().filter_map(|c| self.oversized_line(c)) {
            let detail = format!(
                "line {} of {} tokens kept whole over the budget of {}",
                segment.start_line, segment.tokens, self.budget
            );
            warn!("{}: {detail}", segment.path);
            match notes.iter_mut().find(|n| n.path == segment.path) {
                Some(note) => {
                    note.reason.push_str("; ");
                    note.reason.push_str(&detail);
                }
                None => notes.push(DegradationNote {
                    path: segment.path.clone(),
                    reason: detail,
                }),
            }
        }
    }
}

/// Outcome of one ladder state
#[derive(Debug)]
pub(crate) enum Step {
    Done(ChunkingRecommendation),
    Degrade { next: LadderState, reason: String },
}

fn degrade(next: LadderState, reason: impl Into<String>) -> Result<Step> {
    Ok(Step::Degrade {
        next,
        reason: reason.into(),
    })
}

fn after(reason: Option<&str>) -> String {
    reason.map_or_else(String::new, |r| format!(" after: {r}"))
}

/// Declarations kept whole: every unit of each file laid out as units.
pub(crate) fn semantic(input: &LadderInput<'_>, _reason: Option<&str>) -> Result<Step> {
    if !input.config.semantic {
        return degrade(LadderState::LineBased, "semantic chunking disabled");
    }
    if !input.results.iter().any(|r| r.structural) {
        return degrade(LadderState::LineBased, "no structurally analyzable file");
    }

    let mut atoms: Vec<Atom> = Vec::new();
    let mut degradations = Vec::new();
    let mut protected: Vec<Vec<(usize, usize)>> = vec![Vec::new(); input.units.len()];

    for (index, (unit, result)) in input.units.iter().zip(&input.results).enumerate() {
        let lines = &input.lines[index];
        let cut = if result.structural {
            atoms::cut_units(index, &unit.content, result, lines, input.counter)
        } else {
            None
        };

        let why = match (cut, result.fallback) {
            (Some(units), _) if units.iter().all(|u| u.tokens <= input.target) => {
                protected[index] = result
                    .declarations
                    .iter()
                    .map(|d| (d.start_byte, d.end_byte))
                    .collect();
                debug!("{}: {} units", unit.path, units.len());
                atoms.extend(units);
                continue;
            }
            (Some(_), _) => "declaration larger than the budget".to_string(),
            (None, Some(reason)) => reason.to_string(),
            (None, None) if result.structural => "analysis does not match content".to_string(),
            (None, None) => "not structural".to_string(),
        };

        let whole = atoms::whole_file(index, &unit.content, lines, input.counter);
        let (fallback, how) = if whole.tokens <= input.target {
            (vec![whole], "whole file")
        } else {
            let windows = atoms::line_windows(
                index,
                &unit.content,
                lines,
                input.config.line_window,
                input.target,
                input.counter,
            );
            (windows, "line windows")
        };
        debug!("{}: {why}, chunked as {how}", unit.path);
        degradations.push(DegradationNote {
            path: unit.path.clone(),
            reason: format!("{why}; chunked as {how}"),
        });
        atoms.extend(fallback);
    }

    atoms.sort_by_key(Atom::position);
    let unit_atoms: Vec<&Atom> = atoms
        .iter()
        .filter(|a| matches!(a.kind, AtomKind::Unit(_)))
        .collect();
    let strategy_input = StrategyInput {
        kind: input.kind,
        units: &unit_atoms,
        budget: input.budget,
        config: input.config,
    };

    // candidates tie on applicability; fewest chunks wins, then table order
    let mut best: Option<(&strategy::StrategyRule, Vec<Chunk>)> = None;
    for rule in strategy::candidates(&strategy_input) {
        let bins = packing::bins_for(rule.strategy, &atoms, input.target);
        let chunks = packing::build_chunks(rule.strategy, &atoms, bins, input.units);
        debug!("{} candidate: {} chunks", rule.strategy, chunks.len());
        if best
            .as_ref()
            .map_or(true, |(_, current)| chunks.len() < current.len())
        {
            best = Some((rule, chunks));
        }
    }
    let Some((rule, chunks)) = best else {
        return degrade(LadderState::LineBased, "no applicable strategy");
    };

    if let Err(defect) = verify_coverage(&chunks, &input.lengths(), &protected) {
        return degrade(LadderState::LineBased, format!("coverage check failed: {defect}"));
    }
    if let Some(tokens) = input.oversized(&chunks) {
        return degrade(
            LadderState::LineBased,
            format!("chunk of {tokens} tokens exceeds budget of {}", input.budget),
        );
    }

    let rationale = format!(
        "{}: {}; {} units from {} files in {} chunks (target {} tokens)",
        rule.strategy,
        rule.description,
        unit_atoms.len(),
        input.units.len() - degradations.len(),
        chunks.len(),
        input.target
    );
    input.note_oversized_lines(&chunks, &mut degradations);
    Ok(Step::Done(input.recommendation(
        rule.strategy,
        rationale,
        degradations,
        chunks,
    )))
}

/// Every file in windows of whole lines, packed in order.
pub(crate) fn line_based(input: &LadderInput<'_>, reason: Option<&str>) -> Result<Step> {
    let atoms: Vec<Atom> = input
        .units
        .iter()
        .enumerate()
        .flat_map(|(index, unit)| {
            atoms::line_windows(
                index,
                &unit.content,
                &input.lines[index],
                input.config.line_window,
                input.target,
                input.counter,
            )
        })
        .collect();
    let bins = packing::bins_for(ChunkingStrategy::LineBased, &atoms, input.target);
    let chunks = packing::build_chunks(ChunkingStrategy::LineBased, &atoms, bins, input.units);

    if let Err(defect) = verify_coverage(&chunks, &input.lengths(), &[]) {
        return degrade(LadderState::WholeFile, format!("coverage check failed: {defect}"));
    }
    if let Some(tokens) = input.oversized(&chunks) {
        return degrade(
            LadderState::WholeFile,
            format!("line window of {tokens} tokens exceeds budget of {}", input.budget),
        );
    }

    let rationale = format!(
        "line-based: windows of up to {} lines packed in order into {} chunks{}",
        input.config.line_window,
        chunks.len(),
        after(reason)
    );
    let mut degradations = Vec::new();
    input.note_oversized_lines(&chunks, &mut degradations);
    Ok(Step::Done(input.recommendation(
        ChunkingStrategy::LineBased,
        rationale,
        degradations,
        chunks,
    )))
}

/// One chunk per file.
pub(crate) fn whole_file(input: &LadderInput<'_>, reason: Option<&str>) -> Result<Step> {
    let atoms: Vec<Atom> = input
        .units
        .iter()
        .enumerate()
        .map(|(index, unit)| {
            atoms::whole_file(index, &unit.content, &input.lines[index], input.counter)
        })
        .collect();
    let bins = (0..atoms.len()).map(|i| vec![i]).collect();
    let chunks = packing::build_chunks(ChunkingStrategy::SingleFile, &atoms, bins, input.units);

    if let Err(defect) = verify_coverage(&chunks, &input.lengths(), &[]) {
        return degrade(
            LadderState::EmergencySingleChunk,
            format!("coverage check failed: {defect}"),
        );
    }

    let rationale = format!("single-file: one chunk per file{}", after(reason));
    Ok(Step::Done(input.recommendation(
        ChunkingStrategy::SingleFile,
        rationale,
        Vec::new(),
        chunks,
    )))
}

/// Everything in one chunk; also the answer for an empty input.
pub(crate) fn emergency(input: &LadderInput<'_>, reason: Option<&str>) -> Result<Step> {
    let atoms: Vec<Atom> = input
        .units
        .iter()
        .enumerate()
        .map(|(index, unit)| {
            atoms::whole_file(index, &unit.content, &input.lines[index], input.counter)
        })
        .collect();
    let bins = if atoms.is_empty() {
        Vec::new()
    } else {
        vec![(0..atoms.len()).collect()]
    };
    let mut chunks =
        packing::build_chunks(ChunkingStrategy::EmergencySingleChunk, &atoms, bins, input.units);
    for chunk in &mut chunks {
        chunk.strategy = ChunkingStrategy::EmergencySingleChunk;
    }

    verify_coverage(&chunks, &input.lengths(), &[])
        .map_err(|defect| ChunkerError::invariant(format!("emergency plan: {defect}")))?;

    let rationale = if input.units.is_empty() {
        "emergency-single-chunk: no input".to_string()
    } else {
        format!(
            "emergency-single-chunk: all {} files in one chunk{}",
            input.units.len(),
            after(reason)
        )
    };
    Ok(Step::Done(input.recommendation(
        ChunkingStrategy::EmergencySingleChunk,
        rationale,
        Vec::new(),
        chunks,
    )))
}

pub(crate) fn step(
    state: LadderState,
    input: &LadderInput<'_>,
    reason: Option<&str>,
) -> Result<Step> {
    match state {
        LadderState::Semantic => semantic(input, reason),
        LadderState::LineBased => line_based(input, reason),
        LadderState::WholeFile => whole_file(input, reason),
        LadderState::EmergencySingleChunk => emergency(input, reason),
    }
}

/// Walk the ladder from `start` until a state accepts a plan.
pub(crate) fn run(input: &LadderInput<'_>, start: LadderState) -> Result<ChunkingRecommendation> {
    let mut state = start;
    let mut reason: Option<String> = None;
    let mut transitions = Vec::new();

    loop {
        match step(state, input, reason.as_deref())? {
            Step::Done(mut recommendation) => {
                recommendation.transitions = transitions;
                return Ok(recommendation);
            }
            Step::Degrade { next, reason: why } => {
                if next <= state {
                    return Err(ChunkerError::invariant(format!(
                        "ladder cannot move from {state} to {next}"
                    )));
                }
                warn!("Chunk planning degraded from {state} to {next}: {why}");
                transitions.push(Transition {
                    from: state,
                    to: next,
                    reason: why.clone(),
                });
                state = next;
                reason = Some(why);
            }
        }
    }
}
