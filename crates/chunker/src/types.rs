use crate::stats::ChunkingStats;
use review_protocol::DegradationNote;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// How a recommendation (or a chunk) was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChunkingStrategy {
    /// One large or complex unit per chunk
    Individual,
    /// Bin packing of all units
    Grouped,
    /// One chunk per class/impl/trait/module
    Hierarchical,
    /// Units that reference each other within a file
    Functional,
    /// Units with their direct dependencies, across files
    Contextual,
    /// Fixed windows of lines
    LineBased,
    /// One chunk per file
    SingleFile,
    /// Everything in one chunk
    EmergencySingleChunk,
}

impl ChunkingStrategy {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Individual => "individual",
            Self::Grouped => "grouped",
            Self::Hierarchical => "hierarchical",
            Self::Functional => "functional",
            Self::Contextual => "contextual",
            Self::LineBased => "line-based",
            Self::SingleFile => "single-file",
            Self::EmergencySingleChunk => "emergency-single-chunk",
        }
    }

    /// Strategies that keep declarations intact
    #[must_use]
    pub const fn is_semantic(self) -> bool {
        matches!(
            self,
            Self::Individual
                | Self::Grouped
                | Self::Hierarchical
                | Self::Functional
                | Self::Contextual
        )
    }
}

impl fmt::Display for ChunkingStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a segment covers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum SegmentKind {
    /// The complete file
    WholeFile,
    /// A run of whole top-level declarations (with the text between them)
    Declarations { names: Vec<String> },
    /// A window of whole lines
    Lines,
}

/// A contiguous byte range of one input file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Position of the file in the planner input
    pub file_index: usize,

    pub path: String,

    pub start_byte: usize,

    /// Exclusive
    pub end_byte: usize,

    /// Start line (1-indexed)
    pub start_line: usize,

    /// End line (1-indexed, inclusive)
    pub end_line: usize,

    pub kind: SegmentKind,

    pub tokens: usize,
}

impl Segment {
    #[must_use]
    pub const fn byte_len(&self) -> usize {
        self.end_byte - self.start_byte
    }

    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Sort key: input file order, then byte offset
    #[must_use]
    pub const fn position(&self) -> (usize, usize) {
        (self.file_index, self.start_byte)
    }
}

/// Summary of what was merged into a chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Consolidation {
    /// Planning units (declarations, windows or files) in the chunk
    pub merged_units: usize,

    /// Distinct files touched
    pub files: usize,
}

/// An indivisible bundle of source sent to the model together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    pub strategy: ChunkingStrategy,

    /// Ordered by file, then byte offset
    pub segments: Vec<Segment>,

    pub estimated_tokens: usize,

    /// Rank in review order (0 first)
    pub priority: usize,

    pub consolidation: Option<Consolidation>,
}

impl Chunk {
    /// Position of the first segment
    #[must_use]
    pub fn position(&self) -> (usize, usize) {
        self.segments
            .first()
            .map_or((usize::MAX, usize::MAX), Segment::position)
    }

    /// Indices of the files touched
    #[must_use]
    pub fn files(&self) -> BTreeSet<usize> {
        self.segments.iter().map(|s| s.file_index).collect()
    }

    /// Distinct paths, in segment order
    #[must_use]
    pub fn paths(&self) -> Vec<&str> {
        let mut paths: Vec<&str> = Vec::new();
        for segment in &self.segments {
            if !paths.contains(&segment.path.as_str()) {
                paths.push(&segment.path);
            }
        }
        paths
    }

    /// Names of the declarations carried whole by this chunk
    #[must_use]
    pub fn declaration_names(&self) -> Vec<&str> {
        self.segments
            .iter()
            .filter_map(|s| match &s.kind {
                SegmentKind::Declarations { names } => Some(names),
                _ => None,
            })
            .flatten()
            .map(String::as_str)
            .collect()
    }
}

/// States of the degradation ladder, richest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LadderState {
    Semantic,
    LineBased,
    WholeFile,
    EmergencySingleChunk,
}

impl LadderState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Semantic => "semantic",
            Self::LineBased => "line-based",
            Self::WholeFile => "whole-file",
            Self::EmergencySingleChunk => "emergency-single-chunk",
        }
    }
}

impl fmt::Display for LadderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A step down the ladder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: LadderState,
    pub to: LadderState,
    pub reason: String,
}

/// Output of chunk planning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingRecommendation {
    pub strategy: ChunkingStrategy,

    /// Human-readable explanation of the choice
    pub rationale: String,

    /// Files handled by a simpler path than the chosen strategy
    pub degradations: Vec<DegradationNote>,

    /// Ladder steps taken before a plan was accepted
    pub transitions: Vec<Transition>,

    /// Ordered by first segment; `priority` equals the index
    pub chunks: Vec<Chunk>,

    /// Whether the input does not fit the budget as a whole
    pub chunking_required: bool,

    pub budget_tokens: usize,

    pub total_tokens: usize,
}

impl ChunkingRecommendation {
    #[must_use]
    pub fn chunk_count(&self) -> usize {
        self.chunks.len()
    }

    /// Whether the ladder left the semantic state
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        !self.transitions.is_empty()
    }

    /// Final ladder state
    #[must_use]
    pub fn final_state(&self) -> LadderState {
        self.transitions
            .last()
            .map_or(LadderState::Semantic, |t| t.to)
    }

    #[must_use]
    pub fn stats(&self) -> ChunkingStats {
        ChunkingStats::from_recommendation(self)
    }
}
