//! # Review Chunker
//!
//! Splits analyzed review input into chunks that fit a model's token budget.
//!
//! ## Guarantees
//!
//! - Every byte of every input file lands in exactly one chunk
//! - Top-level declarations are never split while the plan stays semantic
//! - The same input, review kind and budget always produce the same plan
//!
//! ## Architecture
//!
//! ```text
//! SourceUnit[] + AnalysisResult[]
//!     │
//!     ├──> Atoms
//!     │    ├─> structural file → one unit per top-level declaration
//!     │    └─> other files     → whole file, or line windows when too large
//!     │
//!     ├──> Strategy table (review focus > code shape > default)
//!     │    hierarchical │ contextual │ functional │ individual │ grouped
//!     │
//!     ├──> Packing (next-fit in order, or first-fit-decreasing)
//!     │
//!     └──> Degradation ladder, coverage verified at every state
//!          Semantic → LineBased → WholeFile → EmergencySingleChunk
//! ```
//!
//! ## Example
//!
//! ```rust
//! use review_analyzer::{AnalyzerConfig, SourceUnit, StructuralAnalyzer};
//! use review_chunker::{ChunkPlanner, ChunkerConfig};
//! use review_protocol::ReviewKind;
//! use review_tokens::TokenCounter;
//!
//! let counter = TokenCounter::default();
//! let units = vec![SourceUnit::new(
//!     "lib.rs",
//!     "pub fn parse(input: &str) -> usize {\n    input.len()\n}\n",
//! )];
//!
//! let mut analyzer = StructuralAnalyzer::new(AnalyzerConfig::default(), counter.clone()).unwrap();
//! let results: Vec<_> = units.iter().map(|u| analyzer.analyze(u)).collect();
//!
//! let planner = ChunkPlanner::new(ChunkerConfig::default(), counter).unwrap();
//! let plan = planner
//!     .plan(&units, &results, ReviewKind::QuickFixes, 100_000)
//!     .unwrap();
//!
//! assert_eq!(plan.chunk_count(), 1);
//! println!("{}", plan.stats());
//! ```

mod atoms;
mod config;
mod error;
mod graph;
mod ladder;
mod packing;
mod planner;
mod stats;
mod strategy;
mod types;
mod verify;

pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use planner::ChunkPlanner;
pub use stats::ChunkingStats;
pub use types::{
    Chunk, ChunkingRecommendation, ChunkingStrategy, Consolidation, LadderState, Segment,
    SegmentKind, Transition,
};
