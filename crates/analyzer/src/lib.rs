//! # Review Analyzer
//!
//! Structural analysis of review input: every source unit becomes a declaration tree
//! (or an explicit reason why it could not).
//!
//! ## Architecture
//!
//! ```text
//! SourceUnit[]
//!     │
//!     ├──> AnalysisCache lookup (path, content hash, settings)
//!     │
//!     ├──> rayon pool, one StructuralAnalyzer per worker
//!     │    ├─> Language detection → grammar (Rust, Python, JS, TS, TSX)
//!     │    ├─> Tree-sitter parse; any error node → ParseFailure
//!     │    ├─> Depth-first walk → Declaration tree
//!     │    │    ├─> complexity (cyclomatic, cognitive, nesting)
//!     │    │    └─> references → dependencies (file names ∪ imports)
//!     │    └─> TokenCounter estimates per declaration and per file
//!     │
//!     └──> AnalysisResult[] (input order), misses stored back in the cache
//! ```
//!
//! ## Example
//!
//! ```rust
//! use review_analyzer::{AnalyzerConfig, SourceUnit, StructuralAnalyzer};
//! use review_tokens::TokenCounter;
//!
//! let mut analyzer =
//!     StructuralAnalyzer::new(AnalyzerConfig::default(), TokenCounter::default()).unwrap();
//!
//! let unit = SourceUnit::new("lib.rs", "pub fn add(a: u32, b: u32) -> u32 { a + b }\n");
//! let result = analyzer.analyze(&unit);
//!
//! assert!(result.structural);
//! assert_eq!(result.declarations[0].name, "add");
//! ```

mod analyzer;
mod batch;
mod cache;
mod complexity;
mod config;
mod error;
mod grammar;
mod language;
mod references;
mod types;

pub use analyzer::StructuralAnalyzer;
pub use batch::analyze_all;
pub use cache::{content_hash, AnalysisCache, CacheKey, DEFAULT_CACHE_CAPACITY};
pub use config::AnalyzerConfig;
pub use error::{AnalyzerError, Result};
pub use language::Language;
pub use types::{
    AnalysisResult, Complexity, Declaration, DeclarationIter, DeclarationKind, FallbackReason,
    Modifier, SourceUnit,
};
