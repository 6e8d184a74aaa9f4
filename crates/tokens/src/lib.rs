//! # Review Tokens
//!
//! Token estimation shared by analysis, chunk planning and pass planning.
//!
//! ## Model
//!
//! ```text
//! TokenEstimator
//!     │
//!     ├──> registered Tokenizer per model family ("claude", "gpt", ...)
//!     │      └─> exact counts, no safety margin needed
//!     │
//!     └──> fallback CharRatioTokenizer (1 token per 4 chars, rounded up)
//!            └─> approximate counts, FALLBACK_SAFETY_MARGIN reserved downstream
//! ```
//!
//! Every tokenizer must be deterministic and monotonic: appending text never lowers
//! the count.
//!
//! ## Example
//!
//! ```rust
//! use review_tokens::TokenEstimator;
//!
//! let estimator = TokenEstimator::default();
//! assert_eq!(estimator.estimate_tokens("fn main() {}", "claude"), 3);
//!
//! let counter = estimator.counter("claude-3-opus");
//! assert!(!counter.is_exact());
//! ```

mod config;
mod counter;
mod error;
mod estimator;
mod output;
mod tokenizer;

pub use config::EstimatorConfig;
pub use counter::TokenCounter;
pub use error::{Result, TokenError};
pub use estimator::TokenEstimator;
pub use output::{estimate_output_tokens, output_multiplier, MIN_OUTPUT_TOKENS};
pub use tokenizer::{CharRatioTokenizer, Tokenizer};

/// Characters per token assumed when no tokenizer is registered for a family.
pub const FALLBACK_CHARS_PER_TOKEN: f64 = 4.0;

/// Worst-case fraction by which the fallback under-counts real tokenizers on source code.
///
/// Dense code (short identifiers, operators, non-ASCII) tokenizes at ~3.6 chars/token
/// on current BPE vocabularies, i.e. up to 10% more tokens than `chars / 4`.
pub const FALLBACK_SAFETY_MARGIN: f64 = 0.10;
