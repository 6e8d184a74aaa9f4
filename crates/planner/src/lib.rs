//! # Review Planner
//!
//! Plans a multi-pass code review: how many model invocations a body of code needs, which
//! chunks go into each, and what the run will cost.
//!
//! ## Architecture
//!
//! ```text
//! SourceUnit[] + ReviewKind + ModelProfile
//!     │
//!     ├──> analyze_all (parallel, optional AnalysisCache)
//!     │
//!     ├──> ChunkPlanner (budget = configured, or first pass's nominal budget)
//!     │
//!     ├──> PassPlanner
//!     │    ├─> reserve = max(carryover fraction, safety margin)
//!     │    ├─> carried summary grows with the pass index
//!     │    └─> next-fit in chunk order, oversized chunks alone
//!     │
//!     └──> CostEstimator (input × price_in + output × price_out)
//! ```
//!
//! Configuration comes from [`PlannerConfig`], loadable from TOML with every field
//! optional.

mod config;
mod cost;
mod error;
mod passes;
mod review;

pub use config::{PassConfig, PlannerConfig};
pub use cost::{CostEstimator, CostReport, PassCost};
pub use error::{PlannerError, Result};
pub use passes::{Pass, PassPlan, PassPlanner};
pub use review::{FileSummary, ReviewPlan, ReviewPlanner};
