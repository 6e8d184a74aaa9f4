//! # Review Protocol
//!
//! Interface types shared between the planning core and the collaborators around it
//! (CLI layer, execution driver, reporting). Nothing in here performs I/O.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod models;
mod review_kind;

pub use models::{ModelCatalog, ModelProfile, ProviderPrices};
pub use review_kind::{ReviewFocus, ReviewKind, UnknownReviewKind};

pub const PLAN_SCHEMA_VERSION: u32 = 1;

/// Why a piece of input was handled by a simpler path than requested.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, JsonSchema)]
pub struct DegradationNote {
    pub path: String,
    pub reason: String,
}
