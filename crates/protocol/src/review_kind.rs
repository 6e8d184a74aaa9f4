use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Kind of review requested by the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewKind {
    QuickFixes,
    Architectural,
    Security,
    Performance,
    UnusedCode,
    BestPractices,
    Evaluation,
    ExtractPatterns,
    Comprehensive,
}

/// What a review kind pays most attention to. Drives chunk strategy selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ReviewFocus {
    /// Type hierarchies, module boundaries, class/method grouping
    Architecture,
    /// Call context and data flowing between declarations
    DataFlow,
    /// Hot paths and code that calls each other within a file
    Performance,
}

impl ReviewKind {
    pub const ALL: [ReviewKind; 9] = [
        ReviewKind::QuickFixes,
        ReviewKind::Architectural,
        ReviewKind::Security,
        ReviewKind::Performance,
        ReviewKind::UnusedCode,
        ReviewKind::BestPractices,
        ReviewKind::Evaluation,
        ReviewKind::ExtractPatterns,
        ReviewKind::Comprehensive,
    ];

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::QuickFixes => "quick-fixes",
            Self::Architectural => "architectural",
            Self::Security => "security",
            Self::Performance => "performance",
            Self::UnusedCode => "unused-code",
            Self::BestPractices => "best-practices",
            Self::Evaluation => "evaluation",
            Self::ExtractPatterns => "extract-patterns",
            Self::Comprehensive => "comprehensive",
        }
    }

    /// Focus areas of this review kind. An empty slice means a general review.
    #[must_use]
    pub const fn focus(self) -> &'static [ReviewFocus] {
        match self {
            Self::Architectural | Self::ExtractPatterns => &[ReviewFocus::Architecture],
            Self::Security | Self::UnusedCode => &[ReviewFocus::DataFlow],
            Self::Performance => &[ReviewFocus::Performance],
            Self::BestPractices => &[ReviewFocus::Architecture, ReviewFocus::Performance],
            Self::Comprehensive => &[ReviewFocus::Architecture, ReviewFocus::DataFlow],
            Self::QuickFixes | Self::Evaluation => &[],
        }
    }

    #[must_use]
    pub fn favors(self, focus: ReviewFocus) -> bool {
        self.focus().contains(&focus)
    }
}

impl fmt::Display for ReviewKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown review kind: {0}")]
pub struct UnknownReviewKind(pub String);

impl FromStr for ReviewKind {
    type Err = UnknownReviewKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('_', "-");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| UnknownReviewKind(s.to_string()))
    }
}
