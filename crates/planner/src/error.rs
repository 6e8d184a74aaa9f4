use review_analyzer::AnalyzerError;
use review_chunker::ChunkerError;
use review_tokens::TokenError;
use thiserror::Error;

/// Result type for review planning
pub type Result<T> = std::result::Result<T, PlannerError>;

/// Errors that can occur while planning a review
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Structural analysis failed to start
    #[error("Analysis error: {0}")]
    Analyzer(#[from] AnalyzerError),

    /// Token estimation misconfigured
    #[error("Token estimation error: {0}")]
    Tokens(#[from] TokenError),

    /// Chunk planning failed
    #[error("Chunking error: {0}")]
    Chunker(#[from] ChunkerError),

    /// A chunk was lost or duplicated between chunking and pass planning
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl PlannerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
