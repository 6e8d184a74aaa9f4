use thiserror::Error;

/// Result type for chunk planning
pub type Result<T> = std::result::Result<T, ChunkerError>;

/// Errors that can occur during chunk planning.
///
/// Unparseable or oversized files are not errors; they degrade. Only broken inputs and
/// broken invariants are.
#[derive(Error, Debug)]
pub enum ChunkerError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Units and analysis results do not line up
    #[error("Input mismatch: {units} source units but {results} analysis results")]
    InputMismatch { units: usize, results: usize },

    /// Even the emergency plan does not cover the input exactly
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl ChunkerError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Create an invariant violation
    pub fn invariant(msg: impl Into<String>) -> Self {
        Self::InvariantViolation(msg.into())
    }
}
