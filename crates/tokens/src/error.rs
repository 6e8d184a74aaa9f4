use thiserror::Error;

/// Result type for token estimation
pub type Result<T> = std::result::Result<T, TokenError>;

/// Errors raised while configuring token estimation
#[derive(Error, Debug)]
pub enum TokenError {
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Model family name is empty
    #[error("Model family must not be empty")]
    EmptyFamily,
}

impl TokenError {
    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
