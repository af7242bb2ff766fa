use thiserror::Error;

/// Core error type shared across Ledgerforge crates.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid generator configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    /// A payload violates a declarative validation rule.
    #[error("validation failed: {0}")]
    Validation(String),
    /// Catch-all error for unexpected failures.
    #[error("other error: {0}")]
    Other(String),
}

/// Convenience alias for results returned by Ledgerforge crates.
pub type Result<T> = std::result::Result<T, Error>;
