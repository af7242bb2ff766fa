use thiserror::Error;

use ledgerforge_client::ClientError;

/// Errors emitted by the generation engine.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// A required parent entity is missing and no fallback is registered.
    #[error("missing dependency: {0}")]
    MissingDependency(String),
    /// The circuit breaker rejected the call without invoking the remote API.
    #[error("circuit open for {operation}")]
    CircuitOpen { operation: String },
    /// A conflicting entity exists but could not be retrieved.
    #[error("conflict could not be resolved for {0}")]
    ConflictUnresolved(String),
    /// Remote API failure.
    #[error("remote api: {0}")]
    Client(#[from] ClientError),
    /// A payload failed a fatal validation check.
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl GenerationError {
    /// Whether the underlying remote failure is an already-exists conflict.
    pub fn is_conflict(&self) -> bool {
        matches!(self, GenerationError::Client(err) if err.is_conflict())
    }

    /// Circuit-open rejections are surfaced distinctly so callers can tell
    /// "remote is down" apart from "this one operation failed".
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, GenerationError::CircuitOpen { .. })
    }
}

impl From<ledgerforge_core::Error> for GenerationError {
    fn from(err: ledgerforge_core::Error) -> Self {
        match err {
            ledgerforge_core::Error::InvalidConfig(msg) => GenerationError::InvalidConfig(msg),
            ledgerforge_core::Error::Validation(msg) => GenerationError::Validation(msg),
            ledgerforge_core::Error::Other(msg) => GenerationError::Validation(msg),
        }
    }
}
