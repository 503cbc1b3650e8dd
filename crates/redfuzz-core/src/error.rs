// Error types for the fuzzing engine

use thiserror::Error;

/// Result type alias for fuzzing operations
pub type Result<T> = std::result::Result<T, FuzzError>;

/// Errors that can occur during a fuzzing run
#[derive(Debug, Error)]
pub enum FuzzError {
    /// A resource key was leased without being registered first.
    /// Raised eagerly, before any wait is entered.
    #[error("no handles registered for resource key: {0}")]
    ResourceNotFound(String),

    /// Strategy failure while performing an attempt.
    /// Non-fatal to the run; the attempt is requeued.
    #[error("attempt execution error: {0}")]
    AttemptExecution(String),

    /// A scorer failed while classifying an output.
    /// Isolated per scorer; other verdicts are unaffected.
    #[error("classification error: {0}")]
    Classification(String),

    /// Refinement of a successful attempt failed.
    /// Fatal only to the refinement sub-step.
    #[error("refinement error: {0}")]
    Refinement(String),

    /// Checkpoint storage failure. Fatal to the run, since
    /// durability of completed work is compromised.
    #[error("checkpoint I/O error: {0}")]
    CheckpointIo(#[from] std::io::Error),

    /// Provider-level failure (network, API error)
    #[error("provider error: {0}")]
    Provider(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Internal error
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl FuzzError {
    /// Create an attempt execution error
    pub fn attempt(msg: impl Into<String>) -> Self {
        FuzzError::AttemptExecution(msg.into())
    }

    /// Create a classification error
    pub fn classification(msg: impl Into<String>) -> Self {
        FuzzError::Classification(msg.into())
    }

    /// Create a refinement error
    pub fn refinement(msg: impl Into<String>) -> Self {
        FuzzError::Refinement(msg.into())
    }

    /// Create a provider error
    pub fn provider(msg: impl Into<String>) -> Self {
        FuzzError::Provider(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        FuzzError::Configuration(msg.into())
    }
}
