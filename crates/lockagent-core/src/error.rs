//! Shared error type for the lockagent workspace.

use thiserror::Error;

/// Convenience alias used across the workspace.
pub type LockagentResult<T> = Result<T, LockagentError>;

/// All failure modes surfaced by the agent engine and its providers.
#[derive(Debug, Error)]
pub enum LockagentError {
    /// Empty or malformed caller-supplied value (path, id, socket address).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// No matching block device or device config directory.
    #[error("not found: {0}")]
    NotFound(String),

    /// Decode failure, unknown discriminator, or missing required field.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Provider kind is recognized but its backend is not built yet.
    #[error("provider not implemented: {0}")]
    Unimplemented(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// Transport-level failure while talking to a remote provider.
    #[error("network failure: {0}")]
    Network(String),

    /// Terminal HTTP status other than 200.
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),

    #[error("timed out: {0}")]
    Timeout(String),

    #[error("operation cancelled")]
    Cancelled,
}
