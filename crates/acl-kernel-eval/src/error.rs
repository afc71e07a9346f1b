//! Error types for the evaluation module.

use thiserror::Error;

/// Errors reported by a Group Index.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GroupIndexError {
    /// The index could not answer right now.
    #[error("group index unavailable: {0}")]
    Unavailable(String),

    /// The index has shut down and will not answer again.
    #[error("group index closed")]
    Closed,
}

/// Errors that can occur while building evaluation inputs.
#[derive(Debug, Error)]
pub enum EvalError {
    /// The Group Index failed.
    #[error("group index error: {0}")]
    GroupIndex(#[from] GroupIndexError),

    /// A bootstrap ACL line could not be parsed.
    #[error("bootstrap ACL line {line}: {reason}")]
    InvalidBootstrap { line: usize, reason: String },
}

/// Result type for evaluation operations.
pub type Result<T> = std::result::Result<T, EvalError>;
