//! Error types for the store module.

use thiserror::Error;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from SQLite.
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Migration error.
    #[error("migration error: {0}")]
    Migration(String),

    /// A lock guarding the store was poisoned by a panicking writer.
    #[error("store lock poisoned")]
    LockPoisoned,

    /// The blocking task running a query failed.
    #[error("blocking task failed: {0}")]
    TaskFailed(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
