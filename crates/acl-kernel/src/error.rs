//! Error types for the ACL Kernel.

use acl_kernel_bus::BusError;
use acl_kernel_core::ValidationError;
use acl_kernel_eval::{EvalError, GroupIndexError};
use acl_kernel_store::StoreError;
use thiserror::Error;

/// Errors that can occur during ACL Kernel operations.
///
/// Permission checks never return these; they fail closed instead. The
/// outcome of an accepted mutation is an
/// [`AckStatus`](acl_kernel_bus::AckStatus), not an error.
#[derive(Debug, Error)]
pub enum AuthError {
    /// The name or id does not resolve to a known principal.
    #[error("unknown principal: {0}")]
    UnknownPrincipal(String),

    /// The caller lacks the management permission for this operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Validation error.
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Storage error.
    #[error("storage error: {0}")]
    Store(#[from] StoreError),

    /// Mutation bus error.
    #[error("bus error: {0}")]
    Bus(#[from] BusError),

    /// Evaluation setup error.
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),

    /// The Group Index could not be read.
    #[error("group index error: {0}")]
    GroupIndex(#[from] GroupIndexError),

    /// Invalid configuration.
    #[error("configuration error: {0}")]
    Config(String),
}

/// Result type for ACL Kernel operations.
pub type Result<T> = std::result::Result<T, AuthError>;
