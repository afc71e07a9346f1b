//! Error types for the ACL Kernel Core.

use thiserror::Error;

use crate::types::Id;

/// Core errors that can occur while decoding or encoding data.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid identifier: {0}")]
    InvalidId(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

/// Validation errors for grants, identities and dumps.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("grant principal must not be a reserved identifier: {0}")]
    ReservedPrincipal(Id),

    #[error("grant permission must not be a reserved identifier: {0}")]
    ReservedPermission(Id),

    #[error("target {0} cannot be used with plural = {1}")]
    InvalidPluralTarget(Id, bool),

    #[error("identity kind must not be empty")]
    EmptyIdentityKind,

    #[error("identity name must not be empty")]
    EmptyIdentityName,

    #[error("identity kind {0:?} is reserved")]
    ReservedIdentityKind(String),

    #[error("unsupported dump version: {0}")]
    UnsupportedDumpVersion(u32),

    #[error("dump does not match schema: {0}")]
    Schema(String),

    #[error("dump entry {index}: {source}")]
    DumpEntry {
        index: usize,
        #[source]
        source: Box<ValidationError>,
    },

    #[error("dump maps {kind}:{name} to more than one principal")]
    DuplicateIdentity { kind: String, name: String },
}

impl From<CoreError> for ValidationError {
    fn from(e: CoreError) -> Self {
        match e {
            CoreError::InvalidId(msg)
            | CoreError::EncodingError(msg)
            | CoreError::DecodingError(msg) => ValidationError::Schema(msg),
        }
    }
}
