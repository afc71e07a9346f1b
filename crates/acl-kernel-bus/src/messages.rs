//! Mutation bus message types.
//!
//! Every request travels as a `kind` string plus a JSON body. The kind
//! selects the handler; the handler decodes the body into its own request
//! type. Acks carry the request's correlation id and kind back.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use acl_kernel_core::{Dump, Grant, GrantId, Id, Identity};
use acl_kernel_eval::Permitted;

use crate::error::{BusError, Result};

/// Kind string for grant requests.
pub const KIND_GRANT: &str = "grant";
/// Kind string for identity requests.
pub const KIND_IDENTITY: &str = "identity";
/// Kind string for dump requests.
pub const KIND_DUMP: &str = "dump";

/// Identifies one request and its ack.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(pub Uuid);

impl CorrelationId {
    /// A fresh random correlation id.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CorrelationId({})", self.0)
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A request as carried by the bus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationRequest {
    /// Selects the handler.
    pub kind: String,
    /// Handler-specific payload.
    pub body: serde_json::Value,
}

impl MutationRequest {
    /// A request with an arbitrary kind and body.
    pub fn new(kind: impl Into<String>, body: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            body,
        }
    }

    fn encode<T: Serialize>(kind: &str, body: &T) -> Result<Self> {
        let body = serde_json::to_value(body).map_err(|e| BusError::Encode(e.to_string()))?;
        Ok(Self::new(kind, body))
    }

    pub fn grant(request: &GrantRequest) -> Result<Self> {
        Self::encode(KIND_GRANT, request)
    }

    pub fn identity(request: &IdentityRequest) -> Result<Self> {
        Self::encode(KIND_IDENTITY, request)
    }

    pub fn dump(request: &DumpRequest) -> Result<Self> {
        Self::encode(KIND_DUMP, request)
    }
}

/// A grant mutation.
///
/// `permitted` is the set of permissions the caller holds `WriteAcl` for.
/// Every permission the request touches, old and new, must be in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum GrantRequest {
    /// Add a grant.
    Create { grant: Grant, permitted: Permitted },
    /// Replace the tuple held by a grant id.
    Update {
        id: GrantId,
        grant: Grant,
        permitted: Permitted,
    },
    /// Remove a grant by id.
    Remove { id: GrantId, permitted: Permitted },
    /// Remove a grant by tuple. Removing an absent grant succeeds.
    Delete { grant: Grant, permitted: Permitted },
}

/// An identity mutation.
///
/// `permitted` is the set of principals the caller holds `WriteIdentity`
/// for. The principal the request touches must be in it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum IdentityRequest {
    Put {
        identity: Identity,
        permitted: Permitted,
    },
    Delete {
        principal: Id,
        kind: String,
        permitted: Permitted,
    },
}

/// A bulk import.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpRequest {
    pub dump: Dump,
    /// Permissions the caller holds `WriteAcl` for.
    pub acl: Permitted,
    /// Principals the caller holds `WriteIdentity` for.
    pub identity: Permitted,
}

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rejection {
    Forbidden,
    Invalid,
    Conflict,
    NotFound,
}

/// Outcome of a mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AckStatus {
    /// Something new was created.
    Created,
    /// The requested state already held.
    AlreadyTrue,
    /// An existing entry was changed or removed.
    Applied,
    /// The request was refused and nothing changed.
    Rejected(Rejection),
    /// The request could not be processed.
    ServerError,
}

impl AckStatus {
    /// Whether the requested state now holds.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            AckStatus::Created | AckStatus::AlreadyTrue | AckStatus::Applied
        )
    }

    /// The HTTP status an API layer would answer with.
    pub fn http_status(&self) -> u16 {
        match self {
            AckStatus::Created => 201,
            AckStatus::AlreadyTrue => 200,
            AckStatus::Applied => 204,
            AckStatus::Rejected(Rejection::Invalid) => 400,
            AckStatus::Rejected(Rejection::Forbidden) => 403,
            AckStatus::Rejected(Rejection::NotFound) => 404,
            AckStatus::Rejected(Rejection::Conflict) => 409,
            AckStatus::ServerError => 500,
        }
    }
}

/// Acknowledgement of one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ack {
    /// The request this answers.
    pub correlation: CorrelationId,
    /// The request's kind, echoed.
    pub kind: String,
    pub status: AckStatus,
    /// The grant created or touched, for grant requests.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grant: Option<GrantId>,
}
