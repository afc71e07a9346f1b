//! External identities of principals.
//!
//! An identity maps a `(kind, name)` pair, such as a Kerberos principal
//! name, onto an internal principal id.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Id;

/// The identity kind used when a caller gives a bare name.
pub const DEFAULT_IDENTITY_KIND: &str = "kerberos";

/// One external name of a principal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Identity {
    /// The principal this name belongs to.
    pub principal: Id,

    /// The naming scheme, e.g. `kerberos`.
    pub kind: String,

    /// The name within that scheme.
    pub name: String,
}

impl Identity {
    pub fn new(principal: Id, kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            principal,
            kind: kind.into(),
            name: name.into(),
        }
    }

    /// Shorthand for an identity of the default kind.
    pub fn kerberos(principal: Id, name: impl Into<String>) -> Self {
        Self::new(principal, DEFAULT_IDENTITY_KIND, name)
    }
}

/// How a caller names a principal.
///
/// Bare strings are names of the default kind; `uuid:<id>` names a
/// principal directly; `<kind>:<name>` selects another kind. Kerberos names
/// contain `@` but never `:`, so the forms do not overlap.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PrincipalRef {
    /// A principal id.
    Id(Id),

    /// An external name.
    Named { kind: String, name: String },
}

impl PrincipalRef {
    /// Parse the textual form described on the type.
    pub fn parse(s: &str) -> Self {
        match s.split_once(':') {
            Some(("uuid", rest)) => match Id::parse(rest) {
                Ok(id) => PrincipalRef::Id(id),
                Err(_) => PrincipalRef::Named {
                    kind: "uuid".into(),
                    name: rest.into(),
                },
            },
            Some((kind, name)) if !kind.is_empty() => PrincipalRef::Named {
                kind: kind.into(),
                name: name.into(),
            },
            _ => PrincipalRef::Named {
                kind: DEFAULT_IDENTITY_KIND.into(),
                name: s.into(),
            },
        }
    }

    /// A name of the default kind.
    pub fn kerberos(name: impl Into<String>) -> Self {
        PrincipalRef::Named {
            kind: DEFAULT_IDENTITY_KIND.into(),
            name: name.into(),
        }
    }
}

impl From<&str> for PrincipalRef {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for PrincipalRef {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Id> for PrincipalRef {
    fn from(id: Id) -> Self {
        PrincipalRef::Id(id)
    }
}

impl From<&Identity> for PrincipalRef {
    fn from(identity: &Identity) -> Self {
        PrincipalRef::Named {
            kind: identity.kind.clone(),
            name: identity.name.clone(),
        }
    }
}

impl fmt::Display for PrincipalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrincipalRef::Id(id) => write!(f, "uuid:{}", id),
            PrincipalRef::Named { kind, name } if kind == DEFAULT_IDENTITY_KIND => {
                write!(f, "{}", name)
            }
            PrincipalRef::Named { kind, name } => write!(f, "{}:{}", kind, name),
        }
    }
}
