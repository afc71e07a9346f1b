//! # ACL Kernel Core
//!
//! The data model of the ACL Kernel: identifiers, grants, identities and
//! bulk import documents.
//!
//! This crate contains no I/O, no storage, no concurrency. It is pure data
//! plus the structural validation every other crate relies on.
//!
//! ## Key Types
//!
//! - [`Id`] - Opaque identifier shared by principals, permissions, targets and groups
//! - [`Grant`] - An access control entry `(principal, permission, target, plural)`
//! - [`Identity`] - An external name of a principal
//! - [`PrincipalRef`] - How callers name a principal
//! - [`Dump`] - A bulk import document
//!
//! ## Reserved Identifiers
//!
//! [`Special`] holds the placeholders the evaluation engine interprets
//! (`Self`, `Mine`, and `Null`, which doubles as the wildcard). [`Class`]
//! and [`Perm`] hold the well-known classes and management permissions.

pub mod dump;
pub mod error;
pub mod grant;
pub mod identity;
pub mod types;
pub mod validation;
pub mod wellknown;

pub use dump::{Dump, DUMP_VERSION};
pub use error::{CoreError, ValidationError};
pub use grant::{Grant, GrantPattern, StoredGrant};
pub use identity::{Identity, PrincipalRef, DEFAULT_IDENTITY_KIND};
pub use types::{GrantId, Id};
pub use validation::{validate_dump, validate_grant, validate_identity};
pub use wellknown::{Class, Perm, Special};
