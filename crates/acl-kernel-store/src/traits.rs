//! Store trait: the abstract interface for grant persistence.
//!
//! This trait allows the kernel to be storage-agnostic. Implementations
//! include SQLite (primary) and in-memory (for tests).

use std::collections::BTreeSet;

use async_trait::async_trait;
use acl_kernel_core::{Dump, Grant, GrantId, GrantPattern, Id, Identity, StoredGrant};

use crate::error::Result;

/// Result of inserting a grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertResult {
    /// Grant was inserted under a new id.
    Inserted(GrantId),
    /// An identical grant already exists (idempotent - not an error).
    AlreadyExists(GrantId),
    /// The same `(principal, permission, target)` exists with a different
    /// plural flag.
    Conflict {
        /// The id of the existing entry.
        existing: GrantId,
    },
}

/// Result of replacing a grant by id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateResult {
    /// The grant now holds the new tuple.
    Updated,
    /// No grant with that id.
    NotFound,
    /// Another grant already holds the new tuple's key.
    Conflict {
        /// The id of the other entry.
        existing: GrantId,
    },
}

/// Result of deleting a grant by tuple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteResult {
    /// The grant was removed.
    Deleted(GrantId),
    /// No such grant existed (idempotent - not an error).
    AlreadyAbsent,
}

/// Result of adding an identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityResult {
    /// The identity was added.
    Inserted,
    /// The exact identity already exists.
    AlreadyExists,
    /// The name belongs to another principal, or the principal already has
    /// a different name of this kind.
    Conflict,
}

/// Result of loading a dump.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpResult {
    /// The dump was applied in full.
    Applied {
        /// Grants inserted, changed or removed.
        grants_changed: usize,
        /// Identities added.
        identities_added: usize,
    },
    /// An identity clashed with an existing one. Nothing was applied.
    IdentityConflict { kind: String, name: String },
}

/// The GrantStore trait: async interface for grant and identity persistence.
///
/// All methods are async to support both sync (SQLite) and async backends.
/// For SQLite, we use `spawn_blocking` internally to avoid blocking the runtime.
///
/// # Design Notes
///
/// - **Idempotent inserts**: Inserting an identical grant returns `AlreadyExists`.
/// - **Deduplication key**: Grants are unique on `(principal, permission, target)`.
/// - **Idempotent deletes**: Deleting an absent grant returns `AlreadyAbsent`.
/// - **Atomic dumps**: `load_dump` applies everything or nothing.
#[async_trait]
pub trait GrantStore: Send + Sync {
    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Insert a grant.
    async fn insert_grant(&self, grant: &Grant) -> Result<InsertResult>;

    /// Get a grant by id.
    async fn get_grant(&self, id: &GrantId) -> Result<Option<StoredGrant>>;

    /// List every grant, ordered by `(principal, permission, target)`.
    async fn list_grants(&self) -> Result<Vec<StoredGrant>>;

    /// List grants matching a partial tuple.
    async fn find_grants(&self, pattern: &GrantPattern) -> Result<Vec<StoredGrant>>;

    /// Replace the tuple held by a grant id.
    async fn update_grant(&self, id: &GrantId, grant: &Grant) -> Result<UpdateResult>;

    /// Remove a grant by id, returning what was removed.
    async fn remove_grant(&self, id: &GrantId) -> Result<Option<StoredGrant>>;

    /// Delete the grant with the same `(principal, permission, target)`.
    async fn delete_grant(&self, grant: &Grant) -> Result<DeleteResult>;

    /// Every permission currently granted directly to any of `principals`.
    async fn permissions_granted_to(&self, principals: &[Id]) -> Result<BTreeSet<Id>>;

    // ─────────────────────────────────────────────────────────────────────────
    // Identity Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// List every identity.
    async fn list_identities(&self) -> Result<Vec<Identity>>;

    /// Add an identity.
    async fn put_identity(&self, identity: &Identity) -> Result<IdentityResult>;

    /// Delete the identity of a given kind. Returns whether one existed.
    async fn delete_identity(&self, principal: &Id, kind: &str) -> Result<bool>;

    // ─────────────────────────────────────────────────────────────────────────
    // Bulk Operations
    // ─────────────────────────────────────────────────────────────────────────

    /// Load a validated dump atomically.
    ///
    /// The grant set of every principal named by the dump's grants is
    /// replaced by the grants listed for it; identities are added, with
    /// identical ones ignored and clashing ones aborting the whole load.
    async fn load_dump(&self, dump: &Dump) -> Result<DumpResult>;
}
