//! The Group Index contract.
//!
//! The Group Index is the external, read-only source of class membership,
//! group membership and ownership. This crate never writes to it; it only
//! reads and listens for change notifications.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::broadcast;

use acl_kernel_core::Id;

use crate::error::GroupIndexError;

/// A change reported by the Group Index.
///
/// Receivers treat every variant as "recompute derived views"; the payload
/// is informational.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GroupChange {
    /// The membership of a group or class changed.
    Membership { group: Id },
    /// The owner of an object changed.
    Ownership { object: Id },
    /// Everything may have changed.
    Reset,
}

/// Read-only query contract of the external Group Index.
#[async_trait]
pub trait GroupIndex: Send + Sync {
    /// Direct leaf members of a class.
    async fn members(&self, class: &Id) -> Result<BTreeSet<Id>, GroupIndexError>;

    /// For each given id, its transitive members.
    ///
    /// The id itself is not part of its own member set. Ids that are not
    /// groups map to an empty set or are left out of the result.
    async fn powerset(
        &self,
        ids: &BTreeSet<Id>,
    ) -> Result<BTreeMap<Id, BTreeSet<Id>>, GroupIndexError>;

    /// Every object's owner, excluding unowned objects.
    async fn owner_of_all(&self) -> Result<HashMap<Id, Id>, GroupIndexError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<GroupChange>;
}
