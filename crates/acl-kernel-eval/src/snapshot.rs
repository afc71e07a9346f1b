//! Immutable views of the Group Index.
//!
//! A [`GroupSnapshot`] holds everything the evaluation engine needs from the
//! Group Index for one grant list: the leaf Principal and Permission
//! classes, the member sets of every group a grant refers to, and the
//! ownership relation inverted to owner -> objects.

use std::collections::{BTreeSet, HashMap};

use acl_kernel_core::{Class, Grant, Id, Special};

use crate::error::GroupIndexError;
use crate::group::GroupIndex;

/// Group and ownership data captured at one point in time.
#[derive(Debug, Clone, Default)]
pub struct GroupSnapshot {
    principals: BTreeSet<Id>,
    permissions: BTreeSet<Id>,
    powersets: HashMap<Id, BTreeSet<Id>>,
    owned: HashMap<Id, BTreeSet<Id>>,
}

impl GroupSnapshot {
    /// Create an empty snapshot. Every principal is unknown.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fetch a snapshot covering the groups referenced by `grants`.
    pub async fn fetch<'a, I>(index: &dyn GroupIndex, grants: I) -> Result<Self, GroupIndexError>
    where
        I: IntoIterator<Item = &'a Grant>,
    {
        let principals = index.members(&Class::PRINCIPAL).await?;
        let permissions = index.members(&Class::PERMISSION).await?;

        let groups = referenced_groups(grants, &principals, &permissions);
        // Requested ids the index leaves out are empty groups.
        let mut powersets: HashMap<Id, BTreeSet<Id>> =
            groups.iter().map(|group| (*group, BTreeSet::new())).collect();
        powersets.extend(index.powerset(&groups).await?);

        let mut owned: HashMap<Id, BTreeSet<Id>> = HashMap::new();
        for (object, owner) in index.owner_of_all().await? {
            if owner == Special::UNOWNED {
                continue;
            }
            owned.entry(owner).or_default().insert(object);
        }

        tracing::debug!(
            principals = principals.len(),
            permissions = permissions.len(),
            groups = groups.len(),
            owners = owned.len(),
            "fetched group snapshot"
        );

        Ok(Self {
            principals,
            permissions,
            powersets,
            owned,
        })
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Builders (for tests and bootstrapping)
    // ─────────────────────────────────────────────────────────────────────────

    pub fn with_principal(mut self, principal: Id) -> Self {
        self.principals.insert(principal);
        self
    }

    pub fn with_permission(mut self, permission: Id) -> Self {
        self.permissions.insert(permission);
        self
    }

    pub fn with_members(mut self, group: Id, members: impl IntoIterator<Item = Id>) -> Self {
        self.powersets.entry(group).or_default().extend(members);
        self
    }

    pub fn with_owner(mut self, object: Id, owner: Id) -> Self {
        if owner != Special::UNOWNED {
            self.owned.entry(owner).or_default().insert(object);
        }
        self
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Whether `id` is a leaf member of the Principal class.
    pub fn is_principal(&self, id: &Id) -> bool {
        self.principals.contains(id)
    }

    /// Whether `id` is a leaf member of the Permission class.
    pub fn is_permission(&self, id: &Id) -> bool {
        self.permissions.contains(id)
    }

    /// Transitive members of a group. Unknown groups have no members.
    pub fn members_of(&self, group: &Id) -> impl Iterator<Item = &Id> + '_ {
        self.powersets.get(group).into_iter().flatten()
    }

    /// Whether `member` is a transitive member of `group`.
    pub fn is_member(&self, group: &Id, member: &Id) -> bool {
        self.powersets
            .get(group)
            .map_or(false, |members| members.contains(member))
    }

    /// Objects currently owned by `owner`.
    pub fn owned_by(&self, owner: &Id) -> impl Iterator<Item = &Id> + '_ {
        self.owned.get(owner).into_iter().flatten()
    }

    /// Whether the snapshot covers every group `grants` refer to.
    ///
    /// When this is false the grant list has gained a group since the
    /// snapshot was taken and it must be fetched again.
    pub fn covers<'a, I>(&self, grants: I) -> bool
    where
        I: IntoIterator<Item = &'a Grant>,
    {
        referenced_groups(grants, &self.principals, &self.permissions)
            .iter()
            .all(|group| self.powersets.contains_key(group))
    }
}

/// Ids whose member sets evaluation needs: grant principals that are not
/// leaf principals, grant permissions that are not leaf permissions, and
/// plural targets other than `Mine`.
fn referenced_groups<'a, I>(
    grants: I,
    principals: &BTreeSet<Id>,
    permissions: &BTreeSet<Id>,
) -> BTreeSet<Id>
where
    I: IntoIterator<Item = &'a Grant>,
{
    let mut groups = BTreeSet::new();
    for grant in grants {
        if !principals.contains(&grant.principal) {
            groups.insert(grant.principal);
        }
        if !permissions.contains(&grant.permission) {
            groups.insert(grant.permission);
        }
        if grant.plural && grant.target != Special::MINE {
            groups.insert(grant.target);
        }
    }
    groups
}
