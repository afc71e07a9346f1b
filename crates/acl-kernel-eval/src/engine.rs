//! ACL evaluation.
//!
//! Turns the flat grant list plus a [`GroupSnapshot`] into the effective
//! `(permission, target)` list of one principal. Evaluation is pure: the
//! same principal, snapshot and grants always give the same result.

use serde::{Deserialize, Serialize};

use acl_kernel_core::{Grant, Id, Special};

use crate::snapshot::GroupSnapshot;

/// One entry of an effective ACL.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AclEntry {
    /// A leaf permission.
    pub permission: Id,
    /// A concrete target, or `Null` (the wildcard).
    pub target: Id,
}

impl AclEntry {
    pub fn new(permission: Id, target: Id) -> Self {
        Self { permission, target }
    }
}

/// The effective ACL of a principal.
///
/// Entries may repeat; callers only test membership.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectiveAcl {
    principal: Id,
    entries: Vec<AclEntry>,
}

impl EffectiveAcl {
    pub fn new(principal: Id, entries: Vec<AclEntry>) -> Self {
        Self { principal, entries }
    }

    /// The principal this ACL was computed for.
    pub fn principal(&self) -> Id {
        self.principal
    }

    pub fn entries(&self) -> &[AclEntry] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<AclEntry> {
        self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Targets granted for `permission`.
    pub fn targets<'a>(&'a self, permission: &'a Id) -> impl Iterator<Item = Id> + 'a {
        self.entries
            .iter()
            .filter(move |e| e.permission == *permission)
            .map(|e| e.target)
    }

    /// Keep only entries whose permission satisfies `keep`.
    pub fn retain_permissions(mut self, mut keep: impl FnMut(&Id) -> bool) -> Self {
        self.entries.retain(|e| keep(&e.permission));
        self
    }
}

/// Compute the effective ACL of `principal`.
///
/// Returns `None` when `principal` is not a leaf member of the Principal
/// class. That is distinct from `Some` of an empty ACL.
pub fn effective_acl<'a, I>(principal: Id, snapshot: &GroupSnapshot, grants: I) -> Option<EffectiveAcl>
where
    I: IntoIterator<Item = &'a Grant>,
{
    if !snapshot.is_principal(&principal) {
        tracing::debug!(%principal, "not a known principal");
        return None;
    }

    let accepts = |candidate: &Id| *candidate == principal || snapshot.is_member(candidate, &principal);

    let mut entries = Vec::new();
    for grant in grants.into_iter().filter(|g| accepts(&g.principal)) {
        let permissions: Vec<Id> = if snapshot.is_permission(&grant.permission) {
            vec![grant.permission]
        } else {
            snapshot
                .members_of(&grant.permission)
                .filter(|p| snapshot.is_permission(p))
                .copied()
                .collect()
        };
        if permissions.is_empty() {
            continue;
        }

        let targets: Vec<Id> = if !grant.plural {
            vec![grant.target]
        } else if grant.target == Special::MINE {
            snapshot.owned_by(&principal).copied().collect()
        } else {
            snapshot.members_of(&grant.target).copied().collect()
        };

        for permission in &permissions {
            for target in &targets {
                let target = if *target == Special::SELF {
                    principal
                } else {
                    *target
                };
                entries.push(AclEntry::new(*permission, target));
            }
        }
    }

    tracing::debug!(%principal, entries = entries.len(), "computed effective ACL");
    Some(EffectiveAcl::new(principal, entries))
}

#[cfg(test)]
mod tests {
    use super::*;

    const P1: Id = Id::from_u128(1);
    const P2: Id = Id::from_u128(2);
    const PERM_A: Id = Id::from_u128(10);
    const PERM_B: Id = Id::from_u128(11);
    const PERM_GROUP: Id = Id::from_u128(12);
    const T1: Id = Id::from_u128(20);
    const T2: Id = Id::from_u128(21);
    const TARGET_GROUP: Id = Id::from_u128(22);
    const PRINCIPAL_GROUP: Id = Id::from_u128(30);

    fn snapshot() -> GroupSnapshot {
        GroupSnapshot::new()
            .with_principal(P1)
            .with_principal(P2)
            .with_permission(PERM_A)
            .with_permission(PERM_B)
    }

    fn has(acl: &EffectiveAcl, permission: Id, target: Id) -> bool {
        acl.entries().contains(&AclEntry::new(permission, target))
    }

    #[test]
    fn test_unknown_principal_has_no_acl() {
        let grants = [Grant::new(Id::from_u128(99), PERM_A, T1)];
        assert!(effective_acl(Id::from_u128(99), &snapshot(), &grants).is_none());
    }

    #[test]
    fn test_known_principal_without_grants_has_empty_acl() {
        let acl = effective_acl(P1, &snapshot(), &Vec::<Grant>::new()).unwrap();
        assert!(acl.is_empty());
    }

    #[test]
    fn test_direct_grant() {
        let grants = [Grant::new(P1, PERM_A, T1), Grant::new(P2, PERM_B, T2)];
        let acl = effective_acl(P1, &snapshot(), &grants).unwrap();
        assert_eq!(acl.entries(), &[AclEntry::new(PERM_A, T1)]);
    }

    #[test]
    fn test_principal_group_grant() {
        let snapshot = snapshot().with_members(PRINCIPAL_GROUP, [P1]);
        let grants = [Grant::new(PRINCIPAL_GROUP, PERM_A, T1)];

        assert!(has(&effective_acl(P1, &snapshot, &grants).unwrap(), PERM_A, T1));
        assert!(effective_acl(P2, &snapshot, &grants).unwrap().is_empty());
    }

    #[test]
    fn test_permission_group_expands_to_leaves() {
        let snapshot = snapshot().with_members(PERM_GROUP, [PERM_A, PERM_B, Id::from_u128(77)]);
        let grants = [Grant::new(P1, PERM_GROUP, T1)];

        let acl = effective_acl(P1, &snapshot, &grants).unwrap();
        assert!(has(&acl, PERM_A, T1));
        assert!(has(&acl, PERM_B, T1));
        assert!(!has(&acl, PERM_GROUP, T1));
        assert_eq!(acl.len(), 2);
    }

    #[test]
    fn test_empty_permission_group_yields_nothing() {
        let grants = [Grant::new(P1, PERM_GROUP, T1)];
        assert!(effective_acl(P1, &snapshot(), &grants).unwrap().is_empty());
    }

    #[test]
    fn test_plural_target_expands_over_members() {
        let snapshot = snapshot().with_members(TARGET_GROUP, [T1, T2]);
        let grants = [Grant::plural(P1, PERM_A, TARGET_GROUP)];

        let acl = effective_acl(P1, &snapshot, &grants).unwrap();
        assert!(has(&acl, PERM_A, T1));
        assert!(has(&acl, PERM_A, T2));
        assert!(!has(&acl, PERM_A, TARGET_GROUP));
    }

    #[test]
    fn test_mine_expands_to_owned_objects() {
        let snapshot = snapshot().with_owner(T1, P1).with_owner(T2, P2);
        let grants = [Grant::plural(P1, PERM_A, Special::MINE)];

        let acl = effective_acl(P1, &snapshot, &grants).unwrap();
        assert_eq!(acl.entries(), &[AclEntry::new(PERM_A, T1)]);
    }

    #[test]
    fn test_mine_is_per_evaluated_principal() {
        let snapshot = snapshot()
            .with_members(PRINCIPAL_GROUP, [P1, P2])
            .with_owner(T1, P1)
            .with_owner(T2, P2);
        let grants = [Grant::plural(PRINCIPAL_GROUP, PERM_A, Special::MINE)];

        let acl = effective_acl(P2, &snapshot, &grants).unwrap();
        assert_eq!(acl.entries(), &[AclEntry::new(PERM_A, T2)]);
    }

    #[test]
    fn test_self_substitution() {
        let snapshot = snapshot().with_members(PRINCIPAL_GROUP, [P1, P2]);
        let grants = [Grant::new(PRINCIPAL_GROUP, PERM_A, Special::SELF)];

        let acl = effective_acl(P2, &snapshot, &grants).unwrap();
        assert_eq!(acl.entries(), &[AclEntry::new(PERM_A, P2)]);
    }

    #[test]
    fn test_retain_permissions() {
        let grants = [Grant::new(P1, PERM_A, T1), Grant::new(P1, PERM_B, T1)];
        let acl = effective_acl(P1, &snapshot(), &grants)
            .unwrap()
            .retain_permissions(|p| *p == PERM_B);
        assert_eq!(acl.entries(), &[AclEntry::new(PERM_B, T1)]);
    }
}
