//! Proptest generators for property-based testing.

use proptest::prelude::*;

use acl_kernel_core::{Grant, Id, Identity, Special};
use acl_kernel_eval::GroupSnapshot;

/// Generate a random Id.
pub fn id() -> impl Strategy<Value = Id> {
    any::<u128>().prop_map(Id::from_u128)
}

/// Generate a grant over random ids.
pub fn grant() -> impl Strategy<Value = Grant> {
    (id(), id(), id(), any::<bool>()).prop_map(|(principal, permission, target, plural)| {
        if plural {
            Grant::plural(principal, permission, target)
        } else {
            Grant::new(principal, permission, target)
        }
    })
}

/// Generate an identity with a short Kerberos-style name.
pub fn identity() -> impl Strategy<Value = Identity> {
    (id(), "[a-z]{1,8}@[A-Z]{1,6}").prop_map(|(principal, name)| Identity::kerberos(principal, name))
}

// ─────────────────────────────────────────────────────────────────────────────
// Scenarios
// ─────────────────────────────────────────────────────────────────────────────

/// A small, closed world of principals, permissions, groups and grants.
///
/// Ids come from fixed ranges so grants hit groups often:
///
/// | Range  | Role                   |
/// |--------|------------------------|
/// | 1..=4  | leaf principals        |
/// | 11..=13| leaf permissions       |
/// | 21..=23| target groups          |
/// | 31..=36| plain targets          |
/// | 41..=42| principal groups       |
/// | 51..=52| permission groups      |
/// | 61..=62| owned objects          |
#[derive(Debug, Clone)]
pub struct Scenario {
    pub target_groups: Vec<(Id, Vec<Id>)>,
    pub principal_groups: Vec<(Id, Vec<Id>)>,
    pub permission_groups: Vec<(Id, Vec<Id>)>,
    /// `(object, owner)`.
    pub owners: Vec<(Id, Id)>,
    pub grants: Vec<Grant>,
}

pub fn principals() -> Vec<Id> {
    (1..=4).map(Id::from_u128).collect()
}

pub fn permissions() -> Vec<Id> {
    (11..=13).map(Id::from_u128).collect()
}

fn pick(range: std::ops::RangeInclusive<u128>) -> impl Strategy<Value = Id> {
    range.prop_map(Id::from_u128)
}

fn members(range: std::ops::RangeInclusive<u128>) -> impl Strategy<Value = Vec<Id>> {
    prop::collection::vec(pick(range), 0..4)
}

/// Leaf principals, principal groups, and two ids the index does not know.
fn grant_principal() -> impl Strategy<Value = Id> {
    prop_oneof![pick(1..=4), pick(41..=42), pick(90..=91)]
}

fn grant_permission() -> impl Strategy<Value = Id> {
    prop_oneof![pick(11..=13), pick(51..=52)]
}

fn scenario_grant() -> impl Strategy<Value = Grant> {
    let single = prop_oneof![
        pick(31..=36),
        Just(Special::SELF),
        Just(Special::NULL),
    ];
    let group = prop_oneof![pick(21..=23), Just(Special::MINE)];

    prop_oneof![
        (grant_principal(), grant_permission(), single)
            .prop_map(|(p, perm, t)| Grant::new(p, perm, t)),
        (grant_principal(), grant_permission(), group)
            .prop_map(|(p, perm, g)| Grant::plural(p, perm, g)),
    ]
}

/// Generate a scenario.
pub fn scenario() -> impl Strategy<Value = Scenario> {
    (
        members(31..=36),
        members(31..=36),
        members(31..=36),
        members(1..=4),
        members(1..=4),
        members(11..=13),
        members(11..=13),
        prop::collection::vec(pick(1..=4), 2),
        prop::collection::vec(scenario_grant(), 0..12),
    )
        .prop_map(|(t1, t2, t3, pg1, pg2, mg1, mg2, owners, grants)| Scenario {
            target_groups: vec![
                (Id::from_u128(21), t1),
                (Id::from_u128(22), t2),
                (Id::from_u128(23), t3),
            ],
            principal_groups: vec![(Id::from_u128(41), pg1), (Id::from_u128(42), pg2)],
            permission_groups: vec![(Id::from_u128(51), mg1), (Id::from_u128(52), mg2)],
            owners: vec![
                (Id::from_u128(61), owners[0]),
                (Id::from_u128(62), owners[1]),
            ],
            grants,
        })
}

impl Scenario {
    /// The snapshot a Group Index holding this scenario would produce.
    pub fn snapshot(&self) -> GroupSnapshot {
        let mut snapshot = GroupSnapshot::new();
        for principal in principals() {
            snapshot = snapshot.with_principal(principal);
        }
        for permission in permissions() {
            snapshot = snapshot.with_permission(permission);
        }
        for (group, members) in self
            .target_groups
            .iter()
            .chain(&self.principal_groups)
            .chain(&self.permission_groups)
        {
            snapshot = snapshot.with_members(*group, members.iter().copied());
        }
        for (object, owner) in &self.owners {
            snapshot = snapshot.with_owner(*object, *owner);
        }
        snapshot
    }

    /// Members of a target group, or nothing for other ids.
    pub fn target_members(&self, group: &Id) -> &[Id] {
        self.target_groups
            .iter()
            .find(|(g, _)| g == group)
            .map(|(_, members)| members.as_slice())
            .unwrap_or(&[])
    }
}
