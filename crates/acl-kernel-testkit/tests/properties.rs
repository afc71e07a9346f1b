//! Evaluation properties over generated scenarios.

use proptest::prelude::*;

use acl_kernel::core::{Grant, Id, Special};
use acl_kernel::eval::{effective_acl, Permitted};
use acl_kernel_testkit::generators::{permissions, principals, scenario};

proptest! {
    #[test]
    fn unknown_principals_have_no_acl(s in scenario()) {
        let snapshot = s.snapshot();
        for unknown in [Id::from_u128(90), Id::from_u128(41), Id::from_u128(31)] {
            prop_assert!(effective_acl(unknown, &snapshot, &s.grants).is_none());
        }
    }

    #[test]
    fn known_principals_always_have_an_acl(s in scenario()) {
        let snapshot = s.snapshot();
        for principal in principals() {
            prop_assert!(effective_acl(principal, &snapshot, &s.grants).is_some());
        }
    }

    #[test]
    fn entries_carry_leaf_permissions_and_no_self(s in scenario()) {
        let snapshot = s.snapshot();
        let leaves = permissions();
        for principal in principals() {
            let acl = effective_acl(principal, &snapshot, &s.grants).unwrap();
            for entry in acl.entries() {
                prop_assert!(leaves.contains(&entry.permission));
                prop_assert_ne!(entry.target, Special::SELF);
                prop_assert_ne!(entry.target, Special::MINE);
            }
        }
    }

    #[test]
    fn direct_single_grants_are_honoured(s in scenario()) {
        let snapshot = s.snapshot();
        for grant in s.grants.iter().filter(|g| !g.plural) {
            if !principals().contains(&grant.principal) || !permissions().contains(&grant.permission) {
                continue;
            }
            let acl = effective_acl(grant.principal, &snapshot, &s.grants).unwrap();
            let expected = if grant.target == Special::SELF { grant.principal } else { grant.target };
            let permitted = Permitted::from_entries(acl.entries(), &grant.permission, false);
            prop_assert!(permitted.allows(&expected));
        }
    }

    #[test]
    fn plural_targets_are_group_members(s in scenario()) {
        let snapshot = s.snapshot();
        for principal in principals() {
            let plural_only: Vec<Grant> = s.grants.iter().filter(|g| g.plural).copied().collect();
            let acl = effective_acl(principal, &snapshot, &plural_only).unwrap();

            for entry in acl.entries() {
                let from_group = plural_only
                    .iter()
                    .filter(|g| g.target != Special::MINE)
                    .any(|g| s.target_members(&g.target).contains(&entry.target));
                let owned = s.owners.iter().any(|(object, owner)| *object == entry.target && *owner == principal);
                prop_assert!(from_group || owned);
            }
        }
    }

    #[test]
    fn adding_grants_never_removes_entries(s in scenario(), extra in 0usize..12) {
        let snapshot = s.snapshot();
        let cut = extra.min(s.grants.len());
        for principal in principals() {
            let fewer = effective_acl(principal, &snapshot, &s.grants[..cut]).unwrap();
            let more = effective_acl(principal, &snapshot, &s.grants).unwrap();
            for entry in fewer.entries() {
                prop_assert!(more.entries().contains(entry));
            }
        }
    }

    #[test]
    fn wildcard_only_widens_on_opt_in(s in scenario()) {
        let snapshot = s.snapshot();
        for principal in principals() {
            let acl = effective_acl(principal, &snapshot, &s.grants).unwrap();
            for permission in permissions() {
                prop_assert!(!Permitted::from_entries(acl.entries(), &permission, false).is_all());
                let widened = Permitted::from_entries(acl.entries(), &permission, true);
                let has_wildcard = acl.targets(&permission).any(|t| t == Special::WILDCARD);
                prop_assert_eq!(widened.is_all(), has_wildcard);
            }
        }
    }
}
