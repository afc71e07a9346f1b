//! Reserved and well-known identifiers.
//!
//! Special identifiers are never ordinary objects. They are interpreted by
//! the evaluation engine or by callers.

use crate::types::Id;

/// Reserved target placeholders.
pub struct Special;

impl Special {
    /// "No specific target", used when checking a global permission.
    pub const NULL: Id = Id::from_u128(0);

    /// Any target. Only honoured when the caller opts into wildcards.
    ///
    /// This is the same id as [`Special::NULL`]: a grant on the null target
    /// is a grant on every target for callers that accept wildcards.
    pub const WILDCARD: Id = Self::NULL;

    /// Resolved at evaluation time to the evaluated principal.
    pub const SELF: Id = Id::from_u128(0x5855a1cc_46d8_4b16_84f8_ab3916ecb230);

    /// Resolved at evaluation time to the objects the principal owns.
    pub const MINE: Id = Id::from_u128(0x724c0316_4cfd_11f0_b355_0b70840faae8);

    /// Owner value marking an object as explicitly unowned.
    pub const UNOWNED: Id = Id::from_u128(0x091e796a_65c0_4080_adff_c3ce01a65b2e);

    /// All reserved identifiers.
    pub const ALL: [Id; 4] = [
        Self::NULL,
        Self::SELF,
        Self::MINE,
        Self::UNOWNED,
    ];

    /// Whether `id` is one of the reserved identifiers.
    pub fn is_special(id: &Id) -> bool {
        Self::ALL.contains(id)
    }
}

/// Well-known classes queried from the Group Index.
pub struct Class;

impl Class {
    /// Every recognised principal is a leaf member of this class.
    pub const PRINCIPAL: Id = Id::from_u128(0x11614546_b6d7_11ef_aebd_8fbb45451d7c);

    /// Every recognised leaf permission is a member of this class.
    pub const PERMISSION: Id = Id::from_u128(0x8ae784bb_c4b5_4995_9bf6_799b3c7f21ad);
}

/// Permissions that gate the management API of the kernel itself.
pub struct Perm;

impl Perm {
    /// Read grants and effective ACLs. Targets are permission ids.
    pub const READ_ACL: Id = Id::from_u128(0xba566181_0e8a_405b_b16e_3fb89130fbee);

    /// Create, change or delete grants. Targets are permission ids.
    pub const WRITE_ACL: Id = Id::from_u128(0x3a41f5ce_fc08_4669_9762_ec9e71061168);

    /// Read identities. Targets are principal ids.
    pub const READ_IDENTITY: Id = Id::from_u128(0xe8c9c0f7_0d54_4db2_b8d6_cd80c45f6a5c);

    /// Create or delete identities. Targets are principal ids.
    pub const WRITE_IDENTITY: Id = Id::from_u128(0x327c4cc8_9c46_4e1e_bb6b_257ace37b0f6);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_specials_are_distinct() {
        for (i, a) in Special::ALL.iter().enumerate() {
            for b in &Special::ALL[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_wildcard_is_null() {
        assert_eq!(Special::WILDCARD, Special::NULL);
        assert_eq!(Special::NULL.to_string(), "00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_management_permission_ids() {
        let ids = [
            (Perm::READ_ACL, "ba566181-0e8a-405b-b16e-3fb89130fbee"),
            (Perm::WRITE_ACL, "3a41f5ce-fc08-4669-9762-ec9e71061168"),
            (Perm::READ_IDENTITY, "e8c9c0f7-0d54-4db2-b8d6-cd80c45f6a5c"),
            (Perm::WRITE_IDENTITY, "327c4cc8-9c46-4e1e-bb6b-257ace37b0f6"),
        ];
        for (id, expected) in ids {
            assert_eq!(id.to_string(), expected);
        }
    }

    #[test]
    fn test_is_special() {
        assert!(Special::is_special(&Special::MINE));
        assert!(!Special::is_special(&Class::PRINCIPAL));
    }
}
