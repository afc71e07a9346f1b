//! Access control entries.
//!
//! A grant is a flat `(principal, permission, target, plural)` tuple. Groups
//! named by any of the three ids are expanded at evaluation time, so the
//! stored tuple never changes when group membership does.

use serde::{Deserialize, Serialize};

use crate::types::{GrantId, Id};

/// A single access control entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Grant {
    /// The principal, or a group of principals, being granted access.
    pub principal: Id,

    /// The permission, or a permission group, being granted.
    pub permission: Id,

    /// The target, or the target group when `plural` is set.
    pub target: Id,

    /// Whether `target` names a group to be expanded over its members.
    #[serde(default)]
    pub plural: bool,
}

impl Grant {
    /// Create a grant on a single target.
    pub fn new(principal: Id, permission: Id, target: Id) -> Self {
        Self {
            principal,
            permission,
            target,
            plural: false,
        }
    }

    /// Create a grant over every member of a target group.
    pub fn plural(principal: Id, permission: Id, target_group: Id) -> Self {
        Self {
            principal,
            permission,
            target: target_group,
            plural: true,
        }
    }

    /// The deduplication key. Two grants with the same key are the same
    /// entry as far as the store is concerned.
    pub fn key(&self) -> (Id, Id, Id) {
        (self.principal, self.permission, self.target)
    }
}

/// A grant as held by the store, together with its id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredGrant {
    /// The store-assigned id.
    pub id: GrantId,

    /// The grant tuple.
    #[serde(flatten)]
    pub grant: Grant,
}

/// A partial grant tuple used for searching.
///
/// `None` fields match anything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantPattern {
    #[serde(default)]
    pub principal: Option<Id>,
    #[serde(default)]
    pub permission: Option<Id>,
    #[serde(default)]
    pub target: Option<Id>,
    #[serde(default)]
    pub plural: Option<bool>,
}

impl GrantPattern {
    /// A pattern matching every grant.
    pub fn any() -> Self {
        Self::default()
    }

    pub fn principal(mut self, principal: Id) -> Self {
        self.principal = Some(principal);
        self
    }

    pub fn permission(mut self, permission: Id) -> Self {
        self.permission = Some(permission);
        self
    }

    pub fn target(mut self, target: Id) -> Self {
        self.target = Some(target);
        self
    }

    pub fn plural(mut self, plural: bool) -> Self {
        self.plural = Some(plural);
        self
    }

    /// Check whether a grant matches this pattern.
    pub fn matches(&self, grant: &Grant) -> bool {
        self.principal.map_or(true, |p| p == grant.principal)
            && self.permission.map_or(true, |p| p == grant.permission)
            && self.target.map_or(true, |t| t == grant.target)
            && self.plural.map_or(true, |p| p == grant.plural)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(n: u128) -> Id {
        Id::from_u128(n)
    }

    #[test]
    fn test_plural_defaults_to_false() {
        let json = format!(
            r#"{{"principal":"{}","permission":"{}","target":"{}"}}"#,
            id(1),
            id(2),
            id(3)
        );
        let grant: Grant = serde_json::from_str(&json).unwrap();
        assert!(!grant.plural);
        assert_eq!(grant, Grant::new(id(1), id(2), id(3)));
    }

    #[test]
    fn test_missing_permission_is_rejected() {
        let json = format!(r#"{{"principal":"{}","target":"{}"}}"#, id(1), id(3));
        assert!(serde_json::from_str::<Grant>(&json).is_err());
    }

    #[test]
    fn test_pattern_matching() {
        let grant = Grant::plural(id(1), id(2), id(3));

        assert!(GrantPattern::any().matches(&grant));
        assert!(GrantPattern::any().principal(id(1)).matches(&grant));
        assert!(GrantPattern::any().plural(true).target(id(3)).matches(&grant));
        assert!(!GrantPattern::any().permission(id(9)).matches(&grant));
        assert!(!GrantPattern::any().plural(false).matches(&grant));
    }

    #[test]
    fn test_key_ignores_plural() {
        let a = Grant::new(id(1), id(2), id(3));
        let b = Grant::plural(id(1), id(2), id(3));
        assert_eq!(a.key(), b.key());
        assert_ne!(a, b);
    }
}
