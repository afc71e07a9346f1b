//! Permitted-target predicates.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use acl_kernel_core::{Id, Special};

use crate::engine::AclEntry;

/// Which targets a principal may act on for one permission.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permitted {
    /// No target at all. This is a hard denial, not an empty predicate.
    #[default]
    None,
    /// Every target.
    All,
    /// Exactly these targets.
    Targets(HashSet<Id>),
}

impl Permitted {
    /// Build the predicate for `permission` from ACL entries.
    ///
    /// A `Null` target is the wildcard. It only widens the predicate to
    /// [`Permitted::All`] when `allow_wildcard` is set; otherwise it is kept
    /// as a literal target.
    pub fn from_entries<'a, I>(entries: I, permission: &Id, allow_wildcard: bool) -> Self
    where
        I: IntoIterator<Item = &'a AclEntry>,
    {
        let targets: HashSet<Id> = entries
            .into_iter()
            .filter(|e| e.permission == *permission)
            .map(|e| e.target)
            .collect();

        if targets.is_empty() {
            Permitted::None
        } else if allow_wildcard && targets.contains(&Special::WILDCARD) {
            Permitted::All
        } else {
            Permitted::Targets(targets)
        }
    }

    /// Whether `target` is permitted.
    pub fn allows(&self, target: &Id) -> bool {
        match self {
            Permitted::None => false,
            Permitted::All => true,
            Permitted::Targets(targets) => targets.contains(target),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Permitted::None)
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Permitted::All)
    }
}
