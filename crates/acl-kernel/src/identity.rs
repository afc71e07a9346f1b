//! Principal name resolution.

use std::collections::HashMap;

use acl_kernel_core::{Id, Identity, PrincipalRef};

/// The identity list with a `(kind, name)` lookup.
#[derive(Debug, Clone, Default)]
pub struct IdentityTable {
    identities: Vec<Identity>,
    by_name: HashMap<(String, String), Id>,
}

impl IdentityTable {
    pub fn new(identities: Vec<Identity>) -> Self {
        let by_name = identities
            .iter()
            .map(|i| ((i.kind.clone(), i.name.clone()), i.principal))
            .collect();
        Self {
            identities,
            by_name,
        }
    }

    /// The principal a reference names. Ids resolve to themselves.
    pub fn resolve(&self, principal: &PrincipalRef) -> Option<Id> {
        match principal {
            PrincipalRef::Id(id) => Some(*id),
            PrincipalRef::Named { kind, name } => {
                self.by_name.get(&(kind.clone(), name.clone())).copied()
            }
        }
    }

    /// All names of one principal.
    pub fn names_of(&self, principal: &Id) -> Vec<Identity> {
        self.identities
            .iter()
            .filter(|i| i.principal == *principal)
            .cloned()
            .collect()
    }

    pub fn all(&self) -> &[Identity] {
        &self.identities
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}
