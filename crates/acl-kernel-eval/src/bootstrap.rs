//! Static ACL entries for use before the Auth data is available.
//!
//! The bootstrap ACL is a string split on newlines and then on colons, each
//! line holding `principal:permission:target`. The principal is a name of
//! the default identity kind. The permission and target are UUIDs or names
//! from a well-known map. No group expansion is applied.

use std::collections::HashMap;

use acl_kernel_core::Id;

use crate::engine::AclEntry;
use crate::error::{EvalError, Result};

/// Parsed bootstrap ACL, keyed by principal name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BootstrapAcl {
    entries: HashMap<String, Vec<AclEntry>>,
}

impl BootstrapAcl {
    /// An empty bootstrap ACL.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse the bootstrap ACL. Names in the permission and target fields
    /// are looked up in `names` before being parsed as UUIDs.
    pub fn parse(text: &str, names: &HashMap<String, Id>) -> Result<Self> {
        let mut acl = Self::new();

        for (index, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            let fields: Vec<&str> = line.split(':').collect();
            let [principal, permission, target] = fields.as_slice() else {
                return Err(EvalError::InvalidBootstrap {
                    line: index + 1,
                    reason: format!("expected 3 fields, found {}", fields.len()),
                });
            };

            let lookup = |field: &str| {
                names
                    .get(field)
                    .copied()
                    .or_else(|| Id::parse(field).ok())
                    .ok_or_else(|| EvalError::InvalidBootstrap {
                        line: index + 1,
                        reason: format!("unknown name {:?}", field),
                    })
            };

            let entry = AclEntry::new(lookup(*permission)?, lookup(*target)?);
            acl.entries
                .entry((*principal).to_string())
                .or_default()
                .push(entry);
        }

        tracing::debug!(principals = acl.entries.len(), "parsed bootstrap ACL");
        Ok(acl)
    }

    /// The bootstrap entries for a principal name, if it is listed.
    pub fn entries_for(&self, principal: &str) -> Option<&[AclEntry]> {
        self.entries.get(principal).map(Vec::as_slice)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
