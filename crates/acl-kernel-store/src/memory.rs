//! In-memory implementation of the GrantStore trait.
//!
//! This is primarily for testing. It has the same semantics as SQLite
//! but keeps everything in memory with no persistence.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use acl_kernel_core::{Dump, Grant, GrantId, GrantPattern, Id, Identity, StoredGrant};

use crate::error::{Result, StoreError};
use crate::traits::{DeleteResult, DumpResult, GrantStore, IdentityResult, InsertResult, UpdateResult};

type GrantKey = (Id, Id, Id);

/// In-memory store implementation.
///
/// All data is lost when the store is dropped. Thread-safe via RwLock.
pub struct MemoryStore {
    inner: RwLock<MemoryStoreInner>,
}

#[derive(Clone, Default)]
struct MemoryStoreInner {
    /// Grants indexed by id.
    grants: HashMap<GrantId, Grant>,

    /// Key index: (principal, permission, target) -> grant id.
    by_key: HashMap<GrantKey, GrantId>,

    /// Identities.
    identities: Vec<Identity>,
}

impl MemoryStoreInner {
    fn insert(&mut self, grant: &Grant) -> InsertResult {
        if let Some(&existing) = self.by_key.get(&grant.key()) {
            return match self.grants.get(&existing) {
                Some(stored) if stored == grant => InsertResult::AlreadyExists(existing),
                _ => InsertResult::Conflict { existing },
            };
        }

        let id = GrantId::new_v4();
        self.grants.insert(id, *grant);
        self.by_key.insert(grant.key(), id);
        InsertResult::Inserted(id)
    }

    fn remove(&mut self, id: &GrantId) -> Option<Grant> {
        let grant = self.grants.remove(id)?;
        self.by_key.remove(&grant.key());
        Some(grant)
    }

    fn put_identity(&mut self, identity: &Identity) -> IdentityResult {
        if self.identities.contains(identity) {
            return IdentityResult::AlreadyExists;
        }
        let clash = self.identities.iter().any(|i| {
            i.kind == identity.kind
                && (i.name == identity.name || i.principal == identity.principal)
        });
        if clash {
            return IdentityResult::Conflict;
        }
        self.identities.push(identity.clone());
        IdentityResult::Inserted
    }

    fn sorted(&self, pattern: &GrantPattern) -> Vec<StoredGrant> {
        let mut grants: Vec<StoredGrant> = self
            .grants
            .iter()
            .filter(|(_, g)| pattern.matches(g))
            .map(|(id, grant)| StoredGrant {
                id: *id,
                grant: *grant,
            })
            .collect();
        grants.sort_by_key(|g| g.grant.key());
        grants
    }
}

impl MemoryStore {
    /// Create a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(MemoryStoreInner::default()),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, MemoryStoreInner>> {
        self.inner.read().map_err(|_| StoreError::LockPoisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, MemoryStoreInner>> {
        self.inner.write().map_err(|_| StoreError::LockPoisoned)
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GrantStore for MemoryStore {
    async fn insert_grant(&self, grant: &Grant) -> Result<InsertResult> {
        Ok(self.write()?.insert(grant))
    }

    async fn get_grant(&self, id: &GrantId) -> Result<Option<StoredGrant>> {
        let inner = self.read()?;
        Ok(inner
            .grants
            .get(id)
            .map(|grant| StoredGrant { id: *id, grant: *grant }))
    }

    async fn list_grants(&self) -> Result<Vec<StoredGrant>> {
        Ok(self.read()?.sorted(&GrantPattern::any()))
    }

    async fn find_grants(&self, pattern: &GrantPattern) -> Result<Vec<StoredGrant>> {
        Ok(self.read()?.sorted(pattern))
    }

    async fn update_grant(&self, id: &GrantId, grant: &Grant) -> Result<UpdateResult> {
        let mut inner = self.write()?;

        let Some(current) = inner.grants.get(id).copied() else {
            return Ok(UpdateResult::NotFound);
        };

        if let Some(&other) = inner.by_key.get(&grant.key()) {
            if other != *id {
                return Ok(UpdateResult::Conflict { existing: other });
            }
        }

        inner.by_key.remove(&current.key());
        inner.by_key.insert(grant.key(), *id);
        inner.grants.insert(*id, *grant);
        Ok(UpdateResult::Updated)
    }

    async fn remove_grant(&self, id: &GrantId) -> Result<Option<StoredGrant>> {
        let mut inner = self.write()?;
        Ok(inner.remove(id).map(|grant| StoredGrant { id: *id, grant }))
    }

    async fn delete_grant(&self, grant: &Grant) -> Result<DeleteResult> {
        let mut inner = self.write()?;
        match inner.by_key.get(&grant.key()).copied() {
            Some(id) => {
                inner.remove(&id);
                Ok(DeleteResult::Deleted(id))
            }
            None => Ok(DeleteResult::AlreadyAbsent),
        }
    }

    async fn permissions_granted_to(&self, principals: &[Id]) -> Result<BTreeSet<Id>> {
        let inner = self.read()?;
        Ok(inner
            .grants
            .values()
            .filter(|g| principals.contains(&g.principal))
            .map(|g| g.permission)
            .collect())
    }

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        Ok(self.read()?.identities.clone())
    }

    async fn put_identity(&self, identity: &Identity) -> Result<IdentityResult> {
        Ok(self.write()?.put_identity(identity))
    }

    async fn delete_identity(&self, principal: &Id, kind: &str) -> Result<bool> {
        let mut inner = self.write()?;
        let before = inner.identities.len();
        inner
            .identities
            .retain(|i| !(i.principal == *principal && i.kind == kind));
        Ok(inner.identities.len() != before)
    }

    async fn load_dump(&self, dump: &Dump) -> Result<DumpResult> {
        let mut guard = self.write()?;

        // Work on a copy so a conflict leaves the store untouched.
        let mut inner = guard.clone();

        let mut identities_added = 0;
        for identity in &dump.identities {
            match inner.put_identity(identity) {
                IdentityResult::Inserted => identities_added += 1,
                IdentityResult::AlreadyExists => {}
                IdentityResult::Conflict => {
                    return Ok(DumpResult::IdentityConflict {
                        kind: identity.kind.clone(),
                        name: identity.name.clone(),
                    });
                }
            }
        }

        let principals = dump.grant_principals();
        let keep: HashSet<GrantKey> = dump.grants.iter().map(Grant::key).collect();

        let stale: Vec<GrantId> = inner
            .grants
            .iter()
            .filter(|(_, g)| principals.contains(&g.principal) && !keep.contains(&g.key()))
            .map(|(id, _)| *id)
            .collect();

        let mut grants_changed = stale.len();
        for id in &stale {
            inner.remove(id);
        }

        for grant in &dump.grants {
            match inner.insert(grant) {
                InsertResult::Inserted(_) => grants_changed += 1,
                InsertResult::AlreadyExists(_) => {}
                InsertResult::Conflict { existing } => {
                    inner.grants.insert(existing, *grant);
                    grants_changed += 1;
                }
            }
        }

        *guard = inner;
        Ok(DumpResult::Applied {
            grants_changed,
            identities_added,
        })
    }
}
