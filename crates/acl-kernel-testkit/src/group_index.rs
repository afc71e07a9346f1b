//! In-memory Group Index.
//!
//! Holds direct group memberships and object owners, answers powerset
//! queries by walking memberships transitively, and broadcasts a
//! [`GroupChange`] after every edit.

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use tokio::sync::broadcast;

use acl_kernel_core::{Id, Special};
use acl_kernel_eval::{GroupChange, GroupIndex, GroupIndexError};

#[derive(Default)]
struct IndexState {
    /// Direct members of each group or class.
    members: HashMap<Id, BTreeSet<Id>>,
    owners: HashMap<Id, Id>,
}

impl IndexState {
    fn transitive(&self, group: &Id) -> BTreeSet<Id> {
        let mut seen = BTreeSet::new();
        let mut queue: VecDeque<Id> = self
            .members
            .get(group)
            .into_iter()
            .flatten()
            .copied()
            .collect();

        while let Some(next) = queue.pop_front() {
            if next == *group || !seen.insert(next) {
                continue;
            }
            queue.extend(self.members.get(&next).into_iter().flatten().copied());
        }
        seen
    }
}

/// A Group Index backed by in-memory maps.
pub struct MemoryGroupIndex {
    state: RwLock<IndexState>,
    changes: broadcast::Sender<GroupChange>,
    available: AtomicBool,
}

impl MemoryGroupIndex {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(IndexState::default()),
            changes: broadcast::channel(64).0,
            available: AtomicBool::new(true),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, change: GroupChange) {
        // No subscribers is fine.
        let _ = self.changes.send(change);
    }

    /// Make `member` a direct member of `group`.
    pub fn add_member(&self, group: Id, member: Id) {
        self.write().members.entry(group).or_default().insert(member);
        self.notify(GroupChange::Membership { group });
    }

    pub fn add_members(&self, group: Id, members: impl IntoIterator<Item = Id>) {
        self.write().members.entry(group).or_default().extend(members);
        self.notify(GroupChange::Membership { group });
    }

    pub fn remove_member(&self, group: Id, member: &Id) {
        if let Some(members) = self.write().members.get_mut(&group) {
            members.remove(member);
        }
        self.notify(GroupChange::Membership { group });
    }

    /// Set the owner of `object`. `Unowned` clears it.
    pub fn set_owner(&self, object: Id, owner: Id) {
        {
            let mut state = self.write();
            if owner == Special::UNOWNED {
                state.owners.remove(&object);
            } else {
                state.owners.insert(object, owner);
            }
        }
        self.notify(GroupChange::Ownership { object });
    }

    /// Make every query fail with [`GroupIndexError::Unavailable`].
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
        if available {
            self.notify(GroupChange::Reset);
        }
    }

    fn check_available(&self) -> Result<(), GroupIndexError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GroupIndexError::Unavailable("index switched off".into()))
        }
    }
}

impl Default for MemoryGroupIndex {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl GroupIndex for MemoryGroupIndex {
    async fn members(&self, class: &Id) -> Result<BTreeSet<Id>, GroupIndexError> {
        self.check_available()?;
        let state = self.read();
        Ok(state.members.get(class).cloned().unwrap_or_default())
    }

    async fn powerset(
        &self,
        ids: &BTreeSet<Id>,
    ) -> Result<BTreeMap<Id, BTreeSet<Id>>, GroupIndexError> {
        self.check_available()?;
        let state = self.read();
        Ok(ids.iter().map(|id| (*id, state.transitive(id))).collect())
    }

    async fn owner_of_all(&self) -> Result<HashMap<Id, Id>, GroupIndexError> {
        self.check_available()?;
        Ok(self.read().owners.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<GroupChange> {
        self.changes.subscribe()
    }
}
