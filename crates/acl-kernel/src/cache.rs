//! The Snapshot Cache.
//!
//! Holds the most recent [`Snapshot`] of everything evaluation reads: the
//! group and ownership views fetched from the Group Index, the grant list
//! and the identity list. Readers take an `Arc` of the published snapshot
//! and never block writers or each other.
//!
//! A new snapshot is published when:
//!
//! - the mutation bus pushes a refetched grant or identity list
//! - the Group Index reports a change (a background watcher task)
//!
//! Effective ACLs are cached per principal, stamped with the generation of
//! the snapshot they were computed from, and reused for at most the
//! configured lifetime.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use acl_kernel_bus::RefreshSink;
use acl_kernel_core::{Id, Identity, StoredGrant};
use acl_kernel_eval::{effective_acl, EffectiveAcl, GroupIndex, GroupIndexError, GroupSnapshot};

use crate::identity::IdentityTable;

/// Everything evaluation reads, at one point in time.
#[derive(Debug, Clone)]
pub struct Snapshot {
    /// Increases by one with every published snapshot.
    pub generation: u64,
    pub groups: Arc<GroupSnapshot>,
    pub grants: Arc<Vec<StoredGrant>>,
    pub identities: Arc<IdentityTable>,
}

impl Snapshot {
    /// Compute the effective ACL of `principal` from this snapshot.
    pub fn evaluate(&self, principal: Id) -> Option<EffectiveAcl> {
        effective_acl(principal, &self.groups, self.grants.iter().map(|g| &g.grant))
    }
}

#[derive(Default)]
struct Parts {
    groups: Option<Arc<GroupSnapshot>>,
    grants: Option<Arc<Vec<StoredGrant>>>,
    identities: Option<Arc<IdentityTable>>,
    generation: u64,
}

struct CachedAcl {
    generation: u64,
    computed: Instant,
    acl: Arc<EffectiveAcl>,
}

/// Push-driven cache of evaluation inputs and effective ACLs.
pub struct SnapshotCache {
    index: Arc<dyn GroupIndex>,
    acl_ttl: Duration,
    /// Serializes writers; held across Group Index fetches.
    parts: tokio::sync::Mutex<Parts>,
    published: watch::Sender<Option<Arc<Snapshot>>>,
    acls: Mutex<HashMap<Id, CachedAcl>>,
}

impl SnapshotCache {
    pub fn new(index: Arc<dyn GroupIndex>, acl_ttl: Duration) -> Arc<Self> {
        let (published, _) = watch::channel(None);
        Arc::new(Self {
            index,
            acl_ttl,
            parts: tokio::sync::Mutex::new(Parts::default()),
            published,
            acls: Mutex::new(HashMap::new()),
        })
    }

    fn acls(&self) -> MutexGuard<'_, HashMap<Id, CachedAcl>> {
        self.acls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_fresh(&self, cached: &CachedAcl, generation: u64, now: Instant) -> bool {
        cached.generation == generation && now.duration_since(cached.computed) < self.acl_ttl
    }

    /// Start recomputing group views on Group Index changes.
    ///
    /// Subscribes before returning so no change made after this call is
    /// missed. The task stops when the cache is dropped or the Group Index
    /// closes its change feed.
    pub fn spawn_watcher(self: &Arc<Self>) -> JoinHandle<()> {
        let mut changes = self.index.subscribe();
        let cache: Weak<Self> = Arc::downgrade(self);

        tokio::spawn(async move {
            loop {
                match changes.recv().await {
                    Ok(change) => tracing::debug!(?change, "group index changed"),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::debug!(skipped, "group change feed lagged")
                    }
                    Err(RecvError::Closed) => {
                        tracing::warn!("group index closed its change feed");
                        break;
                    }
                }

                // One refresh covers every change already queued.
                loop {
                    match changes.try_recv() {
                        Ok(_) | Err(TryRecvError::Lagged(_)) => continue,
                        Err(_) => break,
                    }
                }

                let Some(cache) = cache.upgrade() else {
                    break;
                };
                if let Err(e) = cache.refresh_groups().await {
                    tracing::warn!(error = %e, "failed to refresh group snapshot");
                }
            }
            tracing::debug!("group watcher stopped");
        })
    }

    /// Load the initial grant and identity lists and publish the first
    /// snapshot.
    pub async fn load(
        &self,
        grants: Vec<StoredGrant>,
        identities: Vec<Identity>,
    ) -> Result<(), GroupIndexError> {
        let mut parts = self.parts.lock().await;
        parts.grants = Some(Arc::new(grants));
        parts.identities = Some(Arc::new(IdentityTable::new(identities)));
        self.fetch_groups(&mut parts).await?;
        self.publish(&mut parts);
        Ok(())
    }

    /// Refetch the group views for the current grant list.
    pub async fn refresh_groups(&self) -> Result<(), GroupIndexError> {
        let mut parts = self.parts.lock().await;
        self.fetch_groups(&mut parts).await?;
        self.publish(&mut parts);
        Ok(())
    }

    async fn fetch_groups(&self, parts: &mut Parts) -> Result<(), GroupIndexError> {
        let grants = parts.grants.clone().unwrap_or_default();
        let groups =
            GroupSnapshot::fetch(self.index.as_ref(), grants.iter().map(|g| &g.grant)).await?;
        parts.groups = Some(Arc::new(groups));
        Ok(())
    }

    /// Publish the assembled parts once all of them are present.
    fn publish(&self, parts: &mut Parts) {
        let (Some(groups), Some(grants), Some(identities)) =
            (&parts.groups, &parts.grants, &parts.identities)
        else {
            return;
        };

        parts.generation += 1;
        let snapshot = Snapshot {
            generation: parts.generation,
            groups: Arc::clone(groups),
            grants: Arc::clone(grants),
            identities: Arc::clone(identities),
        };

        self.acls().clear();
        tracing::debug!(
            generation = snapshot.generation,
            grants = snapshot.grants.len(),
            identities = snapshot.identities.len(),
            "published snapshot"
        );
        self.published.send_replace(Some(Arc::new(snapshot)));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Readers
    // ─────────────────────────────────────────────────────────────────────────

    /// The current snapshot, waiting for the first one to be published.
    pub async fn snapshot(&self) -> Arc<Snapshot> {
        let mut rx = self.published.subscribe();
        loop {
            let current = rx.borrow_and_update().clone();
            if let Some(snapshot) = current {
                return snapshot;
            }
            // The sender lives in `self`, so the channel cannot close here.
            let _ = rx.changed().await;
        }
    }

    /// The current snapshot, if one has been published.
    pub fn current(&self) -> Option<Arc<Snapshot>> {
        self.published.borrow().clone()
    }

    /// Watch published snapshots.
    pub fn subscribe(&self) -> watch::Receiver<Option<Arc<Snapshot>>> {
        self.published.subscribe()
    }

    /// The effective ACL of `principal`, from cache when still fresh.
    ///
    /// `None` means `principal` is not a known principal. Only known
    /// principals are cached; inserting an entry drops every expired one.
    pub async fn effective_acl(&self, principal: Id) -> Option<Arc<EffectiveAcl>> {
        let snapshot = self.snapshot().await;
        let now = Instant::now();

        let hit = self
            .acls()
            .get(&principal)
            .filter(|c| self.is_fresh(c, snapshot.generation, now))
            .map(|c| Arc::clone(&c.acl));
        if hit.is_some() {
            return hit;
        }

        let Some(acl) = snapshot.evaluate(principal).map(Arc::new) else {
            tracing::debug!(%principal, generation = snapshot.generation, "unknown principal");
            return None;
        };
        tracing::debug!(
            %principal,
            generation = snapshot.generation,
            entries = acl.len(),
            "computed effective ACL"
        );

        let mut acls = self.acls();
        acls.retain(|_, c| self.is_fresh(c, snapshot.generation, now));
        acls.insert(
            principal,
            CachedAcl {
                generation: snapshot.generation,
                computed: now,
                acl: Arc::clone(&acl),
            },
        );
        Some(acl)
    }

    /// Number of cached effective ACLs.
    pub fn cached_acls(&self) -> usize {
        self.acls().len()
    }

    /// Forget every cached effective ACL.
    pub fn invalidate(&self) {
        self.acls().clear();
    }
}

#[async_trait]
impl RefreshSink for SnapshotCache {
    async fn replace_grants(&self, grants: Vec<StoredGrant>) {
        let mut parts = self.parts.lock().await;
        let grants = Arc::new(grants);

        let covered = parts
            .groups
            .as_ref()
            .is_some_and(|groups| groups.covers(grants.iter().map(|g| &g.grant)));
        parts.grants = Some(grants);

        if !covered {
            // On failure the new grants are published against the old group
            // views; groups they add evaluate as empty until the next refresh.
            if let Err(e) = self.fetch_groups(&mut parts).await {
                tracing::warn!(error = %e, "failed to fetch groups for new grants");
            }
        }
        self.publish(&mut parts);
    }

    async fn replace_identities(&self, identities: Vec<Identity>) {
        let mut parts = self.parts.lock().await;
        parts.identities = Some(Arc::new(IdentityTable::new(identities)));
        self.publish(&mut parts);
    }
}
