//! Test fixtures and helpers.
//!
//! Common setup code for integration tests.

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use acl_kernel::{AuthConfig, Authorizer, SnapshotCache};
use acl_kernel_core::{Class, Id, Identity, Perm};
use acl_kernel_store::{GrantStore, MemoryStore};

use crate::group_index::MemoryGroupIndex;

/// A Group Index and a memory store, plus helpers to populate them.
pub struct TestFixture {
    pub index: Arc<MemoryGroupIndex>,
    pub store: Arc<MemoryStore>,
}

impl TestFixture {
    /// An empty world whose Permission class holds the management
    /// permissions.
    pub fn new() -> Self {
        let index = MemoryGroupIndex::new();
        index.add_members(
            Class::PERMISSION,
            [
                Perm::READ_ACL,
                Perm::WRITE_ACL,
                Perm::READ_IDENTITY,
                Perm::WRITE_IDENTITY,
            ],
        );
        Self {
            index: Arc::new(index),
            store: Arc::new(MemoryStore::new()),
        }
    }

    /// A new leaf principal with a Kerberos name in the store.
    ///
    /// Call before starting an authorizer, or its identity list will not
    /// include the name.
    pub async fn principal(&self, name: &str) -> Id {
        let id = Id::new_v4();
        self.index.add_member(Class::PRINCIPAL, id);
        self.store
            .put_identity(&Identity::kerberos(id, name))
            .await
            .expect("memory store never fails");
        id
    }

    /// A new leaf principal without a name.
    pub fn anonymous_principal(&self) -> Id {
        let id = Id::new_v4();
        self.index.add_member(Class::PRINCIPAL, id);
        id
    }

    /// A new leaf permission.
    pub fn permission(&self) -> Id {
        let id = Id::new_v4();
        self.index.add_member(Class::PERMISSION, id);
        id
    }

    /// A new group with the given direct members.
    pub fn group(&self, members: &[Id]) -> Id {
        let id = Id::new_v4();
        self.index.add_members(id, members.iter().copied());
        id
    }

    /// Start an authorizer with the default configuration.
    pub async fn authorizer(&self) -> Authorizer {
        self.authorizer_with(AuthConfig::default()).await
    }

    pub async fn authorizer_with(&self, config: AuthConfig) -> Authorizer {
        Authorizer::start(config, self.store.clone(), self.index.clone())
            .await
            .expect("authorizer failed to start")
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Wait until `cache` publishes a snapshot newer than `generation`.
///
/// Panics after five seconds.
pub async fn wait_for_generation(cache: &SnapshotCache, generation: u64) -> u64 {
    let mut published = cache.subscribe();
    let wait = published.wait_for(|s| s.as_ref().is_some_and(|s| s.generation > generation));
    let snapshot = tokio::time::timeout(Duration::from_secs(5), wait)
        .await
        .expect("no new snapshot within five seconds")
        .expect("snapshot channel closed");
    snapshot.as_ref().map_or(generation, |s| s.generation)
}

/// The generation of the current snapshot, or zero.
pub fn generation(cache: &SnapshotCache) -> u64 {
    cache.current().map_or(0, |s| s.generation)
}

/// Install a test subscriber honouring `RUST_LOG`. Safe to call repeatedly.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}
