//! The Authorizer: unified API for permission checks and grant management.
//!
//! Reads evaluate the published snapshot; writes go through the mutation
//! bus and return once the snapshot reflects them.

use std::sync::Arc;

use tokio::task::JoinHandle;

use acl_kernel_bus::{Ack, DumpRequest, GrantRequest, IdentityRequest, MutationBus, MutationRequest};
use acl_kernel_core::{
    validate_dump, Dump, Grant, GrantId, GrantPattern, Id, Identity, Perm, PrincipalRef,
    StoredGrant,
};
use acl_kernel_eval::{AclEntry, BootstrapAcl, EffectiveAcl, GroupIndex, Permitted};
use acl_kernel_store::GrantStore;

use crate::cache::SnapshotCache;
use crate::config::AuthConfig;
use crate::error::{AuthError, Result};

/// Permission checks and grant management over one store and Group Index.
///
/// Principals are named by strings: a bare name of the default identity
/// kind, `<kind>:<name>`, or `uuid:<id>`.
///
/// Every management operation comes in two forms. The plain form acts with
/// full rights. The `_as` form acts for a caller and is limited by the
/// caller's `ReadAcl`, `WriteAcl`, `ReadIdentity` and `WriteIdentity`
/// grants; wildcards in those grants are honoured.
pub struct Authorizer {
    config: AuthConfig,
    root: Option<PrincipalRef>,
    bootstrap: BootstrapAcl,
    cache: Arc<SnapshotCache>,
    bus: MutationBus,
    watcher: JoinHandle<()>,
}

impl Authorizer {
    /// Load the store, publish the first snapshot and start the bus.
    pub async fn start(
        config: AuthConfig,
        store: Arc<dyn GrantStore>,
        index: Arc<dyn GroupIndex>,
    ) -> Result<Self> {
        let bootstrap = config.bootstrap_acl()?;
        let root = config.root();

        let cache = SnapshotCache::new(index, config.acl_ttl());
        let watcher = cache.spawn_watcher();

        let grants = store.list_grants().await?;
        let identities = store.list_identities().await?;
        if let Err(e) = cache.load(grants, identities).await {
            watcher.abort();
            return Err(e.into());
        }

        let bus = MutationBus::spawn(store, cache.clone(), config.bus());

        tracing::info!(
            root = ?config.root_principal,
            bootstrap = !bootstrap.is_empty(),
            "authorizer started"
        );

        Ok(Self {
            config,
            root,
            bootstrap,
            cache,
            bus,
            watcher,
        })
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<SnapshotCache> {
        &self.cache
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Permission checks
    // ─────────────────────────────────────────────────────────────────────────

    /// The targets `principal` may act on with `permission`.
    ///
    /// Fails closed: an unresolvable or unknown principal gets
    /// [`Permitted::None`].
    pub async fn permitted(&self, principal: &str, permission: Id, allow_wildcard: bool) -> Permitted {
        let principal = self.config.principal_ref(principal);

        if self.root.as_ref() == Some(&principal) {
            tracing::info!(%principal, "has root access");
            return Permitted::All;
        }

        if let Some(entries) = self.bootstrap_entries(&principal) {
            tracing::debug!(%principal, "answering from bootstrap ACL");
            return Permitted::from_entries(entries, &permission, allow_wildcard);
        }

        match self.acl_of(&principal).await {
            Some(acl) => Permitted::from_entries(acl.entries(), &permission, allow_wildcard),
            None => Permitted::None,
        }
    }

    /// Whether `principal` may act on `target` with `permission`.
    pub async fn check(
        &self,
        principal: &str,
        permission: Id,
        target: Id,
        allow_wildcard: bool,
    ) -> bool {
        self.permitted(principal, permission, allow_wildcard)
            .await
            .allows(&target)
    }

    /// The full effective ACL of `principal`.
    pub async fn effective_acl(&self, principal: &str) -> Result<Arc<EffectiveAcl>> {
        let principal = self.config.principal_ref(principal);
        self.acl_of(&principal)
            .await
            .ok_or_else(|| AuthError::UnknownPrincipal(principal.to_string()))
    }

    /// The effective ACL of `principal` as `caller` may see it.
    ///
    /// A caller sees all of its own ACL. Of anyone else's it sees the
    /// entries whose permission it holds `ReadAcl` for.
    pub async fn effective_acl_as(&self, caller: &str, principal: &str) -> Result<EffectiveAcl> {
        let acl = self.effective_acl(principal).await?;
        if self.resolve(caller).await == Some(acl.principal()) {
            return Ok((*acl).clone());
        }

        let readable = self.permitted(caller, Perm::READ_ACL, true).await;
        Ok((*acl).clone().retain_permissions(|p| readable.allows(p)))
    }

    fn bootstrap_entries(&self, principal: &PrincipalRef) -> Option<&[AclEntry]> {
        match principal {
            PrincipalRef::Named { kind, name } if *kind == self.config.default_identity_kind => {
                self.bootstrap.entries_for(name)
            }
            _ => None,
        }
    }

    async fn acl_of(&self, principal: &PrincipalRef) -> Option<Arc<EffectiveAcl>> {
        let snapshot = self.cache.snapshot().await;
        let Some(id) = snapshot.identities.resolve(principal) else {
            tracing::debug!(%principal, "unresolved principal");
            return None;
        };
        self.cache.effective_acl(id).await
    }

    /// Full rights for `None`, otherwise what `caller` holds `permission` on.
    async fn rights(&self, caller: Option<&str>, permission: Id) -> Permitted {
        match caller {
            None => Permitted::All,
            Some(caller) => self.permitted(caller, permission, true).await,
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Grants
    // ─────────────────────────────────────────────────────────────────────────

    pub async fn add_grant(&self, grant: Grant) -> Result<Ack> {
        self.add_grant_for(None, grant).await
    }

    /// Add a grant. Needs `WriteAcl` on the grant's permission.
    pub async fn add_grant_as(&self, caller: &str, grant: Grant) -> Result<Ack> {
        self.add_grant_for(Some(caller), grant).await
    }

    async fn add_grant_for(&self, caller: Option<&str>, grant: Grant) -> Result<Ack> {
        let permitted = self.rights(caller, Perm::WRITE_ACL).await;
        self.send(MutationRequest::grant(&GrantRequest::Create { grant, permitted })?)
            .await
    }

    pub async fn update_grant(&self, id: GrantId, grant: Grant) -> Result<Ack> {
        self.update_grant_for(None, id, grant).await
    }

    /// Replace a grant's tuple. Needs `WriteAcl` on the old and new
    /// permissions.
    pub async fn update_grant_as(&self, caller: &str, id: GrantId, grant: Grant) -> Result<Ack> {
        self.update_grant_for(Some(caller), id, grant).await
    }

    async fn update_grant_for(&self, caller: Option<&str>, id: GrantId, grant: Grant) -> Result<Ack> {
        let permitted = self.rights(caller, Perm::WRITE_ACL).await;
        let request = GrantRequest::Update {
            id,
            grant,
            permitted,
        };
        self.send(MutationRequest::grant(&request)?).await
    }

    pub async fn remove_grant(&self, id: GrantId) -> Result<Ack> {
        self.remove_grant_for(None, id).await
    }

    /// Remove a grant by id. Needs `WriteAcl` on its permission.
    pub async fn remove_grant_as(&self, caller: &str, id: GrantId) -> Result<Ack> {
        self.remove_grant_for(Some(caller), id).await
    }

    async fn remove_grant_for(&self, caller: Option<&str>, id: GrantId) -> Result<Ack> {
        let permitted = self.rights(caller, Perm::WRITE_ACL).await;
        self.send(MutationRequest::grant(&GrantRequest::Remove { id, permitted })?)
            .await
    }

    /// Remove a grant by tuple. Succeeds when it is already absent.
    pub async fn delete_grant(&self, grant: Grant) -> Result<Ack> {
        self.delete_grant_for(None, grant).await
    }

    pub async fn delete_grant_as(&self, caller: &str, grant: Grant) -> Result<Ack> {
        self.delete_grant_for(Some(caller), grant).await
    }

    async fn delete_grant_for(&self, caller: Option<&str>, grant: Grant) -> Result<Ack> {
        let permitted = self.rights(caller, Perm::WRITE_ACL).await;
        self.send(MutationRequest::grant(&GrantRequest::Delete { grant, permitted })?)
            .await
    }

    pub async fn get_grant(&self, id: GrantId) -> Option<StoredGrant> {
        let snapshot = self.cache.snapshot().await;
        snapshot.grants.iter().find(|g| g.id == id).copied()
    }

    /// Fetch a grant. Needs `ReadAcl` on its permission.
    pub async fn get_grant_as(&self, caller: &str, id: GrantId) -> Result<Option<StoredGrant>> {
        let Some(grant) = self.get_grant(id).await else {
            return Ok(None);
        };
        let readable = self.permitted(caller, Perm::READ_ACL, true).await;
        if !readable.allows(&grant.grant.permission) {
            return Err(AuthError::Forbidden(format!("{} may not read grant {}", caller, id)));
        }
        Ok(Some(grant))
    }

    pub async fn list_grants(&self) -> Vec<StoredGrant> {
        self.find_grants(&GrantPattern::any()).await
    }

    /// Grants whose permission `caller` holds `ReadAcl` for.
    pub async fn list_grants_as(&self, caller: &str) -> Vec<StoredGrant> {
        self.find_grants_as(caller, &GrantPattern::any()).await
    }

    pub async fn find_grants(&self, pattern: &GrantPattern) -> Vec<StoredGrant> {
        let snapshot = self.cache.snapshot().await;
        snapshot
            .grants
            .iter()
            .filter(|g| pattern.matches(&g.grant))
            .copied()
            .collect()
    }

    /// Matching grants whose permission `caller` holds `ReadAcl` for.
    pub async fn find_grants_as(&self, caller: &str, pattern: &GrantPattern) -> Vec<StoredGrant> {
        let readable = self.permitted(caller, Perm::READ_ACL, true).await;
        let mut grants = self.find_grants(pattern).await;
        grants.retain(|g| readable.allows(&g.grant.permission));
        grants
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identities
    // ─────────────────────────────────────────────────────────────────────────

    /// The principal id a name resolves to.
    pub async fn resolve(&self, principal: &str) -> Option<Id> {
        let principal = self.config.principal_ref(principal);
        self.cache.snapshot().await.identities.resolve(&principal)
    }

    pub async fn identities_of(&self, principal: Id) -> Vec<Identity> {
        self.cache.snapshot().await.identities.names_of(&principal)
    }

    /// A principal's names. Needs `ReadIdentity` on the principal.
    pub async fn identities_of_as(&self, caller: &str, principal: Id) -> Result<Vec<Identity>> {
        let readable = self.permitted(caller, Perm::READ_IDENTITY, true).await;
        if !readable.allows(&principal) {
            return Err(AuthError::Forbidden(format!(
                "{} may not read identities of {}",
                caller, principal
            )));
        }
        Ok(self.identities_of(principal).await)
    }

    pub async fn put_identity(&self, identity: Identity) -> Result<Ack> {
        self.put_identity_for(None, identity).await
    }

    /// Add a name for a principal. Needs `WriteIdentity` on the principal.
    pub async fn put_identity_as(&self, caller: &str, identity: Identity) -> Result<Ack> {
        self.put_identity_for(Some(caller), identity).await
    }

    async fn put_identity_for(&self, caller: Option<&str>, identity: Identity) -> Result<Ack> {
        let permitted = self.rights(caller, Perm::WRITE_IDENTITY).await;
        let request = IdentityRequest::Put {
            identity,
            permitted,
        };
        self.send(MutationRequest::identity(&request)?).await
    }

    pub async fn delete_identity(&self, principal: Id, kind: &str) -> Result<Ack> {
        self.delete_identity_for(None, principal, kind).await
    }

    /// Remove a principal's name of one kind. Needs `WriteIdentity` on the
    /// principal.
    pub async fn delete_identity_as(&self, caller: &str, principal: Id, kind: &str) -> Result<Ack> {
        self.delete_identity_for(Some(caller), principal, kind).await
    }

    async fn delete_identity_for(
        &self,
        caller: Option<&str>,
        principal: Id,
        kind: &str,
    ) -> Result<Ack> {
        let permitted = self.rights(caller, Perm::WRITE_IDENTITY).await;
        let request = IdentityRequest::Delete {
            principal,
            kind: kind.to_string(),
            permitted,
        };
        self.send(MutationRequest::identity(&request)?).await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Dumps
    // ─────────────────────────────────────────────────────────────────────────

    /// Validate and load a dump.
    pub async fn import_dump(&self, dump: Dump) -> Result<Ack> {
        self.import_dump_for(None, dump).await
    }

    /// Validate and load a dump. Needs `WriteIdentity` on every identity
    /// principal and `WriteAcl` on every permission the dump adds or
    /// replaces.
    pub async fn import_dump_as(&self, caller: &str, dump: Dump) -> Result<Ack> {
        self.import_dump_for(Some(caller), dump).await
    }

    async fn import_dump_for(&self, caller: Option<&str>, dump: Dump) -> Result<Ack> {
        validate_dump(&dump)?;

        let acl = self.rights(caller, Perm::WRITE_ACL).await;
        let identity = self.rights(caller, Perm::WRITE_IDENTITY).await;
        let request = DumpRequest {
            dump,
            acl,
            identity,
        };
        self.send(MutationRequest::dump(&request)?).await
    }

    async fn send(&self, request: MutationRequest) -> Result<Ack> {
        let ack = self.bus.request(request).await?;
        tracing::debug!(
            correlation = %ack.correlation,
            kind = %ack.kind,
            status = ?ack.status,
            "mutation acknowledged"
        );
        Ok(ack)
    }
}

impl Drop for Authorizer {
    fn drop(&mut self) {
        self.watcher.abort();
    }
}
