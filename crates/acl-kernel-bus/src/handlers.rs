//! Request handlers.
//!
//! Each handler decodes its own request body, applies it to the store and
//! reports which cached lists the dispatcher must refetch before acking.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;

use acl_kernel_core::{validate_dump, validate_grant, validate_identity, GrantId};
use acl_kernel_eval::Permitted;
use acl_kernel_store::{
    DeleteResult, DumpResult, GrantStore, IdentityResult, InsertResult, StoreError, UpdateResult,
};

use crate::messages::{
    AckStatus, DumpRequest, GrantRequest, IdentityRequest, Rejection, KIND_DUMP, KIND_GRANT,
    KIND_IDENTITY,
};

/// Which cached lists changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Refresh {
    pub grants: bool,
    pub identities: bool,
}

impl Refresh {
    pub const NONE: Refresh = Refresh {
        grants: false,
        identities: false,
    };
    pub const GRANTS: Refresh = Refresh {
        grants: true,
        identities: false,
    };
    pub const IDENTITIES: Refresh = Refresh {
        grants: false,
        identities: true,
    };
    pub const ALL: Refresh = Refresh {
        grants: true,
        identities: true,
    };
}

/// What a handler did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Outcome {
    pub status: AckStatus,
    pub grant: Option<GrantId>,
    /// Lists to refetch when `status` is a success.
    pub refresh: Refresh,
}

impl Outcome {
    fn new(status: AckStatus, refresh: Refresh) -> Self {
        Self {
            status,
            grant: None,
            refresh,
        }
    }

    fn rejected(rejection: Rejection) -> Self {
        Self::new(AckStatus::Rejected(rejection), Refresh::NONE)
    }

    fn with_grant(mut self, grant: GrantId) -> Self {
        self.grant = Some(grant);
        self
    }
}

/// Handles one kind of request.
#[async_trait]
pub trait MutationHandler: Send + Sync {
    async fn handle(
        &self,
        store: &dyn GrantStore,
        body: serde_json::Value,
    ) -> Result<Outcome, StoreError>;
}

/// The fixed dispatch table.
pub fn handler_table() -> HashMap<&'static str, Arc<dyn MutationHandler>> {
    let mut table: HashMap<&'static str, Arc<dyn MutationHandler>> = HashMap::new();
    table.insert(KIND_GRANT, Arc::new(GrantHandler));
    table.insert(KIND_IDENTITY, Arc::new(IdentityHandler));
    table.insert(KIND_DUMP, Arc::new(DumpHandler));
    table
}

fn decode<T: DeserializeOwned>(body: serde_json::Value) -> Option<T> {
    match serde_json::from_value(body) {
        Ok(request) => Some(request),
        Err(e) => {
            tracing::debug!(error = %e, "undecodable request body");
            None
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Grants
// ─────────────────────────────────────────────────────────────────────────────

/// Handles [`GrantRequest`]s.
pub struct GrantHandler;

#[async_trait]
impl MutationHandler for GrantHandler {
    async fn handle(
        &self,
        store: &dyn GrantStore,
        body: serde_json::Value,
    ) -> Result<Outcome, StoreError> {
        let Some(request) = decode::<GrantRequest>(body) else {
            return Ok(Outcome::rejected(Rejection::Invalid));
        };

        match request {
            GrantRequest::Create { grant, permitted } => {
                if !permitted.allows(&grant.permission) {
                    return Ok(Outcome::rejected(Rejection::Forbidden));
                }
                if validate_grant(&grant).is_err() {
                    return Ok(Outcome::rejected(Rejection::Invalid));
                }

                Ok(match store.insert_grant(&grant).await? {
                    InsertResult::Inserted(id) => {
                        tracing::info!(grant_id = %id, ?grant, "grant created");
                        Outcome::new(AckStatus::Created, Refresh::GRANTS).with_grant(id)
                    }
                    InsertResult::AlreadyExists(id) => {
                        Outcome::new(AckStatus::AlreadyTrue, Refresh::GRANTS).with_grant(id)
                    }
                    InsertResult::Conflict { existing } => {
                        Outcome::rejected(Rejection::Conflict).with_grant(existing)
                    }
                })
            }

            GrantRequest::Update {
                id,
                grant,
                permitted,
            } => {
                if !permitted.allows(&grant.permission) {
                    return Ok(Outcome::rejected(Rejection::Forbidden));
                }
                if let Some(outcome) = check_existing(store, &id, &permitted).await? {
                    return Ok(outcome);
                }
                if validate_grant(&grant).is_err() {
                    return Ok(Outcome::rejected(Rejection::Invalid));
                }

                Ok(match store.update_grant(&id, &grant).await? {
                    UpdateResult::Updated => {
                        tracing::info!(grant_id = %id, ?grant, "grant updated");
                        Outcome::new(AckStatus::Applied, Refresh::GRANTS).with_grant(id)
                    }
                    UpdateResult::NotFound => Outcome::rejected(Rejection::NotFound),
                    UpdateResult::Conflict { existing } => {
                        Outcome::rejected(Rejection::Conflict).with_grant(existing)
                    }
                })
            }

            GrantRequest::Remove { id, permitted } => {
                if let Some(outcome) = check_existing(store, &id, &permitted).await? {
                    return Ok(outcome);
                }

                Ok(match store.remove_grant(&id).await? {
                    Some(_) => {
                        tracing::info!(grant_id = %id, "grant removed");
                        Outcome::new(AckStatus::Applied, Refresh::GRANTS).with_grant(id)
                    }
                    None => Outcome::rejected(Rejection::NotFound),
                })
            }

            GrantRequest::Delete { grant, permitted } => {
                if !permitted.allows(&grant.permission) {
                    return Ok(Outcome::rejected(Rejection::Forbidden));
                }

                Ok(match store.delete_grant(&grant).await? {
                    DeleteResult::Deleted(id) => {
                        tracing::info!(grant_id = %id, ?grant, "grant deleted");
                        Outcome::new(AckStatus::Applied, Refresh::GRANTS).with_grant(id)
                    }
                    DeleteResult::AlreadyAbsent => {
                        Outcome::new(AckStatus::AlreadyTrue, Refresh::GRANTS)
                    }
                })
            }
        }
    }
}

/// Not found, or the caller may not touch the grant as it stands.
async fn check_existing(
    store: &dyn GrantStore,
    id: &GrantId,
    permitted: &Permitted,
) -> Result<Option<Outcome>, StoreError> {
    Ok(match store.get_grant(id).await? {
        None => Some(Outcome::rejected(Rejection::NotFound)),
        Some(existing) if !permitted.allows(&existing.grant.permission) => {
            Some(Outcome::rejected(Rejection::Forbidden))
        }
        Some(_) => None,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Identities
// ─────────────────────────────────────────────────────────────────────────────

/// Handles [`IdentityRequest`]s.
pub struct IdentityHandler;

#[async_trait]
impl MutationHandler for IdentityHandler {
    async fn handle(
        &self,
        store: &dyn GrantStore,
        body: serde_json::Value,
    ) -> Result<Outcome, StoreError> {
        let Some(request) = decode::<IdentityRequest>(body) else {
            return Ok(Outcome::rejected(Rejection::Invalid));
        };

        match request {
            IdentityRequest::Put {
                identity,
                permitted,
            } => {
                if !permitted.allows(&identity.principal) {
                    return Ok(Outcome::rejected(Rejection::Forbidden));
                }
                if validate_identity(&identity).is_err() {
                    return Ok(Outcome::rejected(Rejection::Invalid));
                }

                Ok(match store.put_identity(&identity).await? {
                    IdentityResult::Inserted => {
                        tracing::info!(
                            principal = %identity.principal,
                            kind = %identity.kind,
                            name = %identity.name,
                            "identity added"
                        );
                        Outcome::new(AckStatus::Created, Refresh::IDENTITIES)
                    }
                    IdentityResult::AlreadyExists => {
                        Outcome::new(AckStatus::AlreadyTrue, Refresh::IDENTITIES)
                    }
                    IdentityResult::Conflict => Outcome::rejected(Rejection::Conflict),
                })
            }

            IdentityRequest::Delete {
                principal,
                kind,
                permitted,
            } => {
                if !permitted.allows(&principal) {
                    return Ok(Outcome::rejected(Rejection::Forbidden));
                }
                if store.delete_identity(&principal, &kind).await? {
                    tracing::info!(%principal, %kind, "identity deleted");
                    Ok(Outcome::new(AckStatus::Applied, Refresh::IDENTITIES))
                } else {
                    Ok(Outcome::rejected(Rejection::NotFound))
                }
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Dumps
// ─────────────────────────────────────────────────────────────────────────────

/// Handles [`DumpRequest`]s.
pub struct DumpHandler;

#[async_trait]
impl MutationHandler for DumpHandler {
    async fn handle(
        &self,
        store: &dyn GrantStore,
        body: serde_json::Value,
    ) -> Result<Outcome, StoreError> {
        let Some(DumpRequest {
            dump,
            acl,
            identity,
        }) = decode::<DumpRequest>(body)
        else {
            return Ok(Outcome::rejected(Rejection::Invalid));
        };

        if let Err(e) = validate_dump(&dump) {
            tracing::debug!(error = %e, "invalid dump");
            return Ok(Outcome::rejected(Rejection::Invalid));
        }

        if !dump.identity_principals().iter().all(|p| identity.allows(p)) {
            return Ok(Outcome::rejected(Rejection::Forbidden));
        }

        // Replacing a principal's grants removes its current ones, so those
        // permissions need WriteAcl as well.
        let principals: Vec<_> = dump.grant_principals().into_iter().collect();
        let mut permissions = store.permissions_granted_to(&principals).await?;
        permissions.extend(dump.grant_permissions());
        tracing::debug!(permissions = permissions.len(), "dump needs WriteAcl");

        if !permissions.iter().all(|p| acl.allows(p)) {
            return Ok(Outcome::rejected(Rejection::Forbidden));
        }

        Ok(match store.load_dump(&dump).await? {
            DumpResult::Applied {
                grants_changed,
                identities_added,
            } => {
                tracing::info!(grants_changed, identities_added, "dump loaded");
                Outcome::new(AckStatus::Applied, Refresh::ALL)
            }
            DumpResult::IdentityConflict { kind, name } => {
                tracing::info!(%kind, %name, "dump rejected: identity conflict");
                Outcome::rejected(Rejection::Conflict)
            }
        })
    }
}
