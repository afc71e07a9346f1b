//! SQLite implementation of the GrantStore trait.
//!
//! This is the primary storage backend for the ACL Kernel. It uses
//! rusqlite with bundled SQLite, wrapped in async via tokio::spawn_blocking.

use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Transaction};
use uuid::Uuid;

use acl_kernel_core::{Dump, Grant, GrantId, GrantPattern, Id, Identity, StoredGrant};

use crate::error::{Result, StoreError};
use crate::migration::{self, now_millis};
use crate::traits::{DeleteResult, DumpResult, GrantStore, IdentityResult, InsertResult, UpdateResult};

/// SQLite-based store implementation.
///
/// Thread-safe via internal Mutex. All operations use spawn_blocking
/// to avoid blocking the async runtime.
pub struct SqliteStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteStore {
    /// Open a SQLite database at the given path.
    ///
    /// Creates the file and runs migrations if it doesn't exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let mut conn = Connection::open(path)?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Open an in-memory SQLite database.
    ///
    /// Useful for testing.
    pub fn open_memory() -> Result<Self> {
        let mut conn = Connection::open_in_memory()?;
        migration::migrate(&mut conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a blocking operation on the connection off the async runtime.
    async fn blocking<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();

        tokio::task::spawn_blocking(move || {
            let mut conn = conn.lock().map_err(|e| {
                StoreError::Database(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_LOCKED),
                    Some(format!("mutex poisoned: {}", e)),
                ))
            })?;
            f(&mut conn)
        })
        .await
        .map_err(|e| StoreError::TaskFailed(format!("spawn_blocking failed: {}", e)))?
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Row helpers
// ─────────────────────────────────────────────────────────────────────────────

fn blob_to_uuid(bytes: Vec<u8>, column: usize, name: &str) -> rusqlite::Result<Uuid> {
    let raw: [u8; 16] = bytes.try_into().map_err(|_| {
        rusqlite::Error::InvalidColumnType(column, name.into(), rusqlite::types::Type::Blob)
    })?;
    Ok(Uuid::from_bytes(raw))
}

fn row_to_grant(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredGrant> {
    let id = blob_to_uuid(row.get(0)?, 0, "grant_id")?;
    let principal = blob_to_uuid(row.get(1)?, 1, "principal")?;
    let permission = blob_to_uuid(row.get(2)?, 2, "permission")?;
    let target = blob_to_uuid(row.get(3)?, 3, "target")?;
    let plural: bool = row.get(4)?;

    Ok(StoredGrant {
        id: GrantId(id),
        grant: Grant {
            principal: Id(principal),
            permission: Id(permission),
            target: Id(target),
            plural,
        },
    })
}

fn row_to_identity(row: &rusqlite::Row<'_>) -> rusqlite::Result<Identity> {
    let principal = blob_to_uuid(row.get(0)?, 0, "principal")?;
    Ok(Identity {
        principal: Id(principal),
        kind: row.get(1)?,
        name: row.get(2)?,
    })
}

const GRANT_COLUMNS: &str = "grant_id, principal, permission, target, plural";

fn find_by_key(conn: &Connection, grant: &Grant) -> Result<Option<StoredGrant>> {
    conn.query_row(
        &format!(
            "SELECT {GRANT_COLUMNS} FROM grants
             WHERE principal = ?1 AND permission = ?2 AND target = ?3"
        ),
        params![
            grant.principal.as_bytes().as_slice(),
            grant.permission.as_bytes().as_slice(),
            grant.target.as_bytes().as_slice(),
        ],
        row_to_grant,
    )
    .optional()
    .map_err(StoreError::from)
}

fn insert_grant_tx(conn: &Connection, grant: &Grant) -> Result<InsertResult> {
    if let Some(existing) = find_by_key(conn, grant)? {
        return Ok(if existing.grant == *grant {
            InsertResult::AlreadyExists(existing.id)
        } else {
            InsertResult::Conflict {
                existing: existing.id,
            }
        });
    }

    let id = GrantId::new_v4();
    conn.execute(
        "INSERT INTO grants (grant_id, principal, permission, target, plural, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            id.as_bytes().as_slice(),
            grant.principal.as_bytes().as_slice(),
            grant.permission.as_bytes().as_slice(),
            grant.target.as_bytes().as_slice(),
            grant.plural,
            now_millis(),
        ],
    )?;
    Ok(InsertResult::Inserted(id))
}

fn put_identity_tx(conn: &Connection, identity: &Identity) -> Result<IdentityResult> {
    let existing: Vec<Identity> = conn
        .prepare(
            "SELECT principal, kind, name FROM identities
             WHERE kind = ?1 AND (name = ?2 OR principal = ?3)",
        )?
        .query_map(
            params![
                identity.kind,
                identity.name,
                identity.principal.as_bytes().as_slice()
            ],
            row_to_identity,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    if existing.iter().any(|i| i == identity) {
        return Ok(IdentityResult::AlreadyExists);
    }
    if !existing.is_empty() {
        return Ok(IdentityResult::Conflict);
    }

    conn.execute(
        "INSERT INTO identities (principal, kind, name, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![
            identity.principal.as_bytes().as_slice(),
            identity.kind,
            identity.name,
            now_millis(),
        ],
    )?;
    Ok(IdentityResult::Inserted)
}

fn load_dump_tx(tx: &Transaction<'_>, dump: &Dump) -> Result<DumpResult> {
    let mut identities_added = 0;
    for identity in &dump.identities {
        match put_identity_tx(tx, identity)? {
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

    let keep: HashSet<(Id, Id, Id)> = dump.grants.iter().map(Grant::key).collect();
    let mut grants_changed = 0;

    for principal in dump.grant_principals() {
        let current = tx
            .prepare(&format!(
                "SELECT {GRANT_COLUMNS} FROM grants WHERE principal = ?1"
            ))?
            .query_map(params![principal.as_bytes().as_slice()], row_to_grant)?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        for stored in current {
            if !keep.contains(&stored.grant.key()) {
                tx.execute(
                    "DELETE FROM grants WHERE grant_id = ?1",
                    params![stored.id.as_bytes().as_slice()],
                )?;
                grants_changed += 1;
            }
        }
    }

    for grant in &dump.grants {
        match insert_grant_tx(tx, grant)? {
            InsertResult::Inserted(_) => grants_changed += 1,
            InsertResult::AlreadyExists(_) => {}
            InsertResult::Conflict { existing } => {
                tx.execute(
                    "UPDATE grants SET plural = ?1 WHERE grant_id = ?2",
                    params![grant.plural, existing.as_bytes().as_slice()],
                )?;
                grants_changed += 1;
            }
        }
    }

    Ok(DumpResult::Applied {
        grants_changed,
        identities_added,
    })
}

#[async_trait]
impl GrantStore for SqliteStore {
    // ─────────────────────────────────────────────────────────────────────────
    // Grant Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn insert_grant(&self, grant: &Grant) -> Result<InsertResult> {
        let grant = *grant;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let result = insert_grant_tx(&tx, &grant)?;
            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn get_grant(&self, id: &GrantId) -> Result<Option<StoredGrant>> {
        let id = *id;
        self.blocking(move |conn| {
            conn.query_row(
                &format!("SELECT {GRANT_COLUMNS} FROM grants WHERE grant_id = ?1"),
                params![id.as_bytes().as_slice()],
                row_to_grant,
            )
            .optional()
            .map_err(StoreError::from)
        })
        .await
    }

    async fn list_grants(&self) -> Result<Vec<StoredGrant>> {
        self.find_grants(&GrantPattern::any()).await
    }

    async fn find_grants(&self, pattern: &GrantPattern) -> Result<Vec<StoredGrant>> {
        let pattern = *pattern;
        self.blocking(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {GRANT_COLUMNS} FROM grants
                 WHERE (?1 IS NULL OR principal = ?1)
                   AND (?2 IS NULL OR permission = ?2)
                   AND (?3 IS NULL OR target = ?3)
                   AND (?4 IS NULL OR plural = ?4)
                 ORDER BY principal, permission, target"
            ))?;

            let grants = stmt
                .query_map(
                    params![
                        pattern.principal.map(|id| id.as_bytes().to_vec()),
                        pattern.permission.map(|id| id.as_bytes().to_vec()),
                        pattern.target.map(|id| id.as_bytes().to_vec()),
                        pattern.plural,
                    ],
                    row_to_grant,
                )?
                .collect::<rusqlite::Result<Vec<_>>>()?;

            Ok(grants)
        })
        .await
    }

    async fn update_grant(&self, id: &GrantId, grant: &Grant) -> Result<UpdateResult> {
        let id = *id;
        let grant = *grant;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let exists: bool = tx.query_row(
                "SELECT EXISTS(SELECT 1 FROM grants WHERE grant_id = ?1)",
                params![id.as_bytes().as_slice()],
                |row| row.get(0),
            )?;
            if !exists {
                return Ok(UpdateResult::NotFound);
            }

            if let Some(other) = find_by_key(&tx, &grant)? {
                if other.id != id {
                    return Ok(UpdateResult::Conflict { existing: other.id });
                }
            }

            tx.execute(
                "UPDATE grants SET principal = ?1, permission = ?2, target = ?3, plural = ?4
                 WHERE grant_id = ?5",
                params![
                    grant.principal.as_bytes().as_slice(),
                    grant.permission.as_bytes().as_slice(),
                    grant.target.as_bytes().as_slice(),
                    grant.plural,
                    id.as_bytes().as_slice(),
                ],
            )?;
            tx.commit()?;

            Ok(UpdateResult::Updated)
        })
        .await
    }

    async fn remove_grant(&self, id: &GrantId) -> Result<Option<StoredGrant>> {
        let id = *id;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let existing = tx
                .query_row(
                    &format!("SELECT {GRANT_COLUMNS} FROM grants WHERE grant_id = ?1"),
                    params![id.as_bytes().as_slice()],
                    row_to_grant,
                )
                .optional()?;

            if existing.is_some() {
                tx.execute(
                    "DELETE FROM grants WHERE grant_id = ?1",
                    params![id.as_bytes().as_slice()],
                )?;
                tx.commit()?;
            }

            Ok(existing)
        })
        .await
    }

    async fn delete_grant(&self, grant: &Grant) -> Result<DeleteResult> {
        let grant = *grant;
        self.blocking(move |conn| {
            let tx = conn.transaction()?;

            let Some(existing) = find_by_key(&tx, &grant)? else {
                return Ok(DeleteResult::AlreadyAbsent);
            };

            tx.execute(
                "DELETE FROM grants WHERE grant_id = ?1",
                params![existing.id.as_bytes().as_slice()],
            )?;
            tx.commit()?;

            Ok(DeleteResult::Deleted(existing.id))
        })
        .await
    }

    async fn permissions_granted_to(&self, principals: &[Id]) -> Result<BTreeSet<Id>> {
        let principals = principals.to_vec();
        self.blocking(move |conn| {
            let mut stmt =
                conn.prepare("SELECT DISTINCT permission FROM grants WHERE principal = ?1")?;

            let mut permissions = BTreeSet::new();
            for principal in &principals {
                let rows = stmt
                    .query_map(params![principal.as_bytes().as_slice()], |row| {
                        blob_to_uuid(row.get(0)?, 0, "permission")
                    })?
                    .collect::<rusqlite::Result<Vec<_>>>()?;
                permissions.extend(rows.into_iter().map(Id));
            }

            Ok(permissions)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Identity Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn list_identities(&self) -> Result<Vec<Identity>> {
        self.blocking(|conn| {
            let identities = conn
                .prepare("SELECT principal, kind, name FROM identities ORDER BY kind, name")?
                .query_map([], row_to_identity)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(identities)
        })
        .await
    }

    async fn put_identity(&self, identity: &Identity) -> Result<IdentityResult> {
        let identity = identity.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let result = put_identity_tx(&tx, &identity)?;
            tx.commit()?;
            Ok(result)
        })
        .await
    }

    async fn delete_identity(&self, principal: &Id, kind: &str) -> Result<bool> {
        let principal = *principal;
        let kind = kind.to_string();
        self.blocking(move |conn| {
            let deleted = conn.execute(
                "DELETE FROM identities WHERE principal = ?1 AND kind = ?2",
                params![principal.as_bytes().as_slice(), kind],
            )?;
            Ok(deleted > 0)
        })
        .await
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Bulk Operations
    // ─────────────────────────────────────────────────────────────────────────

    async fn load_dump(&self, dump: &Dump) -> Result<DumpResult> {
        let dump = dump.clone();
        self.blocking(move |conn| {
            let tx = conn.transaction()?;
            let result = load_dump_tx(&tx, &dump)?;

            // Dropping the transaction rolls it back.
            if let DumpResult::Applied { .. } = result {
                tx.commit()?;
            }

            Ok(result)
        })
        .await
    }
}
