//! Bulk dump import.

use std::sync::Arc;

use acl_kernel::core::{Dump, Grant, Id, Identity, Perm, Special};
use acl_kernel::store::{GrantStore, SqliteStore};
use acl_kernel::{AckStatus, AuthConfig, AuthError, Authorizer, Rejection};
use acl_kernel_testkit::{init_tracing, TestFixture};

fn json_dump(principal: Id, permission: Id, target: Id) -> String {
    serde_json::json!({
        "version": 1,
        "grants": [
            { "principal": principal, "permission": permission, "target": Special::SELF },
            { "principal": principal, "permission": permission, "target": target, "plural": true },
        ],
        "identities": [
            { "principal": principal, "kind": "kerberos", "name": "edge@REALM" },
        ],
    })
    .to_string()
}

#[tokio::test]
async fn test_import_json_dump() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let edge = fixture.anonymous_principal();
    let perm = fixture.permission();
    let device = Id::new_v4();
    let devices = fixture.group(&[device]);
    let auth = fixture.authorizer().await;

    let dump = Dump::from_json(&json_dump(edge, perm, devices))?;
    let ack = auth.import_dump(dump).await?;
    assert_eq!(ack.status, AckStatus::Applied);

    assert_eq!(auth.resolve("edge@REALM").await, Some(edge));
    assert!(auth.check("edge@REALM", perm, edge, false).await);
    assert!(auth.check("edge@REALM", perm, device, false).await);
    Ok(())
}

#[tokio::test]
async fn test_import_cbor_dump() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let edge = fixture.anonymous_principal();
    let perm = fixture.permission();
    let auth = fixture.authorizer().await;

    let bytes = Dump::new()
        .with_grant(Grant::new(edge, perm, Special::SELF))
        .with_identity(Identity::kerberos(edge, "edge@REALM"))
        .to_cbor()?;
    let ack = auth.import_dump(Dump::from_cbor(&bytes)?).await?;

    assert_eq!(ack.status, AckStatus::Applied);
    assert!(auth.check("edge@REALM", perm, edge, false).await);
    Ok(())
}

#[tokio::test]
async fn test_dump_replaces_grant_sets_of_named_principals() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let bob = fixture.principal("bob@REALM").await;
    let (old, new) = (fixture.permission(), fixture.permission());
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::new(alice, old, Special::SELF)).await?;
    auth.add_grant(Grant::new(bob, old, Special::SELF)).await?;

    let dump = Dump::new().with_grant(Grant::new(alice, new, Special::SELF));
    assert_eq!(auth.import_dump(dump).await?.status, AckStatus::Applied);

    assert!(!auth.check("alice@REALM", old, alice, false).await);
    assert!(auth.check("alice@REALM", new, alice, false).await);
    assert!(auth.check("bob@REALM", old, bob, false).await);
    Ok(())
}

#[tokio::test]
async fn test_invalid_dumps_are_refused_before_dispatch() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let perm = fixture.permission();
    let auth = fixture.authorizer().await;

    assert!(Dump::from_json(r#"{"version": 1, "groups": []}"#).is_err());
    assert!(Dump::from_json(r#"{"version": 2}"#).is_err());

    let mut dump = Dump::new().with_grant(Grant::new(Id::new_v4(), perm, Special::SELF));
    dump.version = 2;
    assert!(matches!(
        auth.import_dump(dump).await,
        Err(AuthError::Validation(_))
    ));

    let dump = Dump::new()
        .with_grant(Grant::new(Id::new_v4(), perm, Special::SELF))
        .with_grant(Grant::new(Id::new_v4(), perm, Special::MINE));
    assert!(matches!(
        auth.import_dump(dump).await,
        Err(AuthError::Validation(_))
    ));
    assert!(auth.list_grants().await.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_identity_conflict_rolls_back_dump() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    fixture.principal("alice@REALM").await;
    let perm = fixture.permission();
    let intruder = fixture.anonymous_principal();
    let auth = fixture.authorizer().await;

    let dump = Dump::new()
        .with_grant(Grant::new(intruder, perm, Special::SELF))
        .with_identity(Identity::kerberos(intruder, "alice@REALM"));
    let ack = auth.import_dump(dump).await?;

    assert_eq!(ack.status, AckStatus::Rejected(Rejection::Conflict));
    assert!(auth.list_grants().await.is_empty());
    assert_ne!(auth.resolve("alice@REALM").await, Some(intruder));
    Ok(())
}

#[tokio::test]
async fn test_gated_import_needs_rights_on_replaced_permissions() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let admin = fixture.principal("admin@REALM").await;
    let edge = fixture.anonymous_principal();
    let (old, new) = (fixture.permission(), fixture.permission());
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::new(edge, old, Special::SELF)).await?;
    auth.add_grant(Grant::new(admin, Perm::WRITE_ACL, new)).await?;
    auth.add_grant(Grant::new(admin, Perm::WRITE_IDENTITY, edge)).await?;

    let dump = Dump::new()
        .with_grant(Grant::new(edge, new, Special::SELF))
        .with_identity(Identity::kerberos(edge, "edge@REALM"));

    // Loading would drop edge's grant on `old`
    let ack = auth.import_dump_as("admin@REALM", dump.clone()).await?;
    assert_eq!(ack.status, AckStatus::Rejected(Rejection::Forbidden));

    auth.add_grant(Grant::new(admin, Perm::WRITE_ACL, old)).await?;
    let ack = auth.import_dump_as("admin@REALM", dump.clone()).await?;
    assert_eq!(ack.status, AckStatus::Applied);

    // Without WriteIdentity on the identity principal
    let stranger = fixture.anonymous_principal();
    let dump = Dump::new().with_identity(Identity::kerberos(stranger, "stranger@REALM"));
    let ack = auth.import_dump_as("admin@REALM", dump).await?;
    assert_eq!(ack.status, AckStatus::Rejected(Rejection::Forbidden));
    Ok(())
}

#[tokio::test]
async fn test_sqlite_state_survives_restart() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("acl.db");
    let fixture = TestFixture::new();
    let edge = fixture.anonymous_principal();
    let perm = fixture.permission();

    {
        let store = Arc::new(SqliteStore::open(&path)?);
        let auth = Authorizer::start(AuthConfig::default(), store, fixture.index.clone()).await?;
        let dump = Dump::from_json(&json_dump(edge, perm, Id::new_v4()))?;
        assert_eq!(auth.import_dump(dump).await?.status, AckStatus::Applied);
    }

    let store = Arc::new(SqliteStore::open(&path)?);
    assert_eq!(store.list_grants().await?.len(), 2);
    assert_eq!(store.list_identities().await?.len(), 1);

    let auth = Authorizer::start(AuthConfig::default(), store, fixture.index.clone()).await?;
    assert!(auth.check("edge@REALM", perm, edge, false).await);
    Ok(())
}
