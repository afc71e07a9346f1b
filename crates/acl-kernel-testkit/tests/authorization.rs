//! Permission checks through the Authorizer.

use acl_kernel::core::{Grant, Id, Perm, Special};
use acl_kernel::{AuthConfig, AuthError, Permitted};
use acl_kernel_testkit::{generation, init_tracing, wait_for_generation, TestFixture};

#[tokio::test]
async fn test_unknown_principal_fails_closed() -> anyhow::Result<()> {
    init_tracing();
    let fixture = TestFixture::new();
    let perm = fixture.permission();
    let auth = fixture.authorizer().await;

    // No identity at all
    assert_eq!(auth.permitted("nobody@REALM", perm, true).await, Permitted::None);
    assert!(!auth.check("nobody@REALM", perm, Id::new_v4(), true).await);

    // An id that is not a member of the Principal class
    let stranger = Id::new_v4();
    auth.add_grant(Grant::new(stranger, perm, Special::WILDCARD))
        .await?;
    let name = format!("uuid:{}", stranger);
    assert_eq!(auth.permitted(&name, perm, true).await, Permitted::None);

    assert!(matches!(
        auth.effective_acl("nobody@REALM").await,
        Err(AuthError::UnknownPrincipal(_))
    ));
    Ok(())
}

#[tokio::test]
async fn test_no_permission_is_distinct_from_empty_predicate() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let (read, write) = (fixture.permission(), fixture.permission());
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::new(alice, read, Id::from_u128(7))).await?;

    let acl = auth.effective_acl("alice@REALM").await?;
    assert_eq!(acl.len(), 1);

    assert!(auth.permitted("alice@REALM", write, false).await.is_none());
    let permitted = auth.permitted("alice@REALM", read, false).await;
    assert!(!permitted.is_none());
    assert!(permitted.allows(&Id::from_u128(7)));
    assert!(!permitted.allows(&Id::from_u128(8)));
    Ok(())
}

#[tokio::test]
async fn test_known_principal_without_grants_has_empty_acl() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    fixture.principal("idle@REALM").await;
    let auth = fixture.authorizer().await;

    let acl = auth.effective_acl("idle@REALM").await?;
    assert!(acl.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_wildcard_requires_opt_in() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let perm = fixture.permission();
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::new(alice, perm, Special::WILDCARD)).await?;
    let target = Id::new_v4();

    assert!(auth.check("alice@REALM", perm, target, true).await);
    assert!(!auth.check("alice@REALM", perm, target, false).await);

    // Without opt-in the wildcard is an ordinary target
    assert!(auth.check("alice@REALM", perm, Special::WILDCARD, false).await);
    assert!(auth.permitted("alice@REALM", perm, true).await.is_all());
    Ok(())
}

#[tokio::test]
async fn test_null_target_grant_is_global() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let perm = fixture.permission();
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::new(alice, perm, Special::NULL)).await?;
    let target = Id::new_v4();

    assert!(auth.check("alice@REALM", perm, target, true).await);
    assert!(!auth.check("alice@REALM", perm, target, false).await);
    assert!(auth.check("alice@REALM", perm, Special::NULL, false).await);
    Ok(())
}

#[tokio::test]
async fn test_self_target_is_the_principal() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let bob = fixture.principal("bob@REALM").await;
    let perm = fixture.permission();
    let everyone = fixture.group(&[alice, bob]);
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::new(everyone, perm, Special::SELF)).await?;

    assert!(auth.check("alice@REALM", perm, alice, false).await);
    assert!(!auth.check("alice@REALM", perm, bob, false).await);
    assert!(auth.check("bob@REALM", perm, bob, false).await);
    assert!(!auth.check("bob@REALM", perm, Special::SELF, false).await);
    Ok(())
}

#[tokio::test]
async fn test_principal_group_grants_apply_transitively() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let perm = fixture.permission();
    let team = fixture.group(&[alice]);
    let department = fixture.group(&[team]);
    let target = Id::new_v4();
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::new(department, perm, target)).await?;
    assert!(auth.check("alice@REALM", perm, target, false).await);
    Ok(())
}

#[tokio::test]
async fn test_plural_expansion_follows_live_membership() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let perm = fixture.permission();
    let (t1, t2) = (Id::new_v4(), Id::new_v4());
    let devices = fixture.group(&[t1]);
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::plural(alice, perm, devices)).await?;
    assert!(auth.check("alice@REALM", perm, t1, false).await);
    assert!(!auth.check("alice@REALM", perm, t2, false).await);
    assert!(!auth.check("alice@REALM", perm, devices, false).await);

    let before = generation(auth.cache());
    fixture.index.add_member(devices, t2);
    let before = wait_for_generation(auth.cache(), before).await;
    assert!(auth.check("alice@REALM", perm, t2, false).await);

    fixture.index.remove_member(devices, &t1);
    wait_for_generation(auth.cache(), before).await;
    assert!(!auth.check("alice@REALM", perm, t1, false).await);
    Ok(())
}

#[tokio::test]
async fn test_permission_group_expands_to_leaf_permissions() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let (read, write) = (fixture.permission(), fixture.permission());
    let not_a_permission = Id::new_v4();
    let manage = fixture.group(&[read, write, not_a_permission]);
    let empty = fixture.group(&[]);
    let target = Id::new_v4();
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::new(alice, manage, target)).await?;
    auth.add_grant(Grant::new(alice, empty, target)).await?;

    assert!(auth.check("alice@REALM", read, target, false).await);
    assert!(auth.check("alice@REALM", write, target, false).await);
    assert!(!auth.check("alice@REALM", manage, target, false).await);

    let acl = auth.effective_acl("alice@REALM").await?;
    assert_eq!(acl.len(), 2);
    assert!(acl.entries().iter().all(|e| e.permission != not_a_permission));
    Ok(())
}

#[tokio::test]
async fn test_mine_expands_to_owned_objects() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let alice = fixture.principal("alice@REALM").await;
    let bob = fixture.principal("bob@REALM").await;
    let perm = fixture.permission();
    let everyone = fixture.group(&[alice, bob]);
    let (thing, other) = (Id::new_v4(), Id::new_v4());
    fixture.index.set_owner(thing, alice);
    fixture.index.set_owner(other, bob);
    let auth = fixture.authorizer().await;

    auth.add_grant(Grant::plural(everyone, perm, Special::MINE)).await?;
    assert!(auth.check("alice@REALM", perm, thing, false).await);
    assert!(!auth.check("alice@REALM", perm, other, false).await);

    let before = generation(auth.cache());
    fixture.index.set_owner(other, Special::UNOWNED);
    wait_for_generation(auth.cache(), before).await;
    assert!(!auth.check("bob@REALM", perm, other, false).await);
    Ok(())
}

#[tokio::test]
async fn test_root_bypasses_evaluation() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let perm = fixture.permission();
    let config = AuthConfig {
        root_principal: Some("admin@REALM".into()),
        ..AuthConfig::default()
    };
    let auth = fixture.authorizer_with(config).await;

    // Root has no identity and no grants
    assert!(auth.permitted("admin@REALM", perm, false).await.is_all());
    assert!(auth.check("admin@REALM", Perm::WRITE_ACL, Id::new_v4(), false).await);
    assert!(auth.effective_acl("admin@REALM").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_bootstrap_acl_answers_for_listed_names() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let svc = fixture.principal("svc@REALM").await;
    let perm = fixture.permission();
    let target = Id::new_v4();
    let config = AuthConfig {
        bootstrap: format!("svc@REALM:{}:{}\nsvc@REALM:ReadACL:Wildcard\n", perm, target),
        ..AuthConfig::default()
    };
    let auth = fixture.authorizer_with(config).await;

    // A stored grant for the same principal is not consulted
    let other = Id::new_v4();
    auth.add_grant(Grant::new(svc, perm, other)).await?;

    assert!(auth.check("svc@REALM", perm, target, false).await);
    assert!(!auth.check("svc@REALM", perm, other, false).await);
    assert!(auth.permitted("svc@REALM", Perm::READ_ACL, true).await.is_all());
    Ok(())
}

#[tokio::test]
async fn test_invalid_bootstrap_stops_startup() {
    let fixture = TestFixture::new();
    let config = AuthConfig {
        bootstrap: "svc@REALM:ReadACL".into(),
        ..AuthConfig::default()
    };
    let result = acl_kernel::Authorizer::start(config, fixture.store.clone(), fixture.index.clone()).await;
    assert!(matches!(result, Err(AuthError::Eval(_))));
}

#[tokio::test]
async fn test_startup_fails_when_group_index_is_down() {
    let fixture = TestFixture::new();
    fixture.index.set_available(false);
    let result = acl_kernel::Authorizer::start(
        AuthConfig::default(),
        fixture.store.clone(),
        fixture.index.clone(),
    )
    .await;
    assert!(matches!(result, Err(AuthError::GroupIndex(_))));
}

#[tokio::test]
async fn test_other_identity_kinds_resolve() -> anyhow::Result<()> {
    let fixture = TestFixture::new();
    let node = fixture.anonymous_principal();
    let perm = fixture.permission();
    let auth = fixture.authorizer().await;

    let ack = auth
        .put_identity(acl_kernel::Identity::new(node, "sparkplug", "Group/Node"))
        .await?;
    assert!(ack.status.is_success());
    auth.add_grant(Grant::new(node, perm, Special::SELF)).await?;

    assert_eq!(auth.resolve("sparkplug:Group/Node").await, Some(node));
    assert!(auth.check("sparkplug:Group/Node", perm, node, false).await);
    assert!(auth.check(&format!("uuid:{}", node), perm, node, false).await);
    Ok(())
}
