//! Runs against a real PostgreSQL service when PERMAGATE_DATABASE_URL is set, and is a
//! no-op otherwise.

use anyhow::Result;
use permagate::config::toml_config::DATABASE_URL_ENV;
use permagate::{
    load_permission_root, DatabaseConfig, GrantStore, PermagateError, PermissionGate, PgGrantStore,
};
use std::sync::atomic::{AtomicUsize, Ordering};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_permissions.toml");

static COUNTER: AtomicUsize = AtomicUsize::new(0);

async fn connect() -> Result<Option<PgGrantStore>> {
    let Ok(url) = std::env::var(DATABASE_URL_ENV) else {
        eprintln!("{} not set, skipping PostgreSQL test", DATABASE_URL_ENV);
        return Ok(None);
    };
    let mut config = DatabaseConfig::new(url);
    // tests in this binary share tables, so never drop them here
    config.keep_schema = true;
    Ok(Some(PgGrantStore::connect(&config).await?))
}

/// Names unique to this process and call, so reruns against a kept schema do not collide.
fn unique(name: &str) -> String {
    format!(
        "{}_{}_{}",
        name,
        std::process::id(),
        COUNTER.fetch_add(1, Ordering::SeqCst)
    )
}

#[tokio::test]
async fn test_has_permission_against_postgres() -> Result<()> {
    let Some(store) = connect().await? else {
        return Ok(());
    };

    let group = store.create_group(&unique("test")).await?;
    let user = store.create_user(&unique("tester")).await?;
    let user_two = store.create_user(&unique("tester2")).await?;
    let root_user = store.create_user(&unique("root_tester")).await?;
    store.add_member(group.id, user.id).await?;

    let gate = PermissionGate::new(load_permission_root(Some(FIXTURE))?, store);
    gate.grant_user(user.id, "test.sub1").await?;
    gate.grant_group(group.id, "test.sub3").await?;
    gate.grant_user(user_two.id, "test>").await?;
    gate.grant_user(root_user.id, "*").await?;

    assert!(!gate.has_permission(user.id, "test").await?);
    assert!(!gate.has_permission(user.id, "test2").await?);
    assert!(!gate.has_permission(user.id, "test.sub2").await?);
    assert!(gate.has_permission(user.id, "test.sub1").await?);
    assert!(gate.has_permission(user.id, "test.sub3").await?);

    assert!(gate.has_permission(user_two.id, "test").await?);
    assert!(gate.has_permission(user_two.id, "test.sub2").await?);
    assert!(!gate.has_permission(user_two.id, "test2").await?);

    assert!(gate.has_permission(root_user.id, "test2").await?);
    assert!(!gate.has_permission(root_user.id, "test.sub4").await?);
    Ok(())
}

#[tokio::test]
async fn test_get_or_create_and_uniqueness() -> Result<()> {
    let Some(store) = connect().await? else {
        return Ok(());
    };

    let name = unique("dup");
    let first = store.create_user(&name).await?;
    let second = store.create_user(&name).await?;
    assert_eq!(first, second);
    assert_eq!(store.find_user(&name).await?, Some(first.clone()));

    assert!(store.grant_user(first.id, "test").await?);
    assert!(!store.grant_user(first.id, "test").await?);
    let grants = store.list_user_grants(first.id).await?;
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].permission, "test");

    assert!(store.revoke_user(first.id, "test").await?);
    assert!(store.user_grants(first.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_missing_subjects_are_reported() -> Result<()> {
    let Some(store) = connect().await? else {
        return Ok(());
    };

    assert!(matches!(
        store.grant_user(-1, "test").await,
        Err(PermagateError::UserNotFound(_))
    ));
    let user = store.create_user(&unique("lonely")).await?;
    assert!(matches!(
        store.add_member(-1, user.id).await,
        Err(PermagateError::GroupNotFound(_))
    ));
    assert!(store.user_groups(user.id).await?.is_empty());
    Ok(())
}
