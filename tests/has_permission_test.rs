use anyhow::Result;
use permagate::{load_permission_root, GrantStore, MemoryGrantStore, PermissionGate};

const FIXTURE: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/test_permissions.toml");

struct Fixture {
    gate: PermissionGate<MemoryGrantStore>,
    user: i64,
    user_two: i64,
    root_user: i64,
}

/// tester (group "test"): test.sub1 directly, test.sub3 through the group
/// tester2: test>
/// root_tester: *
async fn setup() -> Result<Fixture> {
    let tree = load_permission_root(Some(FIXTURE))?;
    let store = MemoryGrantStore::new();

    let group = store.create_group("test").await?;
    let user = store.create_user("tester").await?;
    let user_two = store.create_user("tester2").await?;
    let root_user = store.create_user("root_tester").await?;
    store.add_member(group.id, user.id).await?;

    store.grant_user(user.id, "test.sub1").await?;
    store.grant_group(group.id, "test.sub3").await?;
    store.grant_user(user_two.id, "test>").await?;
    store.grant_user(root_user.id, "*").await?;

    Ok(Fixture {
        gate: PermissionGate::new(tree, store),
        user: user.id,
        user_two: user_two.id,
        root_user: root_user.id,
    })
}

#[tokio::test]
async fn test_user_permissions() -> Result<()> {
    let f = setup().await?;

    assert!(!f.gate.has_permission(f.user, "test").await?);
    assert!(!f.gate.has_permission(f.user, "test2").await?);
    assert!(!f.gate.has_permission(f.user, "test.sub2").await?);

    // direct assignment
    assert!(f.gate.has_permission(f.user, "test.sub1").await?);

    // via group
    assert!(f.gate.has_permission(f.user, "test.sub3").await?);
    Ok(())
}

#[tokio::test]
async fn test_inclusive_wildcard() -> Result<()> {
    let f = setup().await?;

    assert!(f.gate.has_permission(f.user_two, "test").await?);
    assert!(f.gate.has_permission(f.user_two, "test.sub1").await?);
    assert!(f.gate.has_permission(f.user_two, "test.sub2").await?);

    assert!(!f.gate.has_permission(f.user_two, "test2").await?);
    Ok(())
}

#[tokio::test]
async fn test_root_permission() -> Result<()> {
    let f = setup().await?;

    assert!(f.gate.has_permission(f.root_user, "test.sub1").await?);
    assert!(f.gate.has_permission(f.root_user, "test").await?);
    assert!(f.gate.has_permission(f.root_user, "test2").await?);
    assert!(f.gate.has_permission(f.root_user, "*").await?);
    Ok(())
}

#[tokio::test]
async fn test_undefined_permission_is_denied_even_for_root() -> Result<()> {
    let f = setup().await?;

    assert!(!f.gate.has_permission(f.root_user, "test.sub4").await?);
    assert!(!f.gate.has_permission(f.root_user, "nothing").await?);
    Ok(())
}

#[tokio::test]
async fn test_malformed_required_permission_is_an_error() -> Result<()> {
    let f = setup().await?;

    assert!(f.gate.has_permission(f.user, "test>").await.is_err());
    assert!(f.gate.has_permission(f.user, "").await.is_err());
    assert!(f.gate.has_permission(f.user, "test..sub1").await.is_err());
    Ok(())
}

#[tokio::test]
async fn test_effective_permissions() -> Result<()> {
    let f = setup().await?;

    assert_eq!(
        f.gate.effective_permissions(f.user).await?,
        vec!["test.sub1", "test.sub3"]
    );
    assert_eq!(
        f.gate.effective_permissions(f.user_two).await?,
        vec!["test", "test.sub1", "test.sub2", "test.sub3"]
    );
    assert_eq!(
        f.gate.effective_permissions(f.root_user).await?,
        vec!["*", "test", "test.sub1", "test.sub2", "test.sub3", "test2"]
    );
    Ok(())
}
