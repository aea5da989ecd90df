use crate::core::gate::PermissionGate;
use crate::domain::model::{Group, Subject, User};
use crate::domain::ports::GrantStore;
use crate::utils::error::{PermagateError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubjectKind {
    User,
    Group,
}

async fn require_user<S: GrantStore>(gate: &PermissionGate<S>, username: &str) -> Result<User> {
    gate.store()
        .find_user(username)
        .await?
        .ok_or_else(|| PermagateError::UserNotFound(username.to_string()))
}

async fn require_group<S: GrantStore>(gate: &PermissionGate<S>, name: &str) -> Result<Group> {
    gate.store()
        .find_group(name)
        .await?
        .ok_or_else(|| PermagateError::GroupNotFound(name.to_string()))
}

pub async fn check<S: GrantStore>(
    gate: &PermissionGate<S>,
    username: &str,
    permission: &str,
) -> Result<bool> {
    let user = require_user(gate, username).await?;
    gate.has_permission(user.id, permission).await
}

/// The full permission list, or the effective permissions of one user.
pub async fn list<S: GrantStore>(
    gate: &PermissionGate<S>,
    username: Option<&str>,
) -> Result<Vec<String>> {
    match username {
        Some(username) => {
            let user = require_user(gate, username).await?;
            gate.effective_permissions(user.id).await
        }
        None => Ok(gate.tree().permission_list()),
    }
}

/// Grants a permission, creating the user or group on first use.
pub async fn grant<S: GrantStore>(
    gate: &PermissionGate<S>,
    kind: SubjectKind,
    name: &str,
    permission: &str,
) -> Result<bool> {
    let subject = match kind {
        SubjectKind::User => Subject::User(gate.store().create_user(name).await?.id),
        SubjectKind::Group => Subject::Group(gate.store().create_group(name).await?.id),
    };
    gate.grant(subject, permission).await
}

pub async fn revoke<S: GrantStore>(
    gate: &PermissionGate<S>,
    kind: SubjectKind,
    name: &str,
    permission: &str,
) -> Result<bool> {
    let subject = match kind {
        SubjectKind::User => Subject::User(require_user(gate, name).await?.id),
        SubjectKind::Group => Subject::Group(require_group(gate, name).await?.id),
    };
    gate.revoke(subject, permission).await
}

/// Adds a user to a group, creating either on first use.
pub async fn add_member<S: GrantStore>(
    gate: &PermissionGate<S>,
    group: &str,
    username: &str,
) -> Result<()> {
    let group = gate.store().create_group(group).await?;
    let user = gate.store().create_user(username).await?;
    gate.store().add_member(group.id, user.id).await?;
    tracing::info!("👥 Added {} to group {}", user.username, group.name);
    Ok(())
}

pub async fn remove_member<S: GrantStore>(
    gate: &PermissionGate<S>,
    group: &str,
    username: &str,
) -> Result<bool> {
    let group = require_group(gate, group).await?;
    let user = require_user(gate, username).await?;
    gate.store().remove_member(group.id, user.id).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::MemoryGrantStore;
    use crate::core::permission::{Permission, PermissionTree};

    fn gate() -> PermissionGate<MemoryGrantStore> {
        let root = Permission::root()
            .register(vec![Permission::new("admin")
                .unwrap()
                .register(vec![Permission::new("users").unwrap()])
                .unwrap()])
            .unwrap();
        PermissionGate::new(PermissionTree::new(root).unwrap(), MemoryGrantStore::new())
    }

    #[tokio::test]
    async fn test_check_unknown_user_is_an_error() {
        let gate = gate();
        assert!(matches!(
            check(&gate, "ghost", "admin").await,
            Err(PermagateError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_group_workflow() {
        let gate = gate();
        add_member(&gate, "ops", "dana").await.unwrap();
        assert!(grant(&gate, SubjectKind::Group, "ops", "admin>").await.unwrap());

        assert!(check(&gate, "dana", "admin.users").await.unwrap());
        assert_eq!(
            list(&gate, Some("dana")).await.unwrap(),
            vec!["admin", "admin.users"]
        );

        assert!(remove_member(&gate, "ops", "dana").await.unwrap());
        assert!(!check(&gate, "dana", "admin.users").await.unwrap());
    }

    #[tokio::test]
    async fn test_add_member_creates_missing_subjects() {
        let gate = gate();
        assert!(gate.store().find_group("ops").await.unwrap().is_none());
        assert!(gate.store().find_user("erin").await.unwrap().is_none());

        add_member(&gate, "ops", "erin").await.unwrap();

        let user = gate.store().find_user("erin").await.unwrap().unwrap();
        let groups = gate.store().user_groups(user.id).await.unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].name, "ops");
    }

    #[tokio::test]
    async fn test_revoke_requires_existing_subject() {
        let gate = gate();
        assert!(matches!(
            revoke(&gate, SubjectKind::Group, "nobody", "admin").await,
            Err(PermagateError::GroupNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_without_user_returns_tree() {
        let gate = gate();
        assert_eq!(
            list(&gate, None).await.unwrap(),
            vec!["*", "admin", "admin>", "admin.users"]
        );
    }
}
