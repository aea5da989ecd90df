use crate::core::matcher::GrantSet;
use crate::domain::model::{Group, GroupId, GroupPermission, User, UserId, UserPermission};
use crate::utils::error::Result;
use async_trait::async_trait;

/// Persistence of users, groups, memberships and their granted permission strings.
///
/// Grant strings are stored verbatim; validating them against a permission tree is
/// the caller's job (see `PermissionGate::grant_user`).
#[async_trait]
pub trait GrantStore: Send + Sync {
    /// Get-or-create a user by username.
    async fn create_user(&self, username: &str) -> Result<User>;
    /// Get-or-create a group by name.
    async fn create_group(&self, name: &str) -> Result<Group>;

    async fn find_user(&self, username: &str) -> Result<Option<User>>;
    async fn find_group(&self, name: &str) -> Result<Option<Group>>;

    async fn add_member(&self, group: GroupId, user: UserId) -> Result<()>;
    async fn remove_member(&self, group: GroupId, user: UserId) -> Result<bool>;
    async fn user_groups(&self, user: UserId) -> Result<Vec<Group>>;

    async fn user_grants(&self, user: UserId) -> Result<GrantSet>;
    async fn group_grants(&self, group: GroupId) -> Result<GrantSet>;

    /// Returns false when the grant was already present.
    async fn grant_user(&self, user: UserId, permission: &str) -> Result<bool>;
    async fn grant_group(&self, group: GroupId, permission: &str) -> Result<bool>;
    async fn revoke_user(&self, user: UserId, permission: &str) -> Result<bool>;
    async fn revoke_group(&self, group: GroupId, permission: &str) -> Result<bool>;

    async fn list_user_grants(&self, user: UserId) -> Result<Vec<UserPermission>>;
    async fn list_group_grants(&self, group: GroupId) -> Result<Vec<GroupPermission>>;

    /// Whether one of the user's own grants satisfies `permission`.
    ///
    /// Stores that can match in place (e.g. with SQL) should override this.
    async fn user_covers(&self, user: UserId, permission: &str) -> Result<bool> {
        self.user_grants(user).await?.covers(permission)
    }

    /// The first group of the user whose grants satisfy `permission`, if any.
    async fn covering_group(&self, user: UserId, permission: &str) -> Result<Option<Group>> {
        for group in self.user_groups(user).await? {
            if self.group_grants(group.id).await?.covers(permission)? {
                return Ok(Some(group));
            }
        }
        Ok(None)
    }
}
