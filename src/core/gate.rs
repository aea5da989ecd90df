use crate::core::matcher::candidate_grants;
use crate::core::permission::{PermissionTree, INCLUSIVE_WILDCARD};
use crate::domain::model::{GroupId, Subject, UserId};
use crate::domain::ports::GrantStore;
use crate::utils::error::{PermagateError, Result};
use std::sync::Arc;

/// Answers "does this user hold this permission?" against a permission tree and a grant store.
pub struct PermissionGate<S: GrantStore> {
    tree: Arc<PermissionTree>,
    store: S,
}

impl<S: GrantStore> PermissionGate<S> {
    pub fn new(tree: impl Into<Arc<PermissionTree>>, store: S) -> Self {
        Self {
            tree: tree.into(),
            store,
        }
    }

    pub fn tree(&self) -> &PermissionTree {
        &self.tree
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Verifies that a user holds a permission directly or through one of its groups.
    ///
    /// Permissions that the tree does not define are never granted, not even to holders
    /// of the root permission.
    pub async fn has_permission(&self, user: UserId, permission: &str) -> Result<bool> {
        // validates the required string before touching the store
        candidate_grants(permission)?;

        if !self.tree.exists(permission)? {
            tracing::warn!("Checking for permission {} that does not exist", permission);
            return Ok(false);
        }

        if self.store.user_covers(user, permission).await? {
            tracing::debug!(user, permission, "Granted by user permission");
            return Ok(true);
        }

        if let Some(group) = self.store.covering_group(user, permission).await? {
            tracing::debug!(user, permission, group = %group.name, "Granted by group permission");
            return Ok(true);
        }

        tracing::debug!(user, permission, "Permission denied");
        Ok(false)
    }

    /// Every concrete permission in the tree that the user holds, in tree order.
    pub async fn effective_permissions(&self, user: UserId) -> Result<Vec<String>> {
        let mut grant_sets = vec![self.store.user_grants(user).await?];
        for group in self.store.user_groups(user).await? {
            grant_sets.push(self.store.group_grants(group.id).await?);
        }

        let mut effective = Vec::new();
        for permission in self.tree.permission_list() {
            if permission.ends_with(INCLUSIVE_WILDCARD) {
                continue;
            }
            let mut held = false;
            for grants in &grant_sets {
                if grants.covers(&permission)? {
                    held = true;
                    break;
                }
            }
            if held {
                effective.push(permission);
            }
        }
        Ok(effective)
    }

    /// Grants a permission string, which may end with an inclusive wildcard.
    /// Returns false if the subject already held that exact grant.
    pub async fn grant(&self, subject: Subject, permission: &str) -> Result<bool> {
        self.ensure_defined(permission)?;
        let created = match subject {
            Subject::User(user) => self.store.grant_user(user, permission).await?,
            Subject::Group(group) => self.store.grant_group(group, permission).await?,
        };
        if created {
            tracing::info!("🔑 Granted {} to {:?}", permission, subject);
        }
        Ok(created)
    }

    pub async fn revoke(&self, subject: Subject, permission: &str) -> Result<bool> {
        let removed = match subject {
            Subject::User(user) => self.store.revoke_user(user, permission).await?,
            Subject::Group(group) => self.store.revoke_group(group, permission).await?,
        };
        if removed {
            tracing::info!("🗑️ Revoked {} from {:?}", permission, subject);
        }
        Ok(removed)
    }

    pub async fn grant_user(&self, user: UserId, permission: &str) -> Result<bool> {
        self.grant(Subject::User(user), permission).await
    }

    pub async fn grant_group(&self, group: GroupId, permission: &str) -> Result<bool> {
        self.grant(Subject::Group(group), permission).await
    }

    pub async fn revoke_user(&self, user: UserId, permission: &str) -> Result<bool> {
        self.revoke(Subject::User(user), permission).await
    }

    pub async fn revoke_group(&self, group: GroupId, permission: &str) -> Result<bool> {
        self.revoke(Subject::Group(group), permission).await
    }

    fn ensure_defined(&self, permission: &str) -> Result<()> {
        if self.tree.exists(permission)? {
            Ok(())
        } else {
            Err(PermagateError::UnknownPermission {
                permission: permission.to_string(),
            })
        }
    }
}
