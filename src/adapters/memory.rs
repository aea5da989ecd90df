use crate::core::matcher::GrantSet;
use crate::domain::model::{Group, GroupId, GroupPermission, User, UserId, UserPermission};
use crate::domain::ports::GrantStore;
use crate::utils::error::{PermagateError, Result};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::{BTreeSet, HashMap};
use tokio::sync::RwLock;

#[derive(Debug, Default)]
struct State {
    next_id: i64,
    users: HashMap<UserId, User>,
    groups: HashMap<GroupId, Group>,
    memberships: BTreeSet<(GroupId, UserId)>,
    user_permissions: Vec<UserPermission>,
    group_permissions: Vec<GroupPermission>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// In-process grant store for tests and for embedding without a database.
#[derive(Debug, Default)]
pub struct MemoryGrantStore {
    state: RwLock<State>,
}

impl MemoryGrantStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl GrantStore for MemoryGrantStore {
    async fn create_user(&self, username: &str) -> Result<User> {
        let mut state = self.state.write().await;
        if let Some(user) = state.users.values().find(|u| u.username == username) {
            return Ok(user.clone());
        }
        let user = User {
            id: state.next_id(),
            username: username.to_string(),
        };
        state.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn create_group(&self, name: &str) -> Result<Group> {
        let mut state = self.state.write().await;
        if let Some(group) = state.groups.values().find(|g| g.name == name) {
            return Ok(group.clone());
        }
        let group = Group {
            id: state.next_id(),
            name: name.to_string(),
        };
        state.groups.insert(group.id, group.clone());
        Ok(group)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let state = self.state.read().await;
        Ok(state.users.values().find(|u| u.username == username).cloned())
    }

    async fn find_group(&self, name: &str) -> Result<Option<Group>> {
        let state = self.state.read().await;
        Ok(state.groups.values().find(|g| g.name == name).cloned())
    }

    async fn add_member(&self, group: GroupId, user: UserId) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(&group) {
            return Err(PermagateError::GroupNotFound(group.to_string()));
        }
        if !state.users.contains_key(&user) {
            return Err(PermagateError::UserNotFound(user.to_string()));
        }
        state.memberships.insert((group, user));
        Ok(())
    }

    async fn remove_member(&self, group: GroupId, user: UserId) -> Result<bool> {
        Ok(self.state.write().await.memberships.remove(&(group, user)))
    }

    async fn user_groups(&self, user: UserId) -> Result<Vec<Group>> {
        let state = self.state.read().await;
        Ok(state
            .memberships
            .iter()
            .filter(|(_, member)| *member == user)
            .filter_map(|(group, _)| state.groups.get(group).cloned())
            .collect())
    }

    async fn user_grants(&self, user: UserId) -> Result<GrantSet> {
        let state = self.state.read().await;
        Ok(state
            .user_permissions
            .iter()
            .filter(|p| p.user_id == user)
            .map(|p| p.permission.clone())
            .collect())
    }

    async fn group_grants(&self, group: GroupId) -> Result<GrantSet> {
        let state = self.state.read().await;
        Ok(state
            .group_permissions
            .iter()
            .filter(|p| p.group_id == group)
            .map(|p| p.permission.clone())
            .collect())
    }

    async fn grant_user(&self, user: UserId, permission: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.users.contains_key(&user) {
            return Err(PermagateError::UserNotFound(user.to_string()));
        }
        if state
            .user_permissions
            .iter()
            .any(|p| p.user_id == user && p.permission == permission)
        {
            return Ok(false);
        }
        let id = state.next_id();
        state.user_permissions.push(UserPermission {
            id,
            user_id: user,
            permission: permission.to_string(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn grant_group(&self, group: GroupId, permission: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        if !state.groups.contains_key(&group) {
            return Err(PermagateError::GroupNotFound(group.to_string()));
        }
        if state
            .group_permissions
            .iter()
            .any(|p| p.group_id == group && p.permission == permission)
        {
            return Ok(false);
        }
        let id = state.next_id();
        state.group_permissions.push(GroupPermission {
            id,
            group_id: group,
            permission: permission.to_string(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn revoke_user(&self, user: UserId, permission: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.user_permissions.len();
        state
            .user_permissions
            .retain(|p| !(p.user_id == user && p.permission == permission));
        Ok(state.user_permissions.len() != before)
    }

    async fn revoke_group(&self, group: GroupId, permission: &str) -> Result<bool> {
        let mut state = self.state.write().await;
        let before = state.group_permissions.len();
        state
            .group_permissions
            .retain(|p| !(p.group_id == group && p.permission == permission));
        Ok(state.group_permissions.len() != before)
    }

    async fn list_user_grants(&self, user: UserId) -> Result<Vec<UserPermission>> {
        let state = self.state.read().await;
        Ok(state
            .user_permissions
            .iter()
            .filter(|p| p.user_id == user)
            .cloned()
            .collect())
    }

    async fn list_group_grants(&self, group: GroupId) -> Result<Vec<GroupPermission>> {
        let state = self.state.read().await;
        Ok(state
            .group_permissions
            .iter()
            .filter(|p| p.group_id == group)
            .cloned()
            .collect())
    }
}
