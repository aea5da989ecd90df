use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub type UserId = i64;
pub type GroupId = i64;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Group {
    pub id: GroupId,
    pub name: String,
}

/// A permission string granted directly to a user.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct UserPermission {
    pub id: i64,
    pub user_id: UserId,
    pub permission: String,
    pub created_at: DateTime<Utc>,
}

/// A permission string granted to every member of a group.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct GroupPermission {
    pub id: i64,
    pub group_id: GroupId,
    pub permission: String,
    pub created_at: DateTime<Utc>,
}

/// Who a grant is attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Subject {
    User(UserId),
    Group(GroupId),
}
