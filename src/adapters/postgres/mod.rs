pub mod schema;

use crate::config::toml_config::DatabaseConfig;
use crate::core::matcher::{candidate_grants, GrantSet};
use crate::domain::model::{Group, GroupId, GroupPermission, User, UserId, UserPermission};
use crate::domain::ports::GrantStore;
use crate::utils::error::{PermagateError, Result};
use crate::utils::validation::redact_password;
use async_trait::async_trait;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{debug, info};

pub use schema::{drop_schema, get_schema_version, initialize_schema, SCHEMA_VERSION};

/// Grant store backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgGrantStore {
    pool: PgPool,
}

impl PgGrantStore {
    /// Connect to the database and initialize the schema
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let shown = url::Url::parse(&config.url)
            .map(|u| redact_password(&u))
            .unwrap_or_else(|_| "<unparsable url>".to_string());
        info!("Connecting to database: {}", shown);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(&config.url)
            .await?;

        schema::initialize_schema(&pool, config.keep_schema).await?;

        info!("Database initialized successfully");

        Ok(Self { pool })
    }

    /// Wraps an existing pool. The schema is assumed to be initialized.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn user_exists(&self, user: UserId) -> Result<bool> {
        let (exists,) =
            sqlx::query_as::<_, (bool,)>("SELECT EXISTS(SELECT 1 FROM permagate_users WHERE id = $1)")
                .bind(user)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn group_exists(&self, group: GroupId) -> Result<bool> {
        let (exists,) =
            sqlx::query_as::<_, (bool,)>("SELECT EXISTS(SELECT 1 FROM permagate_groups WHERE id = $1)")
                .bind(group)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }
}

#[async_trait]
impl GrantStore for PgGrantStore {
    async fn create_user(&self, username: &str) -> Result<User> {
        // DO UPDATE instead of DO NOTHING so RETURNING also yields an existing row
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO permagate_users (username) VALUES ($1)
            ON CONFLICT (username) DO UPDATE SET username = EXCLUDED.username
            RETURNING id, username
            "#,
        )
        .bind(username)
        .fetch_one(&self.pool)
        .await?;

        debug!(user_id = user.id, username, "User ready");
        Ok(user)
    }

    async fn create_group(&self, name: &str) -> Result<Group> {
        let group = sqlx::query_as::<_, Group>(
            r#"
            INSERT INTO permagate_groups (name) VALUES ($1)
            ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
            RETURNING id, name
            "#,
        )
        .bind(name)
        .fetch_one(&self.pool)
        .await?;

        debug!(group_id = group.id, name, "Group ready");
        Ok(group)
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            "SELECT id, username FROM permagate_users WHERE username = $1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn find_group(&self, name: &str) -> Result<Option<Group>> {
        let group =
            sqlx::query_as::<_, Group>("SELECT id, name FROM permagate_groups WHERE name = $1")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;
        Ok(group)
    }

    async fn add_member(&self, group: GroupId, user: UserId) -> Result<()> {
        if !self.group_exists(group).await? {
            return Err(PermagateError::GroupNotFound(group.to_string()));
        }
        if !self.user_exists(user).await? {
            return Err(PermagateError::UserNotFound(user.to_string()));
        }

        sqlx::query(
            "INSERT INTO permagate_group_members (group_id, user_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(group)
        .bind(user)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_member(&self, group: GroupId, user: UserId) -> Result<bool> {
        let result =
            sqlx::query("DELETE FROM permagate_group_members WHERE group_id = $1 AND user_id = $2")
                .bind(group)
                .bind(user)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn user_groups(&self, user: UserId) -> Result<Vec<Group>> {
        let groups = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name
            FROM permagate_groups g
            JOIN permagate_group_members m ON m.group_id = g.id
            WHERE m.user_id = $1
            ORDER BY g.id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(groups)
    }

    async fn user_grants(&self, user: UserId) -> Result<GrantSet> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT permission FROM permagate_user_permissions WHERE user_id = $1",
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(permission,)| permission).collect())
    }

    async fn group_grants(&self, group: GroupId) -> Result<GrantSet> {
        let rows = sqlx::query_as::<_, (String,)>(
            "SELECT permission FROM permagate_group_permissions WHERE group_id = $1",
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(permission,)| permission).collect())
    }

    async fn grant_user(&self, user: UserId, permission: &str) -> Result<bool> {
        if !self.user_exists(user).await? {
            return Err(PermagateError::UserNotFound(user.to_string()));
        }
        let result = sqlx::query(
            r#"
            INSERT INTO permagate_user_permissions (user_id, permission) VALUES ($1, $2)
            ON CONFLICT (user_id, permission) DO NOTHING
            "#,
        )
        .bind(user)
        .bind(permission)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn grant_group(&self, group: GroupId, permission: &str) -> Result<bool> {
        if !self.group_exists(group).await? {
            return Err(PermagateError::GroupNotFound(group.to_string()));
        }
        let result = sqlx::query(
            r#"
            INSERT INTO permagate_group_permissions (group_id, permission) VALUES ($1, $2)
            ON CONFLICT (group_id, permission) DO NOTHING
            "#,
        )
        .bind(group)
        .bind(permission)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_user(&self, user: UserId, permission: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM permagate_user_permissions WHERE user_id = $1 AND permission = $2",
        )
        .bind(user)
        .bind(permission)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn revoke_group(&self, group: GroupId, permission: &str) -> Result<bool> {
        let result = sqlx::query(
            "DELETE FROM permagate_group_permissions WHERE group_id = $1 AND permission = $2",
        )
        .bind(group)
        .bind(permission)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_user_grants(&self, user: UserId) -> Result<Vec<UserPermission>> {
        let grants = sqlx::query_as::<_, UserPermission>(
            r#"
            SELECT id, user_id, permission, created_at
            FROM permagate_user_permissions
            WHERE user_id = $1
            ORDER BY id
            "#,
        )
        .bind(user)
        .fetch_all(&self.pool)
        .await?;
        Ok(grants)
    }

    async fn list_group_grants(&self, group: GroupId) -> Result<Vec<GroupPermission>> {
        let grants = sqlx::query_as::<_, GroupPermission>(
            r#"
            SELECT id, group_id, permission, created_at
            FROM permagate_group_permissions
            WHERE group_id = $1
            ORDER BY id
            "#,
        )
        .bind(group)
        .fetch_all(&self.pool)
        .await?;
        Ok(grants)
    }

    async fn user_covers(&self, user: UserId, permission: &str) -> Result<bool> {
        let candidates = candidate_grants(permission)?;
        let (found,) = sqlx::query_as::<_, (bool,)>(
            r#"
            SELECT EXISTS(
                SELECT 1 FROM permagate_user_permissions
                WHERE user_id = $1 AND permission = ANY($2)
            )
            "#,
        )
        .bind(user)
        .bind(candidates)
        .fetch_one(&self.pool)
        .await?;
        Ok(found)
    }

    async fn covering_group(&self, user: UserId, permission: &str) -> Result<Option<Group>> {
        let candidates = candidate_grants(permission)?;
        let group = sqlx::query_as::<_, Group>(
            r#"
            SELECT g.id, g.name
            FROM permagate_groups g
            JOIN permagate_group_members m ON m.group_id = g.id
            JOIN permagate_group_permissions p ON p.group_id = g.id
            WHERE m.user_id = $1 AND p.permission = ANY($2)
            ORDER BY g.id
            LIMIT 1
            "#,
        )
        .bind(user)
        .bind(candidates)
        .fetch_optional(&self.pool)
        .await?;
        Ok(group)
    }
}
