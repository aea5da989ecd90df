use crate::utils::error::Result;
use sqlx::PgPool;
use tracing::info;

/// Database schema version
pub const SCHEMA_VERSION: i32 = 1;

/// Drop order respects foreign keys.
const TABLES: [&str; 6] = [
    "permagate_group_permissions",
    "permagate_user_permissions",
    "permagate_group_members",
    "permagate_groups",
    "permagate_users",
    "permagate_schema_version",
];

/// Creates the permagate tables.
///
/// With `keep_schema` the existing tables and rows are preserved between runs; without it
/// every permagate table is dropped first.
pub async fn initialize_schema(pool: &PgPool, keep_schema: bool) -> Result<()> {
    if !keep_schema {
        drop_schema(pool).await?;
    }

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permagate_users (
            id BIGSERIAL PRIMARY KEY,
            username TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permagate_groups (
            id BIGSERIAL PRIMARY KEY,
            name TEXT NOT NULL UNIQUE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permagate_group_members (
            group_id BIGINT NOT NULL REFERENCES permagate_groups(id) ON DELETE CASCADE,
            user_id BIGINT NOT NULL REFERENCES permagate_users(id) ON DELETE CASCADE,
            PRIMARY KEY (group_id, user_id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_permagate_members_user ON permagate_group_members(user_id)",
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permagate_user_permissions (
            id BIGSERIAL PRIMARY KEY,
            user_id BIGINT NOT NULL REFERENCES permagate_users(id) ON DELETE CASCADE,
            permission TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (user_id, permission)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permagate_group_permissions (
            id BIGSERIAL PRIMARY KEY,
            group_id BIGINT NOT NULL REFERENCES permagate_groups(id) ON DELETE CASCADE,
            permission TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            UNIQUE (group_id, permission)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS permagate_schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TIMESTAMPTZ NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "INSERT INTO permagate_schema_version (version, applied_at) VALUES ($1, NOW()) ON CONFLICT DO NOTHING",
    )
    .bind(SCHEMA_VERSION)
    .execute(pool)
    .await?;

    info!("Schema ready (version {}, keep_schema = {})", SCHEMA_VERSION, keep_schema);
    Ok(())
}

pub async fn drop_schema(pool: &PgPool) -> Result<()> {
    for table in TABLES {
        sqlx::query(&format!("DROP TABLE IF EXISTS {} CASCADE", table))
            .execute(pool)
            .await?;
    }
    info!("Dropped permagate tables");
    Ok(())
}

/// Get current schema version
pub async fn get_schema_version(pool: &PgPool) -> Result<Option<i32>> {
    let row = sqlx::query_as::<_, (i32,)>(
        "SELECT version FROM permagate_schema_version ORDER BY version DESC LIMIT 1",
    )
    .fetch_optional(pool)
    .await?;

    Ok(row.map(|(version,)| version))
}
