use anyhow::Result;
use sqlx::SqlitePool;

/// Create the schema if it does not exist. Idempotent; safe to run on
/// every connection, which mirrors the legacy backend's ensure-table
/// behavior.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS entries (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            category TEXT NOT NULL,
            tags_json TEXT NOT NULL DEFAULT '[]',
            parent_id TEXT,
            metadata_json TEXT NOT NULL DEFAULT '{}',
            created_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // One vector per entry; category is denormalized so search can filter
    // without a join.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embeddings (
            entry_id TEXT PRIMARY KEY,
            category TEXT NOT NULL,
            vector BLOB NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_category ON entries(category)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_entries_created_at ON entries(created_at DESC)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_embeddings_category ON embeddings(category)")
        .execute(pool)
        .await?;

    Ok(())
}
