use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the database file and schema. Safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

/// Apply the schema to an open pool.
pub async fn migrate_pool(pool: &SqlitePool) -> Result<()> {
    // created_at is milliseconds since the Unix epoch; source_filenames is a
    // JSON array, original_filename only its display join
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            id TEXT PRIMARY KEY,
            game_title TEXT NOT NULL,
            original_filename TEXT NOT NULL,
            source_filenames TEXT NOT NULL DEFAULT '[]',
            markdown TEXT NOT NULL,
            bgg_link TEXT,
            created_at INTEGER NOT NULL,
            created_by_uid TEXT,
            created_by_name TEXT,
            created_by_email TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    let source_filenames_columns: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM pragma_table_info('summaries') WHERE name = 'source_filenames'",
    )
    .fetch_one(pool)
    .await?;
    if source_filenames_columns == 0 {
        sqlx::query(
            "ALTER TABLE summaries ADD COLUMN source_filenames TEXT NOT NULL DEFAULT '[]'",
        )
        .execute(pool)
        .await?;
    }

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_summaries_created_at ON summaries(created_at DESC)",
    )
    .execute(pool)
    .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_summaries_bgg_link ON summaries(bgg_link)")
        .execute(pool)
        .await?;

    Ok(())
}
