//! SQLite-backed [`SummaryStore`] implementation.
//!
//! Maps each [`SummaryStore`] operation onto the `summaries` table created
//! by [`crate::migrate`].

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use rulesheet_core::models::{CreatedBy, NewSummary, SummaryPatch, SummaryRecord};
use rulesheet_core::store::{filename_matches, SummaryStore};

const SELECT_COLUMNS: &str = "SELECT id, game_title, original_filename, source_filenames, markdown, bgg_link, \
     created_at, created_by_uid, created_by_name, created_by_email FROM summaries";

/// SQLite implementation of the [`SummaryStore`] trait.
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

fn row_to_record(row: &SqliteRow) -> Result<SummaryRecord> {
    let created_ms: i64 = row.try_get("created_at")?;
    let created_at = DateTime::from_timestamp_millis(created_ms)
        .ok_or_else(|| anyhow!("invalid created_at timestamp: {}", created_ms))?;
    let uid: Option<String> = row.try_get("created_by_uid")?;
    let source_filenames: String = row.try_get("source_filenames")?;

    Ok(SummaryRecord {
        id: row.try_get("id")?,
        game_title: row.try_get("game_title")?,
        original_filename: row.try_get("original_filename")?,
        source_filenames: serde_json::from_str(&source_filenames)?,
        markdown: row.try_get("markdown")?,
        bgg_link: row.try_get("bgg_link")?,
        created_at,
        created_by: match uid {
            Some(uid) => Some(CreatedBy {
                uid,
                name: row.try_get("created_by_name")?,
                email: row.try_get("created_by_email")?,
            }),
            None => None,
        },
    })
}

/// Current time truncated to the millisecond precision stored on disk.
fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

#[async_trait]
impl SummaryStore for SqliteStore {
    async fn insert(&self, summary: NewSummary) -> Result<SummaryRecord> {
        let record = summary.into_record(now_millis());
        let created_by = record.created_by.as_ref();
        let source_filenames = serde_json::to_string(&record.source_filenames)?;

        sqlx::query(
            r#"
            INSERT INTO summaries (id, game_title, original_filename, source_filenames,
                                   markdown, bgg_link, created_at,
                                   created_by_uid, created_by_name, created_by_email)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.id)
        .bind(&record.game_title)
        .bind(&record.original_filename)
        .bind(&source_filenames)
        .bind(&record.markdown)
        .bind(&record.bgg_link)
        .bind(record.created_at.timestamp_millis())
        .bind(created_by.map(|c| c.uid.as_str()))
        .bind(created_by.and_then(|c| c.name.as_deref()))
        .bind(created_by.and_then(|c| c.email.as_deref()))
        .execute(&self.pool)
        .await?;

        Ok(record)
    }

    async fn get(&self, id: &str) -> Result<Option<SummaryRecord>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_record).transpose()
    }

    async fn list(&self) -> Result<Vec<SummaryRecord>> {
        let rows = sqlx::query(&format!(
            "{} ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn find_by_filename(&self, name: &str) -> Result<Vec<SummaryRecord>> {
        // SQLite's LIKE and lower() only fold ASCII, so the comparison is
        // done with the shared rule instead of in SQL.
        Ok(self
            .list()
            .await?
            .into_iter()
            .filter(|r| filename_matches(r, name))
            .collect())
    }

    async fn find_by_link(&self, link: &str) -> Result<Vec<SummaryRecord>> {
        let rows = sqlx::query(&format!(
            "{} WHERE bgg_link = ? ORDER BY created_at DESC, rowid DESC",
            SELECT_COLUMNS
        ))
        .bind(link)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_record).collect()
    }

    async fn update(&self, id: &str, patch: &SummaryPatch) -> Result<bool> {
        let (set_link, link) = match &patch.bgg_link {
            Some(link) => (true, link.clone()),
            None => (false, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE summaries SET
                game_title = COALESCE(?, game_title),
                markdown = COALESCE(?, markdown),
                bgg_link = CASE WHEN ? THEN ? ELSE bgg_link END
            WHERE id = ?
            "#,
        )
        .bind(&patch.game_title)
        .bind(&patch.markdown)
        .bind(set_link)
        .bind(link)
        .bind(id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM summaries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
