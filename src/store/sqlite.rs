//! SQLite-backed [`EntryStore`] and [`VectorIndex`] implementation.
//!
//! Entries live in the `entries` table with tags and metadata stored as
//! JSON text columns; vectors live in `embeddings` as little-endian f32
//! BLOBs with a denormalized category column. Vector search is
//! brute-force cosine similarity computed in Rust, which is adequate at
//! this system's scale.

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Entry, EntryPatch, Metadata, NewEntry};

use super::{EntryStore, VectorIndex};

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

    async fn write_entry(&self, entry: &Entry) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO entries (id, title, content, category, tags_json,
                                 parent_id, metadata_json, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                content = excluded.content,
                category = excluded.category,
                tags_json = excluded.tags_json,
                parent_id = excluded.parent_id,
                metadata_json = excluded.metadata_json,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(&entry.id)
        .bind(&entry.title)
        .bind(&entry.content)
        .bind(&entry.category)
        .bind(serde_json::to_string(&entry.tags)?)
        .bind(&entry.parent_id)
        .bind(serde_json::to_string(&entry.metadata)?)
        .bind(entry.created_at.timestamp_millis())
        .bind(entry.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn ts_from_millis(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_default()
}

fn row_to_entry(row: &sqlx::sqlite::SqliteRow) -> Entry {
    let tags_json: String = row.get("tags_json");
    let metadata_json: String = row.get("metadata_json");
    let created_at: i64 = row.get("created_at");
    let updated_at: i64 = row.get("updated_at");

    let tags: Vec<String> = serde_json::from_str(&tags_json).unwrap_or_default();
    let metadata: Metadata = serde_json::from_str(&metadata_json).unwrap_or_default();

    Entry {
        id: row.get("id"),
        title: row.get("title"),
        content: row.get("content"),
        category: row.get("category"),
        tags,
        parent_id: row.get("parent_id"),
        metadata,
        created_at: ts_from_millis(created_at),
        updated_at: ts_from_millis(updated_at),
    }
}

const ENTRY_COLUMNS: &str =
    "id, title, content, category, tags_json, parent_id, metadata_json, created_at, updated_at";

#[async_trait]
impl EntryStore for SqliteStore {
    async fn get(&self, id: &str) -> Result<Option<Entry>> {
        let row = sqlx::query(&format!("SELECT {ENTRY_COLUMNS} FROM entries WHERE id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.as_ref().map(row_to_entry))
    }

    async fn list(&self, category: Option<&str>) -> Result<Vec<Entry>> {
        let rows = match category {
            Some(cat) => {
                sqlx::query(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries WHERE category = ? \
                     ORDER BY created_at DESC, id ASC"
                ))
                .bind(cat)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query(&format!(
                    "SELECT {ENTRY_COLUMNS} FROM entries ORDER BY created_at DESC, id ASC"
                ))
                .fetch_all(&self.pool)
                .await?
            }
        };
        Ok(rows.iter().map(row_to_entry).collect())
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let rows = sqlx::query("SELECT DISTINCT category FROM entries ORDER BY category ASC")
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(|r| r.get("category")).collect())
    }

    async fn create(&self, input: NewEntry) -> Result<Entry> {
        let now = Utc::now();
        let entry = Entry {
            id: Uuid::new_v4().to_string(),
            title: input.title,
            content: input.content,
            category: input.category,
            tags: input.tags,
            parent_id: input.parent_id,
            metadata: input.metadata,
            created_at: now,
            updated_at: now,
        };
        self.write_entry(&entry).await?;
        Ok(entry)
    }

    async fn insert(&self, entry: &Entry) -> Result<()> {
        self.write_entry(entry).await
    }

    async fn update(&self, id: &str, patch: EntryPatch) -> Result<Option<Entry>> {
        let Some(mut entry) = self.get(id).await? else {
            return Ok(None);
        };

        if let Some(title) = patch.title {
            entry.title = title;
        }
        if let Some(content) = patch.content {
            entry.content = content;
        }
        if let Some(category) = patch.category {
            entry.category = category;
        }
        if let Some(tags) = patch.tags {
            entry.tags = tags;
        }
        if let Some(parent_id) = patch.parent_id {
            entry.parent_id = Some(parent_id);
        }
        if let Some(metadata) = patch.metadata {
            entry.metadata = metadata;
        }
        entry.updated_at = Utc::now();

        self.write_entry(&entry).await?;
        Ok(Some(entry))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM entries WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl VectorIndex for SqliteStore {
    async fn upsert(&self, entry_id: &str, vector: &[f32], category: &str) -> Result<()> {
        let blob = vec_to_blob(vector);
        sqlx::query(
            r#"
            INSERT INTO embeddings (entry_id, category, vector)
            VALUES (?, ?, ?)
            ON CONFLICT(entry_id) DO UPDATE SET
                category = excluded.category,
                vector = excluded.vector
            "#,
        )
        .bind(entry_id)
        .bind(category)
        .bind(&blob)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, f32)>> {
        // The category filter narrows candidates in SQL, before ranking.
        let rows = match category {
            Some(cat) => {
                sqlx::query("SELECT entry_id, vector FROM embeddings WHERE category = ?")
                    .bind(cat)
                    .fetch_all(&self.pool)
                    .await?
            }
            None => {
                sqlx::query("SELECT entry_id, vector FROM embeddings")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        let mut hits: Vec<(String, f32)> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("vector");
                let vec = blob_to_vec(&blob);
                let id: String = row.get("entry_id");
                (id, cosine_similarity(query, &vec))
            })
            .collect();

        hits.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        hits.truncate(limit);
        Ok(hits)
    }

    async fn remove(&self, entry_id: &str) -> Result<()> {
        sqlx::query("DELETE FROM embeddings WHERE entry_id = ?")
            .bind(entry_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_vector(&self, entry_id: &str) -> Result<Option<Vec<f32>>> {
        let row = sqlx::query("SELECT vector FROM embeddings WHERE entry_id = ?")
            .bind(entry_id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| {
            let blob: Vec<u8> = r.get("vector");
            blob_to_vec(&blob)
        }))
    }
}
