//! Storage abstraction for Lore Keeper.
//!
//! Two traits cover the two halves of the data model: [`EntryStore`] owns
//! the canonical entry records and [`VectorIndex`] owns one vector per
//! entry. The bundled backends ([`sqlite::SqliteStore`],
//! [`memory::MemoryStore`]) implement both; the [`LoreStore`] supertrait
//! is what the sync layer holds.
//!
//! Implementations must be `Send + Sync` to work with async runtimes.
//! Not-found is a normal negative result (`Option`/`bool`), not an error.

pub mod memory;
pub mod sqlite;

use anyhow::Result;
use async_trait::async_trait;
use std::sync::Arc;

use crate::config::Config;
use crate::models::{Entry, EntryPatch, NewEntry};

/// Canonical entry records: CRUD plus category listing.
#[async_trait]
pub trait EntryStore: Send + Sync {
    /// Fetch an entry by its backend-native id.
    async fn get(&self, id: &str) -> Result<Option<Entry>>;

    /// List entries, optionally restricted to one category.
    ///
    /// Order is reverse-chronological by `created_at`, ties broken by id
    /// so results are deterministic within a store instance.
    async fn list(&self, category: Option<&str>) -> Result<Vec<Entry>>;

    /// Distinct category names, lexicographically sorted.
    async fn list_categories(&self) -> Result<Vec<String>>;

    /// Create an entry: assigns a fresh id and sets both timestamps to
    /// the creation instant.
    async fn create(&self, input: NewEntry) -> Result<Entry>;

    /// Insert a fully-formed entry, preserving its id and timestamps.
    /// Migration/bulk-import path; steady-state writes go through
    /// [`create`](EntryStore::create).
    async fn insert(&self, entry: &Entry) -> Result<()>;

    /// Apply a partial update. Returns the merged entry, or `None` when
    /// the id is unknown. `updated_at` is reset regardless of which
    /// fields changed.
    async fn update(&self, id: &str, patch: EntryPatch) -> Result<Option<Entry>>;

    /// Delete an entry. Returns whether anything was removed; deleting
    /// twice never errors, the second call returns `false`.
    async fn delete(&self, id: &str) -> Result<bool>;
}

/// One vector per entry, keyed by entry id.
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Store a vector, replacing any existing vector for this entry.
    async fn upsert(&self, entry_id: &str, vector: &[f32], category: &str) -> Result<()>;

    /// Nearest-neighbor search by decreasing cosine similarity.
    ///
    /// A category filter restricts the candidate set *before* ranking and
    /// truncation, so same-category results beyond a naive post-filter
    /// cutoff are still found.
    async fn search(
        &self,
        query: &[f32],
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, f32)>>;

    /// Remove the vector for an entry; no-op when absent.
    async fn remove(&self, entry_id: &str) -> Result<()>;

    /// Fetch the stored vector for an entry, if one exists.
    async fn get_vector(&self, entry_id: &str) -> Result<Option<Vec<f32>>>;
}

/// The combined backend the sync layer operates on.
pub trait LoreStore: EntryStore + VectorIndex {}

impl<T: EntryStore + VectorIndex> LoreStore for T {}

/// Open the configured backend.
///
/// The sqlite backend runs its idempotent migrations on open, matching
/// the legacy backend's ensure-table semantics.
pub async fn open(config: &Config) -> Result<Arc<dyn LoreStore>> {
    match config.db.backend.as_str() {
        "memory" => Ok(Arc::new(memory::MemoryStore::new())),
        _ => {
            let path = config
                .db
                .path
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("db.path is required for the sqlite backend"))?;
            let pool = crate::db::connect(path).await?;
            crate::migrate::run_migrations(&pool).await?;
            Ok(Arc::new(sqlite::SqliteStore::new(pool)))
        }
    }
}
