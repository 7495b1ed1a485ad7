//! The sync layer: keeps the vector index consistent with the record
//! store and reconciles entry identity across the backend migration.
//!
//! Invariant maintained here: a vector exists for an entry if and only if
//! the entry was created or last updated with non-empty embeddable text
//! (title + content). Vectors are never mutated in place — the underlying
//! index may not support partial updates, so every text change is a
//! remove followed by an upsert.
//!
//! There are no cross-call transactions. The remove-then-upsert pair on
//! update and the remove-then-delete pair on deletion are independent
//! calls; a crash in between can leave an orphan vector or briefly a
//! stale one. Both states are recoverable and accepted.

use std::sync::Arc;

use tracing::{info, warn};

use crate::embedding::Embedder;
use crate::error::{LoreError, Result};
use crate::models::{Entry, EntryPatch, Metadata, NewEntry, SearchHit};
use crate::store::{EntryStore, LoreStore, VectorIndex};

/// Metadata key under which the legacy content-addressed id is preserved
/// when an entry crosses the storage-backend migration.
pub const LEGACY_ID_KEY: &str = "oldId";

/// Default number of search results when the caller does not say.
pub const DEFAULT_SEARCH_LIMIT: usize = 10;

/// An entry carried over from the legacy file backend, with its original
/// timestamps and identifier intact.
#[derive(Debug, Clone)]
pub struct ImportedEntry {
    pub legacy_id: Option<String>,
    pub title: String,
    pub content: String,
    pub category: String,
    pub tags: Vec<String>,
    pub parent_id: Option<String>,
    pub metadata: Metadata,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

/// Entry operations with embedding synchronization.
pub struct LoreSync {
    store: Arc<dyn LoreStore>,
    embedder: Arc<dyn Embedder>,
}

/// Text fed to the embedding model for an entry: title and content joined
/// by a blank line, for better semantic matching than either alone.
/// `None` when both are blank — such entries carry no vector.
fn embeddable_text(title: &str, content: &str) -> Option<String> {
    if title.trim().is_empty() && content.trim().is_empty() {
        return None;
    }
    Some(format!("{}\n\n{}", title, content))
}

impl LoreSync {
    pub fn new(store: Arc<dyn LoreStore>, embedder: Arc<dyn Embedder>) -> Self {
        Self { store, embedder }
    }

    pub fn store(&self) -> &Arc<dyn LoreStore> {
        &self.store
    }

    /// Create an entry and index its vector.
    ///
    /// The record write comes first. If embedding or indexing fails
    /// afterwards, the created entry is kept and the failure is reported
    /// as [`LoreError::IndexSync`] carrying the new id — content is never
    /// lost because the embedding backend is unavailable.
    pub async fn create_entry(&self, input: NewEntry) -> Result<Entry> {
        validate_new_entry(&input)?;

        let entry = self.store.create(input).await?;
        info!(id = %entry.id, category = %entry.category, "created entry");

        if let Some(text) = embeddable_text(&entry.title, &entry.content) {
            self.index_entry(&entry, &text).await?;
        }

        Ok(entry)
    }

    /// Apply a partial update and re-index when the text changed.
    ///
    /// When title or content is among the updated fields, a fresh vector
    /// is computed from the merged post-update text *before* the old one
    /// is removed; a failed embedding leaves the prior vector in place,
    /// so the entry stays searchable (stale, not invisible). When
    /// neither changed the existing vector is left untouched — no
    /// recompute, no remove. The denormalized category on the vector is
    /// the post-update one.
    pub async fn update_entry(&self, id: &str, patch: EntryPatch) -> Result<Option<Entry>> {
        let text_changed = patch.changes_embeddable_text();

        let Some(entry) = self.store.update(id, patch).await? else {
            return Ok(None);
        };
        info!(id = %entry.id, text_changed, "updated entry");

        if text_changed {
            match embeddable_text(&entry.title, &entry.content) {
                Some(text) => {
                    let vector =
                        self.embedder
                            .embed(&text)
                            .await
                            .map_err(|e| LoreError::IndexSync {
                                entry_id: id.to_string(),
                                source: e.into(),
                            })?;
                    self.store
                        .remove(id)
                        .await
                        .map_err(|source| LoreError::IndexSync {
                            entry_id: id.to_string(),
                            source,
                        })?;
                    self.store
                        .upsert(id, &vector, &entry.category)
                        .await
                        .map_err(|source| LoreError::IndexSync {
                            entry_id: id.to_string(),
                            source,
                        })?;
                }
                None => {
                    // Text was blanked out; the invariant says no vector.
                    self.store
                        .remove(id)
                        .await
                        .map_err(|source| LoreError::IndexSync {
                            entry_id: id.to_string(),
                            source,
                        })?;
                }
            }
        }

        Ok(Some(entry))
    }

    /// Delete an entry and its vector.
    ///
    /// The vector is removed strictly before the record: an interruption
    /// between the two calls may leak an orphan vector, but never leaves
    /// a live index entry pointing at a deleted record.
    pub async fn delete_entry(&self, id: &str) -> Result<bool> {
        self.store.remove(id).await?;
        let deleted = self.store.delete(id).await?;
        info!(id, deleted, "deleted entry");
        Ok(deleted)
    }

    /// Semantic search: embed the query, rank vectors, join back to the
    /// entries. Hits whose entry has vanished in between are dropped.
    pub async fn search(
        &self,
        query: &str,
        category: Option<&str>,
        limit: Option<usize>,
    ) -> Result<Vec<SearchHit>> {
        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT);
        let query_vec = self.embedder.embed(query).await?;
        let hits = self.store.search(&query_vec, category, limit).await?;

        let mut results = Vec::with_capacity(hits.len());
        for (entry_id, score) in hits {
            if let Some(entry) = self.store.get(&entry_id).await? {
                results.push(SearchHit { entry, score });
            }
        }
        Ok(results)
    }

    /// Resolve an identifier that may predate the backend migration.
    ///
    /// Resolution order: backend-native id, then a full scan matching
    /// `metadata["oldId"]`, then exact title equality, then not found.
    ///
    /// This is a migration-only path: the fallback chain is O(n) over all
    /// entries and must not become a steady-state lookup. Steady-state
    /// code uses [`EntryStore::get`](crate::store::EntryStore::get).
    pub async fn resolve_identity(&self, external_id: &str) -> Result<Option<Entry>> {
        // (a) backend-native id; a failed lookup falls through to the scan.
        match self.store.get(external_id).await {
            Ok(Some(entry)) => return Ok(Some(entry)),
            Ok(None) => {}
            Err(err) => {
                warn!(external_id, %err, "native id lookup failed, falling back to scan");
            }
        }

        let all = self.store.list(None).await?;

        // (b) legacy content-addressed id preserved in metadata.
        if let Some(entry) = all.iter().find(|e| {
            e.metadata
                .get(LEGACY_ID_KEY)
                .and_then(|v| v.as_str())
                .is_some_and(|old| old == external_id)
        }) {
            return Ok(Some(entry.clone()));
        }

        // (c) title as a last-resort match key.
        Ok(all.iter().find(|e| e.title == external_id).cloned())
    }

    /// Bulk import for migration from the legacy file backend.
    ///
    /// Embeddings are generated in one batch up front, so an embedding
    /// failure aborts the import before any writes. Each item is then
    /// reconciled through [`resolve_identity`](Self::resolve_identity):
    /// an item whose legacy id resolves to an existing entry updates it
    /// in place; anything else becomes a new entry with the legacy id
    /// preserved under `metadata["oldId"]`.
    pub async fn bulk_import(&self, items: Vec<ImportedEntry>) -> Result<Vec<Entry>> {
        let texts: Vec<Option<String>> = items
            .iter()
            .map(|i| embeddable_text(&i.title, &i.content))
            .collect();
        let to_embed: Vec<String> = texts.iter().flatten().cloned().collect();

        let mut vectors = if to_embed.is_empty() {
            Vec::new()
        } else {
            self.embedder.embed_batch(&to_embed).await?
        }
        .into_iter();

        let mut imported = Vec::with_capacity(items.len());

        for (item, text) in items.into_iter().zip(texts) {
            let vector = text.and_then(|_| vectors.next());

            let existing = match &item.legacy_id {
                Some(legacy) => self.resolve_identity(legacy).await?,
                None => None,
            };

            let entry = match existing {
                Some(prior) => {
                    let mut entry = prior;
                    entry.title = item.title;
                    entry.content = item.content;
                    entry.category = item.category;
                    entry.tags = item.tags;
                    entry.parent_id = item.parent_id;
                    entry.metadata = item.metadata;
                    // The incoming metadata replaces the stored bag, so the
                    // legacy id must be carried back in or a later rerun
                    // loses the reconciliation key and duplicates the entry.
                    if let Some(legacy) = &item.legacy_id {
                        entry
                            .metadata
                            .entry(LEGACY_ID_KEY.to_string())
                            .or_insert_with(|| serde_json::Value::String(legacy.clone()));
                    }
                    entry.updated_at = chrono::Utc::now();
                    self.store.insert(&entry).await?;
                    entry
                }
                None => {
                    let mut metadata = item.metadata;
                    if let Some(legacy) = &item.legacy_id {
                        metadata.insert(
                            LEGACY_ID_KEY.to_string(),
                            serde_json::Value::String(legacy.clone()),
                        );
                    }
                    let entry = Entry {
                        id: uuid::Uuid::new_v4().to_string(),
                        title: item.title,
                        content: item.content,
                        category: item.category,
                        tags: item.tags,
                        parent_id: item.parent_id,
                        metadata,
                        created_at: item.created_at,
                        updated_at: item.updated_at,
                    };
                    self.store.insert(&entry).await?;
                    entry
                }
            };

            if let Some(vector) = vector {
                self.store
                    .upsert(&entry.id, &vector, &entry.category)
                    .await
                    .map_err(|source| LoreError::IndexSync {
                        entry_id: entry.id.clone(),
                        source,
                    })?;
            }

            imported.push(entry);
        }

        info!(count = imported.len(), "bulk import complete");
        Ok(imported)
    }

    async fn index_entry(&self, entry: &Entry, text: &str) -> Result<()> {
        let vector = self
            .embedder
            .embed(text)
            .await
            .map_err(|e| LoreError::IndexSync {
                entry_id: entry.id.clone(),
                source: e.into(),
            })?;

        self.store
            .upsert(&entry.id, &vector, &entry.category)
            .await
            .map_err(|source| LoreError::IndexSync {
                entry_id: entry.id.clone(),
                source,
            })
    }
}

fn validate_new_entry(input: &NewEntry) -> Result<()> {
    for (field, value) in [
        ("title", &input.title),
        ("content", &input.content),
        ("category", &input.category),
    ] {
        if value.trim().is_empty() {
            return Err(LoreError::Validation(format!(
                "{field} is required and must be non-empty"
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddable_text_joins_title_and_content() {
        assert_eq!(
            embeddable_text("Gloomfang", "A shadow cat.").as_deref(),
            Some("Gloomfang\n\nA shadow cat.")
        );
    }

    #[test]
    fn embeddable_text_empty_when_both_blank() {
        assert!(embeddable_text("", "").is_none());
        assert!(embeddable_text("  ", "\n").is_none());
        assert!(embeddable_text("only title", "").is_some());
        assert!(embeddable_text("", "only content").is_some());
    }

    #[test]
    fn validation_rejects_blank_required_fields() {
        let input = NewEntry {
            title: "t".into(),
            content: "".into(),
            category: "c".into(),
            ..Default::default()
        };
        assert!(matches!(
            validate_new_entry(&input),
            Err(LoreError::Validation(_))
        ));

        let ok = NewEntry {
            title: "t".into(),
            content: "b".into(),
            category: "c".into(),
            ..Default::default()
        };
        assert!(validate_new_entry(&ok).is_ok());
    }
}
