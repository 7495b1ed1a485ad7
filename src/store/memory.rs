//! In-memory backend for tests and the static-site loader path.
//!
//! `HashMap`s behind `std::sync::RwLock`; vector search is brute-force
//! cosine similarity over all stored vectors.

use std::collections::HashMap;
use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::embedding::cosine_similarity;
use crate::models::{Entry, EntryPatch, NewEntry};

use super::{EntryStore, VectorIndex};

struct StoredVector {
    vector: Vec<f32>,
    category: String,
}

/// In-memory store implementing both [`EntryStore`] and [`VectorIndex`].
pub struct MemoryStore {
    entries: RwLock<HashMap<String, Entry>>,
    vectors: RwLock<HashMap<String, StoredVector>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            vectors: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntryStore for MemoryStore {
    async fn get(&self, id: &str) -> Result<Option<Entry>> {
        let entries = self.entries.read().unwrap();
        Ok(entries.get(id).cloned())
    }

    async fn list(&self, category: Option<&str>) -> Result<Vec<Entry>> {
        let entries = self.entries.read().unwrap();
        let mut result: Vec<Entry> = entries
            .values()
            .filter(|e| category.is_none_or(|c| e.category == c))
            .cloned()
            .collect();
        result.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(result)
    }

    async fn list_categories(&self) -> Result<Vec<String>> {
        let entries = self.entries.read().unwrap();
        let mut categories: Vec<String> = entries
            .values()
            .map(|e| e.category.clone())
            .collect::<std::collections::BTreeSet<_>>()
            .into_iter()
            .collect();
        categories.sort();
        Ok(categories)
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
        self.entries
            .write()
            .unwrap()
            .insert(entry.id.clone(), entry.clone());
        Ok(entry)
    }

    async fn insert(&self, entry: &Entry) -> Result<()> {
        self.entries
            .write()
            .unwrap()
            .insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn update(&self, id: &str, patch: EntryPatch) -> Result<Option<Entry>> {
        let mut entries = self.entries.write().unwrap();
        let Some(entry) = entries.get_mut(id) else {
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

        Ok(Some(entry.clone()))
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.entries.write().unwrap().remove(id).is_some())
    }
}

#[async_trait]
impl VectorIndex for MemoryStore {
    async fn upsert(&self, entry_id: &str, vector: &[f32], category: &str) -> Result<()> {
        self.vectors.write().unwrap().insert(
            entry_id.to_string(),
            StoredVector {
                vector: vector.to_vec(),
                category: category.to_string(),
            },
        );
        Ok(())
    }

    async fn search(
        &self,
        query: &[f32],
        category: Option<&str>,
        limit: usize,
    ) -> Result<Vec<(String, f32)>> {
        let vectors = self.vectors.read().unwrap();
        // Category filter narrows candidates before ranking.
        let mut hits: Vec<(String, f32)> = vectors
            .iter()
            .filter(|(_, sv)| category.is_none_or(|c| sv.category == c))
            .map(|(id, sv)| (id.clone(), cosine_similarity(query, &sv.vector)))
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
        self.vectors.write().unwrap().remove(entry_id);
        Ok(())
    }

    async fn get_vector(&self, entry_id: &str) -> Result<Option<Vec<f32>>> {
        let vectors = self.vectors.read().unwrap();
        Ok(vectors.get(entry_id).map(|sv| sv.vector.clone()))
    }
}
