//! Core data models used throughout Lore Keeper.
//!
//! These types represent the lore entries, creation/update inputs, and
//! search results that flow through the store, sync layer, and HTTP API.
//! Field names serialize in camelCase to stay wire-compatible with the
//! legacy backend's exports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Open key/value bag attached to each entry. No structural constraints
/// beyond JSON-serializability.
pub type Metadata = serde_json::Map<String, serde_json::Value>;

/// A single lore entry — the canonical unit of content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    /// Backend-assigned identifier, immutable after creation.
    pub id: String,
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Free-form category, used for filtering.
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Optional reference to another entry's id. Untyped hierarchy: no
    /// cycle checking, no referential integrity.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Entry {
    pub fn summary(&self) -> EntrySummary {
        EntrySummary {
            id: self.id.clone(),
            title: self.title.clone(),
            category: self.category.clone(),
            tags: self.tags.clone(),
        }
    }
}

/// Input for creating a new entry. Identity and timestamps are assigned
/// by the store.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewEntry {
    pub title: String,
    pub content: String,
    pub category: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub metadata: Metadata,
}

/// Partial update. Only fields present change; the rest keep their prior
/// values. `updated_at` is reset on every update regardless of which
/// fields are supplied.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPatch {
    pub title: Option<String>,
    pub content: Option<String>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub parent_id: Option<String>,
    pub metadata: Option<Metadata>,
}

impl EntryPatch {
    /// True when the update touches text that affects the entry's meaning,
    /// i.e. the stored vector must be regenerated.
    pub fn changes_embeddable_text(&self) -> bool {
        self.title.is_some() || self.content.is_some()
    }
}

/// Compact projection returned by list endpoints when the full body is
/// not requested.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntrySummary {
    pub id: String,
    pub title: String,
    pub category: String,
    pub tags: Vec<String>,
}

/// A search hit: the matched entry plus its cosine similarity to the
/// query (higher is closer).
#[derive(Debug, Clone, Serialize)]
pub struct SearchHit {
    pub entry: Entry,
    pub score: f32,
}
