//! Static-site content loader.
//!
//! A pull-based, store-replacing load invoked once at build time: fetch
//! the full entry set, clear the local content store, and re-populate it
//! keyed by a derived slug (`category/normalized-title`). The content
//! store is what a static-site generator iterates when rendering pages.

use anyhow::Result;
use std::collections::BTreeMap;
use tracing::info;

use crate::models::Entry;
use crate::slug::entry_slug;
use crate::store::EntryStore;

/// One renderable page: the entry's fields plus its markdown body,
/// addressed by slug.
#[derive(Debug, Clone)]
pub struct ContentDoc {
    pub slug: String,
    pub entry: Entry,
}

/// Slug-keyed collection of renderable content, replaced wholesale on
/// every load.
#[derive(Debug, Default)]
pub struct ContentStore {
    docs: BTreeMap<String, ContentDoc>,
}

impl ContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.docs.clear();
    }

    pub fn set(&mut self, doc: ContentDoc) {
        self.docs.insert(doc.slug.clone(), doc);
    }

    pub fn get(&self, slug: &str) -> Option<&ContentDoc> {
        self.docs.get(slug)
    }

    pub fn len(&self) -> usize {
        self.docs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ContentDoc> {
        self.docs.values()
    }
}

/// Replace the content store with the current entry set.
///
/// Entries whose titles collide within a category share a slug; the
/// later one (in store order) wins, matching the legacy loader.
pub async fn load_content(store: &dyn EntryStore, content: &mut ContentStore) -> Result<usize> {
    let entries = store.list(None).await?;
    info!(count = entries.len(), "loaded entries for site build");

    content.clear();
    for entry in entries {
        let slug = entry_slug(&entry.category, &entry.title);
        content.set(ContentDoc { slug, entry });
    }

    Ok(content.len())
}
