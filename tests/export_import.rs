//! Round-trip between the markdown export tree and the legacy-tree
//! importer, exercising slug layout, frontmatter, and identity carry-over.

use std::sync::Arc;

use async_trait::async_trait;

use lore_keeper::embedding::Embedder;
use lore_keeper::error::EmbeddingError;
use lore_keeper::models::NewEntry;
use lore_keeper::store::memory::MemoryStore;
use lore_keeper::store::{EntryStore, LoreStore};
use lore_keeper::sync::LoreSync;
use lore_keeper::{export, import};

struct ConstEmbedder;

#[async_trait]
impl Embedder for ConstEmbedder {
    fn model_name(&self) -> &str {
        "const-stub"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        Ok(vec![text.len() as f32, 1.0])
    }
}

fn fresh_sync() -> (Arc<dyn LoreStore>, LoreSync) {
    let store: Arc<dyn LoreStore> = Arc::new(MemoryStore::new());
    let sync = LoreSync::new(store.clone(), Arc::new(ConstEmbedder));
    (store, sync)
}

#[tokio::test]
async fn export_writes_slugged_tree() {
    let (store, sync) = fresh_sync();
    sync.create_entry(NewEntry {
        title: "The Gloomfang Serpent!".to_string(),
        content: "A venomous cave serpent.".to_string(),
        category: "bestiary".to_string(),
        tags: vec!["predator".to_string()],
        ..Default::default()
    })
    .await
    .unwrap();
    sync.create_entry(NewEntry {
        title: "Glowmoss".to_string(),
        content: "A glowing moss.".to_string(),
        category: "flora".to_string(),
        ..Default::default()
    })
    .await
    .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("content");
    let stats = export::run_export(store.as_ref(), &out).await.unwrap();

    assert_eq!(stats.get("bestiary"), Some(&1));
    assert_eq!(stats.get("flora"), Some(&1));

    let serpent = out.join("bestiary/the-gloomfang-serpent.md");
    assert!(serpent.is_file());
    let raw = std::fs::read_to_string(&serpent).unwrap();
    assert!(raw.starts_with("---\n"));
    assert!(raw.contains("title: \"The Gloomfang Serpent!\""));
    assert!(raw.contains("category: \"bestiary\""));
    assert!(raw.ends_with("A venomous cave serpent."));
}

#[tokio::test]
async fn export_replaces_previous_tree() {
    let (store, sync) = fresh_sync();
    let entry = sync
        .create_entry(NewEntry {
            title: "Glowmoss".to_string(),
            content: "A glowing moss.".to_string(),
            category: "flora".to_string(),
            ..Default::default()
        })
        .await
        .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("content");
    export::run_export(store.as_ref(), &out).await.unwrap();
    assert!(out.join("flora/glowmoss.md").is_file());

    // Delete the entry; a re-export must not leave the stale file behind.
    sync.delete_entry(&entry.id).await.unwrap();
    export::run_export(store.as_ref(), &out).await.unwrap();
    assert!(!out.join("flora/glowmoss.md").exists());
}

#[tokio::test]
async fn round_trip_preserves_entries_and_identity() {
    let (source_store, source_sync) = fresh_sync();
    let original = source_sync
        .create_entry(NewEntry {
            title: "Gloomfang".to_string(),
            content: "A shadow cat.".to_string(),
            category: "bestiary".to_string(),
            tags: vec!["predator".to_string(), "cave".to_string()],
            ..Default::default()
        })
        .await
        .unwrap();

    let tmp = tempfile::tempdir().unwrap();
    let out = tmp.path().join("content");
    export::run_export(source_store.as_ref(), &out)
        .await
        .unwrap();

    // Import into a fresh store, as a migration would.
    let (target_store, target_sync) = fresh_sync();
    let count = import::run_import(&target_sync, &out).await.unwrap();
    assert_eq!(count, 1);

    let migrated = &target_store.list(None).await.unwrap()[0];
    assert_eq!(migrated.title, "Gloomfang");
    assert_eq!(migrated.content, "A shadow cat.");
    assert_eq!(migrated.tags, vec!["predator", "cave"]);
    // The exporting store's id travels along as the legacy id.
    assert_eq!(
        migrated.metadata.get("oldId").and_then(|v| v.as_str()),
        Some(original.id.as_str())
    );

    // A second import of the same tree updates in place.
    let count = import::run_import(&target_sync, &out).await.unwrap();
    assert_eq!(count, 1);
    assert_eq!(target_store.list(None).await.unwrap().len(), 1);
}
