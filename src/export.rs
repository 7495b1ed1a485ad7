//! Export the entry set as a markdown tree for the static-site build.
//!
//! Writes one file per entry at `<out_dir>/<category>/<slug>.md` with
//! YAML frontmatter (id, title, category, tags, optional parentId,
//! metadata as inline JSON, timestamps) followed by the raw content body.
//! This is the same on-disk layout the legacy file backend used, so the
//! output of `export` is valid input for `import`.

use anyhow::Result;
use std::collections::BTreeMap;
use std::path::Path;

use crate::models::Entry;
use crate::slug::slugify;
use crate::store::EntryStore;

/// Render an entry's YAML frontmatter block.
///
/// Matches the legacy layout: scalar fields double-quoted, tags as a flow
/// sequence, metadata as a single inline JSON object.
fn frontmatter(entry: &Entry) -> Result<String> {
    let mut lines = vec![
        "---".to_string(),
        format!("id: \"{}\"", entry.id),
        format!("title: \"{}\"", entry.title.replace('"', "\\\"")),
        format!("category: \"{}\"", entry.category),
    ];

    let tags: Vec<String> = entry.tags.iter().map(|t| format!("\"{t}\"")).collect();
    lines.push(format!("tags: [{}]", tags.join(", ")));

    if let Some(parent_id) = &entry.parent_id {
        lines.push(format!("parentId: \"{parent_id}\""));
    }

    lines.push(format!(
        "metadata: {}",
        serde_json::to_string(&entry.metadata)?
    ));
    lines.push(format!("createdAt: \"{}\"", entry.created_at.to_rfc3339()));
    lines.push(format!("updatedAt: \"{}\"", entry.updated_at.to_rfc3339()));
    lines.push("---".to_string());

    Ok(lines.join("\n"))
}

/// Export all entries under `out_dir`, replacing any previous export.
///
/// Returns per-category counts, keyed in sorted order.
pub async fn run_export(
    store: &dyn EntryStore,
    out_dir: &Path,
) -> Result<BTreeMap<String, usize>> {
    // Replace the previous tree wholesale; stale files from renamed or
    // deleted entries must not survive.
    if out_dir.exists() {
        std::fs::remove_dir_all(out_dir)?;
    }
    std::fs::create_dir_all(out_dir)?;

    let mut stats: BTreeMap<String, usize> = BTreeMap::new();

    for category in store.list_categories().await? {
        let entries = store.list(Some(&category)).await?;
        let category_dir = out_dir.join(&category);
        std::fs::create_dir_all(&category_dir)?;

        for entry in &entries {
            let path = category_dir.join(format!("{}.md", slugify(&entry.title)));
            let file = format!("{}\n\n{}", frontmatter(entry)?, entry.content);
            std::fs::write(&path, file)?;
        }

        stats.insert(category, entries.len());
    }

    Ok(stats)
}
