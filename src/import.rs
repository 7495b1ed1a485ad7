//! Import the legacy file backend's markdown tree.
//!
//! Walks `<dir>/<category>/<slug>.md` files, parses the YAML frontmatter,
//! and hands the batch to [`sync::LoreSync::bulk_import`] for identity
//! reconciliation and indexing. The legacy backend normalized empty tag
//! lists to a single `"untagged"` sentinel; that sentinel is folded back
//! to an empty list here.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::Path;
use walkdir::WalkDir;

use crate::models::Metadata;
use crate::sync::{ImportedEntry, LoreSync};

/// Frontmatter as written by the legacy backend and by `export`.
/// `metadata` accepts both inline-JSON and block-YAML mappings.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Frontmatter {
    #[serde(default)]
    id: Option<String>,
    title: String,
    category: String,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    parent_id: Option<String>,
    #[serde(default)]
    metadata: Metadata,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    updated_at: Option<String>,
}

/// Split a markdown file into its frontmatter block and body.
fn split_frontmatter(raw: &str) -> Option<(&str, &str)> {
    let rest = raw.strip_prefix("---\n")?;
    let end = rest.find("\n---")?;
    let fm = &rest[..end];
    let body = rest[end + 4..].trim_start_matches('\n');
    Some((fm, body))
}

fn parse_timestamp(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(Utc::now)
}

/// Parse one legacy markdown file into an [`ImportedEntry`].
fn parse_file(path: &Path) -> Result<ImportedEntry> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;

    let (fm_raw, body) = split_frontmatter(&raw)
        .with_context(|| format!("{} has no frontmatter block", path.display()))?;

    let fm: Frontmatter = serde_yaml::from_str(fm_raw)
        .with_context(|| format!("invalid frontmatter in {}", path.display()))?;

    let tags = if fm.tags == ["untagged"] {
        Vec::new()
    } else {
        fm.tags
    };

    Ok(ImportedEntry {
        legacy_id: fm.id,
        title: fm.title,
        content: body.trim_end().to_string(),
        category: fm.category,
        tags,
        parent_id: fm.parent_id,
        metadata: fm.metadata,
        created_at: parse_timestamp(fm.created_at.as_deref()),
        updated_at: parse_timestamp(fm.updated_at.as_deref()),
    })
}

/// Import every `.md` file under `dir`. Returns the number of entries
/// written.
pub async fn run_import(sync: &LoreSync, dir: &Path) -> Result<usize> {
    let mut items = Vec::new();

    for entry in WalkDir::new(dir).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.extension().and_then(|e| e.to_str()) != Some("md") {
            continue;
        }
        items.push(parse_file(path)?);
    }

    // Stable order keeps reruns deterministic.
    items.sort_by(|a, b| (&a.category, &a.title).cmp(&(&b.category, &b.title)));

    let imported = sync.bulk_import(items).await.map_err(anyhow::Error::from)?;
    Ok(imported.len())
}
