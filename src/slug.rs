//! Slug derivation shared by the export tree and the static-site loader.

/// Convert a title to a URL-friendly slug: lowercase, non-alphanumeric
/// runs collapsed to single hyphens, leading/trailing hyphens trimmed.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut last_was_hyphen = true; // suppress a leading hyphen

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_was_hyphen = false;
        } else if !last_was_hyphen {
            slug.push('-');
            last_was_hyphen = true;
        }
    }

    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

/// Slug used as the content-store key: `category/normalized-title`.
pub fn entry_slug(category: &str, title: &str) -> String {
    let title = if title.is_empty() { "untitled" } else { title };
    let category = if category.is_empty() {
        "general"
    } else {
        category
    };
    format!("{}/{}", category, slugify(title))
}
