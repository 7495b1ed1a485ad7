use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
    #[serde(default)]
    pub embedding: EmbeddingConfig,
    pub server: ServerConfig,
    #[serde(default)]
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// `"sqlite"` or `"memory"`. Which backend is authoritative is a
    /// configuration-time choice, never a per-request decision.
    #[serde(default = "default_backend")]
    pub backend: String,
    /// Database file path, required for the sqlite backend.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

fn default_backend() -> String {
    "sqlite".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmbeddingConfig {
    /// `"ollama"` or `"disabled"`.
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Expected vector dimensionality; informational, the service's
    /// output is taken as-is.
    #[serde(default)]
    pub dims: Option<usize>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            base_url: default_base_url(),
            model: default_model(),
            dims: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_provider() -> String {
    "ollama".to_string()
}
fn default_base_url() -> String {
    "http://localhost:11434".to_string()
}
fn default_model() -> String {
    "nomic-embed-text".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}

impl EmbeddingConfig {
    pub fn is_enabled(&self) -> bool {
        self.provider != "disabled"
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub bind: String,
    /// API key required on mutating routes. `LORE_API_KEY` in the
    /// environment takes precedence over the config value.
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ServerConfig {
    pub fn api_key(&self) -> Option<String> {
        std::env::var("LORE_API_KEY").ok().or_else(|| self.api_key.clone())
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    /// Directory receiving the `<category>/<slug>.md` export tree.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("content/lore")
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let config: Config = toml::from_str(&content).with_context(|| "Failed to parse config file")?;

    match config.db.backend.as_str() {
        "sqlite" => {
            if config.db.path.is_none() {
                anyhow::bail!("db.path is required when db.backend = 'sqlite'");
            }
        }
        "memory" => {}
        other => anyhow::bail!("Unknown db backend: '{}'. Must be sqlite or memory.", other),
    }

    match config.embedding.provider.as_str() {
        "ollama" | "disabled" => {}
        other => anyhow::bail!(
            "Unknown embedding provider: '{}'. Must be ollama or disabled.",
            other
        ),
    }

    if config.embedding.is_enabled() && config.embedding.model.trim().is_empty() {
        anyhow::bail!(
            "embedding.model must be non-empty when provider is '{}'",
            config.embedding.provider
        );
    }

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_config(content: &str) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f
    }

    #[test]
    fn minimal_sqlite_config() {
        let f = write_config(
            r#"
[db]
path = "data/lore.sqlite"

[server]
bind = "127.0.0.1:7800"
"#,
        );
        let cfg = load_config(f.path()).unwrap();
        assert_eq!(cfg.db.backend, "sqlite");
        assert_eq!(cfg.embedding.provider, "ollama");
        assert_eq!(cfg.embedding.model, "nomic-embed-text");
    }

    #[test]
    fn sqlite_requires_path() {
        let f = write_config(
            r#"
[db]
backend = "sqlite"

[server]
bind = "127.0.0.1:7800"
"#,
        );
        assert!(load_config(f.path()).is_err());
    }

    #[test]
    fn unknown_provider_rejected() {
        let f = write_config(
            r#"
[db]
backend = "memory"

[embedding]
provider = "openai"

[server]
bind = "127.0.0.1:7800"
"#,
        );
        assert!(load_config(f.path()).is_err());
    }
}
