//! # Lore Keeper CLI (`lore`)
//!
//! The `lore` binary manages a lore database: structured worldbuilding
//! entries with a semantic-search index kept in sync alongside them.
//!
//! ## Usage
//!
//! ```bash
//! lore --config ./lore.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `lore init` | Create the database and run schema migrations |
//! | `lore serve` | Start the HTTP API server |
//! | `lore create` | Create a new entry |
//! | `lore get <id>` | Fetch a full entry by id |
//! | `lore list` | List entry summaries, optionally by category |
//! | `lore categories` | List distinct categories |
//! | `lore search "<query>"` | Semantic search over entries |
//! | `lore update <id>` | Apply a partial update to an entry |
//! | `lore delete <id>` | Delete an entry and its vector |
//! | `lore export` | Write the markdown content tree |
//! | `lore import <dir>` | Import a legacy markdown tree |
//!
//! ## Examples
//!
//! ```bash
//! # Initialize the database
//! lore init --config ./lore.toml
//!
//! # Create an entry
//! lore create --title "Gloomfang Serpent" --category bestiary \
//!     --content "A venomous cave serpent..." --tag predator --tag cave
//!
//! # Semantic search, scoped to a category
//! lore search "venomous creatures" --category bestiary --limit 5
//!
//! # Serve the REST API
//! lore serve --config ./lore.toml
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use lore_keeper::config::{self, Config};
use lore_keeper::embedding::create_embedder;
use lore_keeper::models::{EntryPatch, Metadata, NewEntry};
use lore_keeper::server::{self, AppState};
use lore_keeper::store::EntryStore;
use lore_keeper::sync::LoreSync;
use lore_keeper::{export, import, store};

/// Lore Keeper — a content management layer for worldbuilding lore with
/// embedding-backed semantic search.
#[derive(Parser)]
#[command(
    name = "lore",
    about = "Lore Keeper — structured lore entries with semantic search",
    version,
    long_about = "Lore Keeper stores short structured documents (title, content, category, \
    tags, metadata) in SQLite, keeps an embedding vector per entry in sync with every write, \
    and exposes the collection through a CLI, an HTTP REST API, and a markdown export tree."
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./lore.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and the entries and embeddings
    /// tables. Idempotent — running it multiple times is safe.
    Init,

    /// Start the HTTP API server.
    ///
    /// Binds to `[server].bind` and serves the REST endpoints. Mutating
    /// routes require the configured API key via the `x-api-key` header.
    Serve,

    /// Create a new entry.
    Create {
        /// Entry title.
        #[arg(long)]
        title: String,

        /// Entry body text.
        #[arg(long)]
        content: String,

        /// Category (e.g. `bestiary`, `flora`, `history`).
        #[arg(long)]
        category: String,

        /// Tag, repeatable.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Id of a parent entry.
        #[arg(long)]
        parent: Option<String>,

        /// Extra metadata as a JSON object string.
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Fetch a full entry by id.
    Get {
        /// Entry id.
        id: String,
    },

    /// List entry summaries, newest first.
    List {
        /// Restrict to a single category.
        #[arg(long)]
        category: Option<String>,
    },

    /// List distinct categories in sorted order.
    Categories,

    /// Semantic search over entries.
    ///
    /// Embeds the query and ranks entries by cosine similarity. Requires
    /// an embedding provider to be configured.
    Search {
        /// The search query string.
        query: String,

        /// Restrict results to a single category.
        #[arg(long)]
        category: Option<String>,

        /// Maximum number of results to return.
        #[arg(long)]
        limit: Option<usize>,
    },

    /// Apply a partial update to an entry.
    ///
    /// Only the supplied fields change. Updating title or content
    /// regenerates the entry's search vector.
    Update {
        /// Entry id.
        id: String,

        #[arg(long)]
        title: Option<String>,

        #[arg(long)]
        content: Option<String>,

        #[arg(long)]
        category: Option<String>,

        /// Replacement tag list, repeatable. Supplying any `--tag`
        /// replaces the whole list; without it the tags are left alone.
        #[arg(long = "tag")]
        tags: Vec<String>,

        /// Remove all tags from the entry.
        #[arg(long, conflicts_with = "tags")]
        clear_tags: bool,

        #[arg(long)]
        parent: Option<String>,

        /// Replacement metadata as a JSON object string.
        #[arg(long)]
        metadata: Option<String>,
    },

    /// Delete an entry and its vector.
    Delete {
        /// Entry id.
        id: String,
    },

    /// Write all entries as a markdown tree under the configured
    /// output directory, one `<category>/<slug>.md` file per entry.
    Export {
        /// Override the output directory from config.
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// Import a legacy markdown tree.
    ///
    /// Walks the directory for `*.md` files with YAML frontmatter and
    /// reconciles each against existing entries by legacy id, so the
    /// import can be re-run without creating duplicates.
    Import {
        /// Root of the markdown tree to import.
        dir: PathBuf,
    },
}

/// Map the `--tag`/`--clear-tags` flags onto the optional patch field:
/// no flags leaves the tags untouched, `--clear-tags` empties them.
fn tag_patch(tags: Vec<String>, clear: bool) -> Option<Vec<String>> {
    if clear {
        Some(Vec::new())
    } else if tags.is_empty() {
        None
    } else {
        Some(tags)
    }
}

/// Parse a `--metadata` JSON object string.
fn parse_metadata(raw: Option<String>) -> anyhow::Result<Option<Metadata>> {
    match raw {
        None => Ok(None),
        Some(s) => {
            let map: Metadata = serde_json::from_str(&s)
                .map_err(|e| anyhow::anyhow!("--metadata must be a JSON object: {}", e))?;
            Ok(Some(map))
        }
    }
}

/// Open the store and embedder and wire them into a sync layer.
async fn open_sync(cfg: &Config) -> anyhow::Result<Arc<LoreSync>> {
    let store = store::open(cfg).await?;
    let embedder = create_embedder(&cfg.embedding)?;
    Ok(Arc::new(LoreSync::new(store, embedder)))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(filter)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            // Opening the store runs migrations.
            store::open(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Serve => {
            let sync = open_sync(&cfg).await?;
            let state = AppState {
                sync,
                api_key: cfg.server.api_key(),
            };
            server::run_server(&cfg.server.bind, state).await?;
        }
        Commands::Create {
            title,
            content,
            category,
            tags,
            parent,
            metadata,
        } => {
            let sync = open_sync(&cfg).await?;
            let entry = sync
                .create_entry(NewEntry {
                    title,
                    content,
                    category,
                    tags,
                    parent_id: parent,
                    metadata: parse_metadata(metadata)?.unwrap_or_default(),
                })
                .await?;
            println!("{}", serde_json::to_string_pretty(&entry)?);
        }
        Commands::Get { id } => {
            let sync = open_sync(&cfg).await?;
            match sync.store().get(&id).await? {
                Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
                None => {
                    eprintln!("No entry with id {}", id);
                    std::process::exit(1);
                }
            }
        }
        Commands::List { category } => {
            let sync = open_sync(&cfg).await?;
            let entries = sync.store().list(category.as_deref()).await?;
            let summaries: Vec<_> = entries.iter().map(|e| e.summary()).collect();
            println!("{}", serde_json::to_string_pretty(&summaries)?);
        }
        Commands::Categories => {
            let sync = open_sync(&cfg).await?;
            for category in sync.store().list_categories().await? {
                println!("{}", category);
            }
        }
        Commands::Search {
            query,
            category,
            limit,
        } => {
            let sync = open_sync(&cfg).await?;
            let hits = sync.search(&query, category.as_deref(), limit).await?;
            if hits.is_empty() {
                println!("No results.");
            }
            for hit in hits {
                println!(
                    "{:.4}  {}  [{}] {}",
                    hit.score, hit.entry.id, hit.entry.category, hit.entry.title
                );
            }
        }
        Commands::Update {
            id,
            title,
            content,
            category,
            tags,
            clear_tags,
            parent,
            metadata,
        } => {
            let sync = open_sync(&cfg).await?;
            let patch = EntryPatch {
                title,
                content,
                category,
                tags: tag_patch(tags, clear_tags),
                parent_id: parent,
                metadata: parse_metadata(metadata)?,
            };
            match sync.update_entry(&id, patch).await? {
                Some(entry) => println!("{}", serde_json::to_string_pretty(&entry)?),
                None => {
                    eprintln!("No entry with id {}", id);
                    std::process::exit(1);
                }
            }
        }
        Commands::Delete { id } => {
            let sync = open_sync(&cfg).await?;
            if sync.delete_entry(&id).await? {
                println!("Deleted {}", id);
            } else {
                eprintln!("No entry with id {}", id);
                std::process::exit(1);
            }
        }
        Commands::Export { out } => {
            let sync = open_sync(&cfg).await?;
            let out_dir = out.unwrap_or_else(|| cfg.export.output_dir.clone());
            let stats = export::run_export(sync.store().as_ref(), &out_dir).await?;
            let total: usize = stats.values().sum();
            for (category, count) in &stats {
                println!("  {}: {} entries", category, count);
            }
            println!("Exported {} entries to {}", total, out_dir.display());
        }
        Commands::Import { dir } => {
            let sync = open_sync(&cfg).await?;
            let count = import::run_import(&sync, &dir).await?;
            println!("Imported {} entries from {}", count, dir.display());
        }
    }

    Ok(())
}
