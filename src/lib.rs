//! # Lore Keeper
//!
//! A content management layer for worldbuilding lore: CRUD over short
//! structured documents (title, content, category, tags, metadata) with a
//! semantic-search index kept in sync with the records.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌──────────┐   ┌─────────────┐
//! │   CLI    │   │   HTTP   │   │ Site loader │
//! │  (lore)  │   │  (axum)  │   │             │
//! └────┬─────┘   └────┬─────┘   └──────┬──────┘
//!      └──────────────┼────────────────┘
//!                     ▼
//!               ┌──────────┐     ┌───────────┐
//!               │   Sync   │────▶│ Embedding │
//!               │  layer   │     │  (Ollama) │
//!               └────┬─────┘     └───────────┘
//!                    ▼
//!          ┌──────────────────┐
//!          │ SQLite / memory  │
//!          │ entries + vectors│
//!          └──────────────────┘
//! ```
//!
//! Every write flows through the sync layer, which decides whether the
//! change affects the entry's embedded representation and keeps exactly
//! zero or one vector per entry.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Error taxonomy |
//! | [`embedding`] | Embedding client and vector utilities |
//! | [`store`] | Entry store and vector index backends |
//! | [`sync`] | Create/update/delete with index synchronization |
//! | [`server`] | HTTP REST API |
//! | [`export`] | Markdown tree export |
//! | [`import`] | Legacy markdown tree import |
//! | [`loader`] | Static-site content loader |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod config;
pub mod db;
pub mod embedding;
pub mod error;
pub mod export;
pub mod import;
pub mod loader;
pub mod migrate;
pub mod models;
pub mod server;
pub mod slug;
pub mod store;
pub mod sync;
