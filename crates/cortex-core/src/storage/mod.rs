//! Storage Module
//!
//! SQLite-based persistence layer with:
//! - Typed engram rows with indexed isolation keys
//! - Per-tenant append-only hash chain
//! - FTS5 full-text search with query sanitization
//! - Embedded vector storage (blob column, rebuilt into the index at boot)
//! - Causal edge and CRDT replica state tables

mod migrations;
mod sqlite;

pub use migrations::{apply_migrations, MIGRATIONS};
pub use sqlite::{sanitize_fts5_query, ChainReport, EngramStore, ScanFilter, TenantStats};
