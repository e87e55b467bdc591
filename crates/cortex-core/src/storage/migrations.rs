//! Database Migrations
//!
//! Schema migration definitions for the storage layer.

use rusqlite::Connection;

/// Migration definitions
pub const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "Initial schema: engram rows, embeddings, FTS5, chain fields",
        up: MIGRATION_V1_UP,
    },
    Migration {
        version: 2,
        description: "Causal edge table",
        up: MIGRATION_V2_UP,
    },
    Migration {
        version: 3,
        description: "CRDT replica state and tenant lifecycle counters",
        up: MIGRATION_V3_UP,
    },
];

/// A database migration
#[derive(Debug, Clone)]
pub struct Migration {
    /// Version number
    pub version: u32,
    /// Description
    pub description: &'static str,
    /// SQL to apply
    pub up: &'static str,
}

/// V1: Initial schema
const MIGRATION_V1_UP: &str = r#"
CREATE TABLE IF NOT EXISTS engrams (
    id TEXT PRIMARY KEY,
    tenant_id TEXT NOT NULL,
    project_id TEXT NOT NULL,
    content TEXT NOT NULL,
    content_hash TEXT NOT NULL,
    fact_type TEXT NOT NULL DEFAULT 'knowledge',
    confidence TEXT NOT NULL DEFAULT 'c3',
    created_at TEXT NOT NULL,
    last_accessed TEXT NOT NULL,

    -- Thermodynamic state
    energy_level REAL NOT NULL DEFAULT 1.0,
    access_count INTEGER NOT NULL DEFAULT 0,
    valence REAL NOT NULL DEFAULT 0.0,
    arousal REAL NOT NULL DEFAULT 0.5,
    energy_multiplier REAL NOT NULL DEFAULT 0.75,

    -- Consolidation lifecycle
    state TEXT NOT NULL DEFAULT 'active',
    active_twin_id TEXT,
    maturation_days REAL NOT NULL DEFAULT 3.0,
    contradiction_count INTEGER NOT NULL DEFAULT 0,

    -- Classification
    tier TEXT NOT NULL DEFAULT 'hot',
    is_diamond INTEGER NOT NULL DEFAULT 0,
    entangled_refs TEXT NOT NULL DEFAULT '[]',

    -- Provenance
    tags TEXT NOT NULL DEFAULT '[]',
    source TEXT,
    extra TEXT NOT NULL DEFAULT '{}',

    -- Append-only ledger
    hash TEXT NOT NULL,
    prev_hash TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_engrams_tenant_project ON engrams(tenant_id, project_id);
CREATE INDEX IF NOT EXISTS idx_engrams_fact_type ON engrams(fact_type);
CREATE INDEX IF NOT EXISTS idx_engrams_created ON engrams(created_at);
CREATE INDEX IF NOT EXISTS idx_engrams_state ON engrams(state);
CREATE INDEX IF NOT EXISTS idx_engrams_tier ON engrams(tier);

-- At most one ACTIVE engram per (tenant, content); duplicates must route
-- to reinforcement through the admission gate.
CREATE UNIQUE INDEX IF NOT EXISTS idx_engrams_active_content
    ON engrams(tenant_id, content_hash) WHERE state = 'active';

-- Embeddings storage table (binary blob for efficiency)
CREATE TABLE IF NOT EXISTS engram_embeddings (
    engram_id TEXT PRIMARY KEY REFERENCES engrams(id) ON DELETE CASCADE,
    embedding BLOB NOT NULL,
    dimensions INTEGER NOT NULL,
    model TEXT NOT NULL,
    created_at TEXT NOT NULL
);

-- FTS5 virtual table for full-text search over content
CREATE VIRTUAL TABLE IF NOT EXISTS engrams_fts USING fts5(
    id,
    content,
    tags,
    content='engrams',
    content_rowid='rowid'
);

-- Triggers to keep FTS in sync
CREATE TRIGGER IF NOT EXISTS engrams_ai AFTER INSERT ON engrams BEGIN
    INSERT INTO engrams_fts(rowid, id, content, tags)
    VALUES (NEW.rowid, NEW.id, NEW.content, NEW.tags);
END;

CREATE TRIGGER IF NOT EXISTS engrams_ad AFTER DELETE ON engrams BEGIN
    INSERT INTO engrams_fts(engrams_fts, rowid, id, content, tags)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.content, OLD.tags);
END;

CREATE TRIGGER IF NOT EXISTS engrams_au AFTER UPDATE ON engrams BEGIN
    INSERT INTO engrams_fts(engrams_fts, rowid, id, content, tags)
    VALUES ('delete', OLD.rowid, OLD.id, OLD.content, OLD.tags);
    INSERT INTO engrams_fts(rowid, id, content, tags)
    VALUES (NEW.rowid, NEW.id, NEW.content, NEW.tags);
END;

-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL
);
"#;

/// V2: Causal edges
const MIGRATION_V2_UP: &str = r#"
CREATE TABLE IF NOT EXISTS causal_edges (
    cause_id TEXT NOT NULL,
    effect_id TEXT NOT NULL,
    relation TEXT NOT NULL DEFAULT 'caused',
    strength REAL NOT NULL DEFAULT 1.0,
    description TEXT NOT NULL DEFAULT '',
    created_at TEXT NOT NULL,
    PRIMARY KEY (cause_id, effect_id, relation)
);

CREATE INDEX IF NOT EXISTS idx_causal_effect ON causal_edges(effect_id);
"#;

/// V3: CRDT replica state + tenant counters
const MIGRATION_V3_UP: &str = r#"
ALTER TABLE engrams ADD COLUMN crdt_state TEXT;

CREATE TABLE IF NOT EXISTS tenant_counters (
    tenant_id TEXT PRIMARY KEY,
    deceased_total INTEGER NOT NULL DEFAULT 0
);
"#;

/// Apply all pending migrations to a connection
pub fn apply_migrations(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL
        )",
        [],
    )?;

    let current: u32 = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
            row.get(0)
        })
        .unwrap_or(0);

    for migration in MIGRATIONS {
        if migration.version <= current {
            continue;
        }
        tracing::info!(
            version = migration.version,
            "Applying migration: {}",
            migration.description
        );
        conn.execute_batch(migration.up)?;
        conn.execute(
            "INSERT INTO schema_version (version, applied_at) VALUES (?1, ?2)",
            rusqlite::params![migration.version, chrono::Utc::now().to_rfc3339()],
        )?;
    }

    Ok(())
}
