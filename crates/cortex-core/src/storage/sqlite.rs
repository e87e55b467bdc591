//! SQLite Storage Implementation
//!
//! Typed-row persistence for engrams with the per-tenant append-only hash
//! chain, an FTS5 full-text index over content, and the causal edge table.
//!
//! Uses separate reader/writer connections for interior mutability. All
//! methods take `&self`, making the store `Send + Sync` so the engine can
//! hold it in an `Arc` without an outer lock.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use directories::ProjectDirs;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};

use crate::engram::{
    chain_hash, Confidence, Engram, EngramState, FactType, Tier, GENESIS_HASH,
};
use crate::error::{CortexError, Result};
use crate::graph::CausalLink;

// ============================================================================
// REPORT TYPES
// ============================================================================

/// Result of a chain verification walk
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    /// Whether every link verified
    pub valid: bool,
    /// First engram whose link failed, if any
    pub first_break: Option<String>,
    /// Rows walked
    pub total: i64,
    /// Rows verified before the first break
    pub verified: i64,
}

/// Aggregate statistics for a tenant
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantStats {
    /// All rows currently stored for the tenant
    pub total: i64,
    /// Rows in ACTIVE state
    pub active: i64,
    /// Rows in SILENT state
    pub silent: i64,
    /// Rows in MATURED state
    pub matured: i64,
    /// Lifetime count of engrams that reached DECEASED
    pub deceased: i64,
    /// Row counts per frequency tier
    pub per_tier: BTreeMap<String, i64>,
    /// Row counts per fact type
    pub per_type: BTreeMap<String, i64>,
    /// Row counts per project
    pub per_project: BTreeMap<String, i64>,
}

/// Optional predicate for `scan`
#[derive(Debug, Clone, Default)]
pub struct ScanFilter {
    /// Restrict to these lifecycle states
    pub states: Option<Vec<EngramState>>,
    /// Restrict to rows at or above this stored energy
    pub min_energy: Option<f64>,
    /// Restrict to this fact type
    pub fact_type: Option<FactType>,
}

// ============================================================================
// STORE
// ============================================================================

const ENGRAM_COLUMNS: &str = "id, tenant_id, project_id, content, content_hash, fact_type, \
     confidence, created_at, last_accessed, energy_level, access_count, valence, arousal, \
     energy_multiplier, state, active_twin_id, maturation_days, contradiction_count, tier, \
     is_diamond, entangled_refs, tags, source, extra, hash, prev_hash";

/// Engram store backed by SQLite
pub struct EngramStore {
    writer: Mutex<Connection>,
    reader: Mutex<Connection>,
    /// Per-tenant append locks guarding chain construction. `try_lock`
    /// contention surfaces as `ChainLocked` and the caller retries.
    append_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl EngramStore {
    /// Apply PRAGMAs and optional encryption to a connection
    fn configure_connection(conn: &Connection) -> Result<()> {
        // Apply encryption key if SQLCipher is enabled and key is provided
        #[cfg(feature = "encryption")]
        {
            if let Ok(key) = std::env::var("CORTEX_ENCRYPTION_KEY") {
                if !key.is_empty() {
                    conn.pragma_update(None, "key", &key)?;
                }
            }
        }

        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = NORMAL;
             PRAGMA cache_size = -64000;
             PRAGMA temp_store = MEMORY;
             PRAGMA foreign_keys = ON;
             PRAGMA busy_timeout = 5000;",
        )?;

        Ok(())
    }

    /// Create a new store instance
    pub fn new(db_path: Option<PathBuf>) -> Result<Self> {
        let path = match db_path {
            Some(p) => p,
            None => {
                let proj_dirs = ProjectDirs::from("com", "cortex", "core").ok_or_else(|| {
                    CortexError::Validation("Could not determine project directories".to_string())
                })?;

                let data_dir = proj_dirs.data_dir();
                std::fs::create_dir_all(data_dir)?;
                #[cfg(unix)]
                {
                    use std::os::unix::fs::PermissionsExt;
                    let perms = std::fs::Permissions::from_mode(0o700);
                    let _ = std::fs::set_permissions(data_dir, perms);
                }
                data_dir.join("cortex.db")
            }
        };

        let writer_conn = Connection::open(&path)?;

        #[cfg(unix)]
        if path.exists() {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&path, perms);
        }

        Self::configure_connection(&writer_conn)?;
        super::migrations::apply_migrations(&writer_conn)?;

        let reader_conn = Connection::open(&path)?;
        Self::configure_connection(&reader_conn)?;

        Ok(Self {
            writer: Mutex::new(writer_conn),
            reader: Mutex::new(reader_conn),
            append_locks: Mutex::new(HashMap::new()),
        })
    }

    fn append_lock(&self, tenant_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.append_locks.lock().expect("append lock map poisoned");
        locks
            .entry(tenant_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    // ========================================================================
    // PUT / GET / SCAN / DELETE
    // ========================================================================

    /// Insert a new engram or replace the mutable fields of an existing one.
    ///
    /// Ledger rows (everything except silent twins) fill `prev_hash` and
    /// `hash` atomically under the tenant's append lock; a concurrent
    /// append attempt fails with `ChainLocked` and must be retried. A
    /// corrupted chain tail aborts the append with `ChainBroken`. Silent
    /// twins are internal consolidation buffers, not audited facts - they
    /// persist unchained. Replacing an existing row never touches the
    /// chain.
    pub fn put(&self, engram: &mut Engram) -> Result<()> {
        if self.get(&engram.id)?.is_some() {
            return self.update_row(engram);
        }

        if engram.state == EngramState::Silent {
            engram.hash.clear();
            engram.prev_hash.clear();
            let writer = self
                .writer
                .lock()
                .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
            return Self::insert_row(&writer, engram);
        }

        let lock = self.append_lock(&engram.tenant_id);
        let _guard = lock
            .try_lock()
            .map_err(|_| CortexError::ChainLocked(engram.tenant_id.clone()))?;

        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;

        // Read and verify the chain tail before linking to it.
        let tail: Option<(String, String, String, String)> = writer
            .query_row(
                "SELECT id, content_hash, created_at, hash FROM engrams
                 WHERE tenant_id = ?1 AND hash != '' ORDER BY rowid DESC LIMIT 1",
                params![engram.tenant_id],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
            )
            .optional()?;

        let prev_hash = match tail {
            Some((tail_id, tail_content_hash, tail_created, tail_hash)) => {
                let tail_prev: String = writer.query_row(
                    "SELECT prev_hash FROM engrams WHERE id = ?1",
                    params![tail_id],
                    |row| row.get(0),
                )?;
                let expected =
                    chain_hash(&tail_prev, &engram.tenant_id, &tail_content_hash, &tail_created);
                if expected != tail_hash {
                    tracing::error!(
                        tenant = %engram.tenant_id,
                        engram = %tail_id,
                        "Chain tail failed verification; rejecting append"
                    );
                    return Err(CortexError::ChainBroken {
                        tenant_id: engram.tenant_id.clone(),
                        engram_id: tail_id,
                    });
                }
                tail_hash
            }
            None => GENESIS_HASH.to_string(),
        };

        let created_at = engram.created_at.to_rfc3339();
        engram.prev_hash = prev_hash;
        engram.hash = chain_hash(
            &engram.prev_hash,
            &engram.tenant_id,
            &engram.content_hash,
            &created_at,
        );

        Self::insert_row(&writer, engram)
    }

    fn insert_row(writer: &Connection, engram: &Engram) -> Result<()> {
        writer.execute(
            "INSERT INTO engrams (
                id, tenant_id, project_id, content, content_hash, fact_type, confidence,
                created_at, last_accessed, energy_level, access_count, valence, arousal,
                energy_multiplier, state, active_twin_id, maturation_days,
                contradiction_count, tier, is_diamond, entangled_refs, tags, source, extra,
                hash, prev_hash
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6, ?7,
                ?8, ?9, ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17,
                ?18, ?19, ?20, ?21, ?22, ?23, ?24,
                ?25, ?26
            )",
            params![
                engram.id,
                engram.tenant_id,
                engram.project_id,
                engram.content,
                engram.content_hash,
                engram.fact_type.as_str(),
                engram.confidence.as_str(),
                engram.created_at.to_rfc3339(),
                engram.last_accessed.to_rfc3339(),
                engram.energy_level,
                engram.access_count,
                engram.valence,
                engram.arousal,
                engram.energy_multiplier,
                engram.state.as_str(),
                engram.active_twin_id,
                engram.maturation_days,
                engram.contradiction_count,
                engram.tier.as_str(),
                engram.is_diamond as i64,
                serde_json::to_string(&engram.entangled_refs).unwrap_or_else(|_| "[]".into()),
                serde_json::to_string(&engram.tags).unwrap_or_else(|_| "[]".into()),
                engram.source,
                serde_json::to_string(&engram.extra).unwrap_or_else(|_| "{}".into()),
                engram.hash,
                engram.prev_hash,
            ],
        )?;

        Ok(())
    }

    /// Update the mutable fields of an existing row (chain fields untouched)
    fn update_row(&self, engram: &Engram) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE engrams SET
                project_id = ?2, fact_type = ?3, confidence = ?4, created_at = ?5,
                last_accessed = ?6, energy_level = ?7, access_count = ?8, valence = ?9,
                arousal = ?10, energy_multiplier = ?11, state = ?12, active_twin_id = ?13,
                maturation_days = ?14, contradiction_count = ?15, tier = ?16,
                is_diamond = ?17, entangled_refs = ?18, tags = ?19, source = ?20, extra = ?21
             WHERE id = ?1",
            params![
                engram.id,
                engram.project_id,
                engram.fact_type.as_str(),
                engram.confidence.as_str(),
                engram.created_at.to_rfc3339(),
                engram.last_accessed.to_rfc3339(),
                engram.energy_level,
                engram.access_count,
                engram.valence,
                engram.arousal,
                engram.energy_multiplier,
                engram.state.as_str(),
                engram.active_twin_id,
                engram.maturation_days,
                engram.contradiction_count,
                engram.tier.as_str(),
                engram.is_diamond as i64,
                serde_json::to_string(&engram.entangled_refs).unwrap_or_else(|_| "[]".into()),
                serde_json::to_string(&engram.tags).unwrap_or_else(|_| "[]".into()),
                engram.source,
                serde_json::to_string(&engram.extra).unwrap_or_else(|_| "{}".into()),
            ],
        )?;
        if changed == 0 {
            return Err(CortexError::UnknownId(engram.id.clone()));
        }
        Ok(())
    }

    /// Look up a single engram
    pub fn get(&self, id: &str) -> Result<Option<Engram>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let sql = format!("SELECT {} FROM engrams WHERE id = ?1", ENGRAM_COLUMNS);
        let engram = reader
            .query_row(&sql, params![id], Self::row_to_engram)
            .optional()?;
        Ok(engram)
    }

    /// Ordered scan over a tenant's rows
    pub fn scan(
        &self,
        tenant_id: &str,
        project_id: Option<&str>,
        filter: &ScanFilter,
    ) -> Result<Vec<Engram>> {
        let mut sql = format!(
            "SELECT {} FROM engrams WHERE tenant_id = ?1",
            ENGRAM_COLUMNS
        );
        let mut args: Vec<Box<dyn rusqlite::ToSql>> = vec![Box::new(tenant_id.to_string())];

        if let Some(project) = project_id {
            args.push(Box::new(project.to_string()));
            sql.push_str(&format!(" AND project_id = ?{}", args.len()));
        }
        if let Some(states) = &filter.states {
            let placeholders: Vec<String> = states
                .iter()
                .map(|s| {
                    args.push(Box::new(s.as_str().to_string()));
                    format!("?{}", args.len())
                })
                .collect();
            sql.push_str(&format!(" AND state IN ({})", placeholders.join(", ")));
        }
        if let Some(min_energy) = filter.min_energy {
            args.push(Box::new(min_energy));
            sql.push_str(&format!(" AND energy_level >= ?{}", args.len()));
        }
        if let Some(fact_type) = filter.fact_type {
            args.push(Box::new(fact_type.as_str().to_string()));
            sql.push_str(&format!(" AND fact_type = ?{}", args.len()));
        }
        sql.push_str(" ORDER BY rowid ASC");

        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(&sql)?;
        let rows = stmt.query_map(
            rusqlite::params_from_iter(args.iter().map(|a| a.as_ref())),
            Self::row_to_engram,
        )?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Every row in the store, insertion order. Used to rebuild the
    /// vector index and admission filter at boot.
    pub fn scan_all(&self) -> Result<Vec<Engram>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let sql = format!("SELECT {} FROM engrams ORDER BY rowid ASC", ENGRAM_COLUMNS);
        let mut stmt = reader.prepare(&sql)?;
        let rows = stmt.query_map([], Self::row_to_engram)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Remove a row. The caller is responsible for having removed the
    /// vector entry first. Causal edges touching the id go with it.
    pub fn delete(&self, id: &str) -> Result<bool> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        writer.execute(
            "DELETE FROM causal_edges WHERE cause_id = ?1 OR effect_id = ?1",
            params![id],
        )?;
        let changed = writer.execute("DELETE FROM engrams WHERE id = ?1", params![id])?;
        Ok(changed > 0)
    }

    // ========================================================================
    // ROW MUTATIONS
    // ========================================================================

    /// Record a retrieval: bump the access counter and the access stamp.
    /// Energy is untouched; reconsolidation decides its fate.
    pub fn touch_access(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE engrams SET last_accessed = ?2, access_count = access_count + 1
             WHERE id = ?1",
            params![id, now.to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(CortexError::UnknownId(id.to_string()));
        }
        Ok(())
    }

    /// Long-term potentiation: strengthen an existing engram
    pub fn reinforce(&self, id: &str, boost: f64, now: DateTime<Utc>) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE engrams SET
                energy_level = MIN(1.0, energy_level + ?2),
                last_accessed = ?3,
                access_count = access_count + 1
             WHERE id = ?1",
            params![id, boost, now.to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(CortexError::UnknownId(id.to_string()));
        }
        Ok(())
    }

    /// Apply a signed energy delta, clamped to [0, 1]
    pub fn apply_energy_delta(&self, id: &str, delta: f64) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE engrams SET energy_level = MAX(0.0, MIN(1.0, energy_level + ?2))
             WHERE id = ?1",
            params![id, delta],
        )?;
        if changed == 0 {
            return Err(CortexError::UnknownId(id.to_string()));
        }
        Ok(())
    }

    /// Batched energy persistence for the homeostasis cycle.
    ///
    /// Re-bases the decay baseline (`last_accessed`) to `rebase_at` so
    /// back-to-back cycles do not compound the same elapsed window.
    /// Linear decay is path-independent, so the trajectory is unchanged.
    /// Access counts are untouched - this is not an access event.
    pub fn batch_set_energy(
        &self,
        updates: &[(String, f64)],
        rebase_at: DateTime<Utc>,
    ) -> Result<usize> {
        let mut writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let tx = writer.transaction()?;
        let mut applied = 0;
        {
            let mut stmt = tx.prepare(
                "UPDATE engrams SET energy_level = MAX(0.0, MIN(1.0, ?2)), last_accessed = ?3
                 WHERE id = ?1",
            )?;
            for (id, energy) in updates {
                applied += stmt.execute(params![id, energy, rebase_at.to_rfc3339()])?;
            }
        }
        tx.commit()?;
        Ok(applied)
    }

    /// Migrate a row to a new frequency tier
    pub fn set_tier(&self, id: &str, tier: Tier) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE engrams SET tier = ?2 WHERE id = ?1",
            params![id, tier.as_str()],
        )?;
        if changed == 0 {
            return Err(CortexError::UnknownId(id.to_string()));
        }
        Ok(())
    }

    /// Transition a row's lifecycle state
    pub fn set_state(&self, id: &str, state: EngramState) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE engrams SET state = ?2 WHERE id = ?1",
            params![id, state.as_str()],
        )?;
        if changed == 0 {
            return Err(CortexError::UnknownId(id.to_string()));
        }
        Ok(())
    }

    /// Record a resonance entanglement on an existing engram
    pub fn add_entangled_ref(&self, id: &str, ref_id: &str) -> Result<()> {
        let mut engram = self
            .get(id)?
            .ok_or_else(|| CortexError::UnknownId(id.to_string()))?;
        if !engram.entangled_refs.iter().any(|r| r == ref_id) {
            engram.entangled_refs.push(ref_id.to_string());
            self.update_row(&engram)?;
        }
        Ok(())
    }

    /// Register a contradiction against a silent twin: resets the
    /// maturation clock and bumps the grow-only counter. This is the only
    /// sanctioned mutation of `created_at`.
    pub fn contradict_silent(&self, id: &str, now: DateTime<Utc>) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE engrams SET created_at = ?2, contradiction_count = contradiction_count + 1
             WHERE id = ?1 AND state = 'silent'",
            params![id, now.to_rfc3339()],
        )?;
        if changed == 0 {
            return Err(CortexError::UnknownId(id.to_string()));
        }
        Ok(())
    }

    /// Silent twins belonging to an active engram
    pub fn silents_of(&self, active_id: &str) -> Result<Vec<Engram>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let sql = format!(
            "SELECT {} FROM engrams WHERE active_twin_id = ?1 AND state = 'silent'
             ORDER BY rowid ASC",
            ENGRAM_COLUMNS
        );
        let mut stmt = reader.prepare(&sql)?;
        let rows = stmt.query_map(params![active_id], Self::row_to_engram)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ========================================================================
    // EMBEDDINGS
    // ========================================================================

    /// Persist an engram's embedding
    pub fn put_embedding(&self, engram_id: &str, vector: &[f32], model: &str) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT OR REPLACE INTO engram_embeddings
             (engram_id, embedding, dimensions, model, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                engram_id,
                embedding_to_bytes(vector),
                vector.len() as i64,
                model,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch an engram's embedding
    pub fn get_embedding(&self, engram_id: &str) -> Result<Option<Vec<f32>>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let blob: Option<Vec<u8>> = reader
            .query_row(
                "SELECT embedding FROM engram_embeddings WHERE engram_id = ?1",
                params![engram_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(blob.map(|b| embedding_from_bytes(&b)))
    }

    /// All persisted embeddings (used to rebuild the vector index at boot)
    pub fn all_embeddings(&self) -> Result<Vec<(String, Vec<f32>)>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare("SELECT engram_id, embedding FROM engram_embeddings")?;
        let rows: Vec<(String, Vec<u8>)> = stmt
            .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(rows
            .into_iter()
            .map(|(id, blob)| (id, embedding_from_bytes(&blob)))
            .collect())
    }

    // ========================================================================
    // FULL-TEXT SEARCH
    // ========================================================================

    /// Keyword search over content via FTS5, scoped to a tenant
    pub fn keyword_search(&self, tenant_id: &str, query: &str, limit: usize) -> Result<Vec<String>> {
        let sanitized = sanitize_fts5_query(query);
        if sanitized.is_empty() {
            return Ok(vec![]);
        }
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT e.id FROM engrams_fts f
             JOIN engrams e ON e.id = f.id
             WHERE engrams_fts MATCH ?1 AND e.tenant_id = ?2
             ORDER BY rank LIMIT ?3",
        )?;
        let rows = stmt.query_map(params![sanitized, tenant_id, limit as i64], |row| {
            row.get::<_, String>(0)
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ========================================================================
    // CHAIN VERIFICATION
    // ========================================================================

    /// Recompute the tenant's hash chain and report the first broken
    /// link. Silent twins are unchained and excluded from the walk.
    pub fn verify_chain(&self, tenant_id: &str) -> Result<ChainReport> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT id, content_hash, created_at, hash, prev_hash FROM engrams
             WHERE tenant_id = ?1 AND hash != '' ORDER BY rowid ASC",
        )?;
        let rows: Vec<(String, String, String, String, String)> = stmt
            .query_map(params![tenant_id], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                ))
            })?
            .filter_map(|r| r.ok())
            .collect();

        let total = rows.len() as i64;
        let mut expected_prev = GENESIS_HASH.to_string();
        let mut verified = 0i64;

        for (id, content_hash, created_at, hash, prev_hash) in rows {
            let recomputed = chain_hash(&prev_hash, tenant_id, &content_hash, &created_at);
            if prev_hash != expected_prev || recomputed != hash {
                tracing::warn!(tenant = tenant_id, engram = %id, "Hash chain break detected");
                return Ok(ChainReport {
                    valid: false,
                    first_break: Some(id),
                    total,
                    verified,
                });
            }
            expected_prev = hash;
            verified += 1;
        }

        Ok(ChainReport {
            valid: true,
            first_break: None,
            total,
            verified,
        })
    }

    // ========================================================================
    // CAUSAL EDGES
    // ========================================================================

    /// Persist a causal edge (insert-only until an endpoint dies)
    pub fn insert_causal_edge(&self, link: &CausalLink) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT OR REPLACE INTO causal_edges
             (cause_id, effect_id, relation, strength, description, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                link.cause_id,
                link.effect_id,
                link.relation.as_str(),
                link.strength,
                link.description,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Load every persisted causal edge (graph warm-up at boot)
    pub fn load_causal_edges(&self) -> Result<Vec<CausalLink>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let mut stmt = reader.prepare(
            "SELECT cause_id, effect_id, relation, strength, description FROM causal_edges",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok(CausalLink {
                cause_id: row.get(0)?,
                effect_id: row.get(1)?,
                relation: crate::graph::CausalRelation::parse_name(&row.get::<_, String>(2)?),
                strength: row.get(3)?,
                description: row.get(4)?,
            })
        })?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ========================================================================
    // CRDT STATE
    // ========================================================================

    /// Persist serialized CRDT replica state for an engram
    pub fn set_crdt_state(&self, id: &str, state_json: &str) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        let changed = writer.execute(
            "UPDATE engrams SET crdt_state = ?2 WHERE id = ?1",
            params![id, state_json],
        )?;
        if changed == 0 {
            return Err(CortexError::UnknownId(id.to_string()));
        }
        Ok(())
    }

    /// Fetch serialized CRDT replica state for an engram
    pub fn get_crdt_state(&self, id: &str) -> Result<Option<String>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let state: Option<Option<String>> = reader
            .query_row(
                "SELECT crdt_state FROM engrams WHERE id = ?1",
                params![id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(state.flatten())
    }

    // ========================================================================
    // STATS
    // ========================================================================

    /// Bump the lifetime deceased counter for a tenant
    pub fn record_deceased(&self, tenant_id: &str, count: i64) -> Result<()> {
        if count <= 0 {
            return Ok(());
        }
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        writer.execute(
            "INSERT INTO tenant_counters (tenant_id, deceased_total) VALUES (?1, ?2)
             ON CONFLICT(tenant_id) DO UPDATE SET deceased_total = deceased_total + ?2",
            params![tenant_id, count],
        )?;
        Ok(())
    }

    /// Distinct project ids within a tenant
    pub fn list_projects(&self, tenant_id: &str) -> Result<Vec<String>> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let mut stmt = reader
            .prepare("SELECT DISTINCT project_id FROM engrams WHERE tenant_id = ?1 ORDER BY 1")?;
        let rows = stmt.query_map(params![tenant_id], |row| row.get::<_, String>(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Aggregate statistics for a tenant
    pub fn stats(&self, tenant_id: &str) -> Result<TenantStats> {
        let reader = self
            .reader
            .lock()
            .map_err(|_| CortexError::Validation("Reader lock poisoned".into()))?;
        let mut stats = TenantStats::default();

        let mut stmt = reader
            .prepare("SELECT state, COUNT(*) FROM engrams WHERE tenant_id = ?1 GROUP BY state")?;
        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for row in rows.filter_map(|r| r.ok()) {
            stats.total += row.1;
            match EngramState::parse_name(&row.0) {
                EngramState::Active => stats.active = row.1,
                EngramState::Silent => stats.silent = row.1,
                EngramState::Matured => stats.matured = row.1,
                EngramState::Deceased => {}
            }
        }

        let mut stmt = reader
            .prepare("SELECT tier, COUNT(*) FROM engrams WHERE tenant_id = ?1 GROUP BY tier")?;
        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for (tier, count) in rows.filter_map(|r| r.ok()) {
            stats.per_tier.insert(tier, count);
        }

        let mut stmt = reader.prepare(
            "SELECT fact_type, COUNT(*) FROM engrams WHERE tenant_id = ?1 GROUP BY fact_type",
        )?;
        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for (fact_type, count) in rows.filter_map(|r| r.ok()) {
            stats.per_type.insert(fact_type, count);
        }

        let mut stmt = reader.prepare(
            "SELECT project_id, COUNT(*) FROM engrams WHERE tenant_id = ?1 GROUP BY project_id",
        )?;
        let rows = stmt.query_map(params![tenant_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        for (project, count) in rows.filter_map(|r| r.ok()) {
            stats.per_project.insert(project, count);
        }

        stats.deceased = reader
            .query_row(
                "SELECT deceased_total FROM tenant_counters WHERE tenant_id = ?1",
                params![tenant_id],
                |row| row.get(0),
            )
            .optional()?
            .unwrap_or(0);

        Ok(stats)
    }

    // ========================================================================
    // ROW MAPPING
    // ========================================================================

    fn parse_timestamp(value: &str, field_name: &str) -> rusqlite::Result<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(value)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| {
                rusqlite::Error::FromSqlConversionFailure(
                    0,
                    rusqlite::types::Type::Text,
                    Box::new(std::io::Error::new(
                        std::io::ErrorKind::InvalidData,
                        format!("invalid {} timestamp: {}", field_name, e),
                    )),
                )
            })
    }

    fn row_to_engram(row: &rusqlite::Row) -> rusqlite::Result<Engram> {
        let created_at: String = row.get(7)?;
        let last_accessed: String = row.get(8)?;
        let entangled_json: String = row.get(20)?;
        let tags_json: String = row.get(21)?;
        let extra_json: String = row.get(23)?;

        Ok(Engram {
            id: row.get(0)?,
            tenant_id: row.get(1)?,
            project_id: row.get(2)?,
            content: row.get(3)?,
            content_hash: row.get(4)?,
            fact_type: FactType::parse_name(&row.get::<_, String>(5)?),
            confidence: Confidence::parse_name(&row.get::<_, String>(6)?),
            created_at: Self::parse_timestamp(&created_at, "created_at")?,
            last_accessed: Self::parse_timestamp(&last_accessed, "last_accessed")?,
            energy_level: row.get(9)?,
            access_count: row.get(10)?,
            valence: row.get(11)?,
            arousal: row.get(12)?,
            energy_multiplier: row.get(13)?,
            state: EngramState::parse_name(&row.get::<_, String>(14)?),
            active_twin_id: row.get(15)?,
            maturation_days: row.get(16)?,
            contradiction_count: row.get(17)?,
            tier: Tier::parse_name(&row.get::<_, String>(18)?),
            is_diamond: row.get::<_, i64>(19)? != 0,
            entangled_refs: serde_json::from_str(&entangled_json).unwrap_or_default(),
            tags: serde_json::from_str(&tags_json).unwrap_or_default(),
            source: row.get(22)?,
            extra: serde_json::from_str(&extra_json).unwrap_or_default(),
            hash: row.get(24)?,
            prev_hash: row.get(25)?,
        })
    }

    /// Corrupt a row's hash. Test-only hook for chain break scenarios.
    #[doc(hidden)]
    pub fn corrupt_hash_for_test(&self, id: &str, bogus: &str) -> Result<()> {
        let writer = self
            .writer
            .lock()
            .map_err(|_| CortexError::Validation("Writer lock poisoned".into()))?;
        writer.execute(
            "UPDATE engrams SET hash = ?2 WHERE id = ?1",
            params![id, bogus],
        )?;
        Ok(())
    }
}

// ============================================================================
// HELPERS
// ============================================================================

fn embedding_to_bytes(vector: &[f32]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(vector.len() * 4);
    for v in vector {
        bytes.extend_from_slice(&v.to_le_bytes());
    }
    bytes
}

fn embedding_from_bytes(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|chunk| f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}

/// Escape a user query for FTS5 by quoting each token
pub fn sanitize_fts5_query(query: &str) -> String {
    query
        .split_whitespace()
        .filter(|t| t.chars().any(|c| c.is_alphanumeric()))
        .map(|t| format!("\"{}\"", t.replace('"', "")))
        .collect::<Vec<_>>()
        .join(" ")
}

// ============================================================================
// TESTS
// ============================================================================
