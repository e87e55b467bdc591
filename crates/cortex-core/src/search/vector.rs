//! Filtered Vector Search
//!
//! HNSW (USearch) approximate nearest-neighbor index over engram
//! embeddings, wrapped with:
//! - String-key to internal-key mapping
//! - A metadata side-table so searches can filter on tenant, project,
//!   tier, energy floor, diamond flag, and lifecycle visibility
//! - Deterministic ordering: descending similarity, then id
//!
//! The index is best-effort ANN; recall need not be 1.0, but near-exact
//! duplicates (similarity >= 0.99) are always surfaced when present,
//! which the admission gate relies on. Vectors are stored as f32 so an
//! identical candidate scores ~1.0 instead of losing precision to
//! quantization.

use std::collections::HashMap;

use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::engram::{EngramState, Tier};
use crate::error::{CortexError, Result};

// ============================================================================
// CONSTANTS
// ============================================================================

/// HNSW connectivity parameter (higher = better recall, more memory)
pub const DEFAULT_CONNECTIVITY: usize = 16;

/// HNSW expansion factor for index building
pub const DEFAULT_EXPANSION_ADD: usize = 128;

/// HNSW expansion factor for search (higher = better recall, slower)
pub const DEFAULT_EXPANSION_SEARCH: usize = 64;

/// Oversampling multiplier applied before metadata filtering
const FILTER_OVERSAMPLE: usize = 4;

// ============================================================================
// METADATA / FILTER
// ============================================================================

/// Per-entry metadata used for filtered search
#[derive(Debug, Clone)]
pub struct EntryMeta {
    /// Tenant scope
    pub tenant_id: String,
    /// Project scope
    pub project_id: String,
    /// Last persisted energy (pre-decay upper bound)
    pub energy: f64,
    /// Frequency tier hint
    pub tier: Tier,
    /// Protected-from-pruning flag
    pub is_diamond: bool,
    /// Lifecycle state; only searchable states are returned
    pub state: EngramState,
}

/// Search filter derived from the retrieval band and the caller's scope
#[derive(Debug, Clone)]
pub struct SearchFilter {
    /// Tenant to search within (mandatory isolation)
    pub tenant_id: String,
    /// Caller's project; ignored when `allow_cross_project`
    pub project_id: Option<String>,
    /// Minimum persisted energy
    pub min_energy: f64,
    /// Only return diamonds
    pub required_diamond: bool,
    /// Restrict to these tiers (None = all)
    pub allowed_tiers: Option<Vec<Tier>>,
    /// Permit results from other projects in the tenant
    pub allow_cross_project: bool,
}

impl SearchFilter {
    /// Widest filter for a tenant (used by the admission gate)
    pub fn for_tenant(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            project_id: None,
            min_energy: 0.0,
            required_diamond: false,
            allowed_tiers: None,
            allow_cross_project: true,
        }
    }

    fn admits(&self, meta: &EntryMeta) -> bool {
        if meta.tenant_id != self.tenant_id {
            return false;
        }
        if !meta.state.is_searchable() {
            return false;
        }
        if meta.energy < self.min_energy {
            return false;
        }
        if self.required_diamond && !meta.is_diamond {
            return false;
        }
        if let Some(tiers) = &self.allowed_tiers {
            if !tiers.contains(&meta.tier) {
                return false;
            }
        }
        if !self.allow_cross_project {
            if let Some(project) = &self.project_id {
                if &meta.project_id != project {
                    return false;
                }
            }
        }
        true
    }
}

// ============================================================================
// VECTOR INDEX
// ============================================================================

/// Filtered HNSW vector index
pub struct VectorIndex {
    index: Index,
    dimensions: usize,
    key_to_id: HashMap<String, u64>,
    id_to_key: HashMap<u64, String>,
    meta: HashMap<String, EntryMeta>,
    next_id: u64,
}

impl VectorIndex {
    /// Create a new index for the given dimensionality
    pub fn new(dimensions: usize) -> Result<Self> {
        if dimensions == 0 {
            return Err(CortexError::Validation(
                "vector index dimensions must be positive".to_string(),
            ));
        }
        let options = IndexOptions {
            dimensions,
            metric: MetricKind::Cos,
            quantization: ScalarKind::F32,
            connectivity: DEFAULT_CONNECTIVITY,
            expansion_add: DEFAULT_EXPANSION_ADD,
            expansion_search: DEFAULT_EXPANSION_SEARCH,
            multi: false,
        };

        let index =
            Index::new(&options).map_err(|e| CortexError::IndexUnavailable(e.to_string()))?;

        Ok(Self {
            index,
            dimensions,
            key_to_id: HashMap::new(),
            id_to_key: HashMap::new(),
            meta: HashMap::new(),
            next_id: 0,
        })
    }

    /// Number of vectors in the index
    pub fn len(&self) -> usize {
        self.index.size()
    }

    /// Whether the index is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index dimensionality
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// Whether a key is present
    pub fn contains(&self, key: &str) -> bool {
        self.key_to_id.contains_key(key)
    }

    fn check_dims(&self, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dimensions {
            return Err(CortexError::InvalidDimensions {
                expected: self.dimensions,
                got: vector.len(),
            });
        }
        Ok(())
    }

    fn reserve_for_one(&self) -> Result<()> {
        let capacity = self.index.capacity();
        let size = self.index.size();
        if size >= capacity {
            // usearch requires reserve() before add() to avoid segfaults
            let new_capacity = std::cmp::max(capacity * 2, 16);
            self.index
                .reserve(new_capacity)
                .map_err(|e| CortexError::IndexUnavailable(e.to_string()))?;
        }
        Ok(())
    }

    /// Insert or replace a vector with its metadata. Idempotent.
    pub fn upsert(&mut self, key: &str, vector: &[f32], meta: EntryMeta) -> Result<()> {
        self.check_dims(vector)?;

        if let Some(&existing_id) = self.key_to_id.get(key) {
            self.index
                .remove(existing_id)
                .map_err(|e| CortexError::IndexUnavailable(e.to_string()))?;
            self.reserve_for_one()?;
            self.index
                .add(existing_id, vector)
                .map_err(|e| CortexError::IndexUnavailable(e.to_string()))?;
            self.meta.insert(key.to_string(), meta);
            return Ok(());
        }

        self.reserve_for_one()?;
        let id = self.next_id;
        self.next_id += 1;

        self.index
            .add(id, vector)
            .map_err(|e| CortexError::IndexUnavailable(e.to_string()))?;

        self.key_to_id.insert(key.to_string(), id);
        self.id_to_key.insert(id, key.to_string());
        self.meta.insert(key.to_string(), meta);

        Ok(())
    }

    /// Remove a vector by key
    pub fn delete(&mut self, key: &str) -> Result<bool> {
        if let Some(id) = self.key_to_id.remove(key) {
            self.id_to_key.remove(&id);
            self.meta.remove(key);
            self.index
                .remove(id)
                .map_err(|e| CortexError::IndexUnavailable(e.to_string()))?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Update the persisted-energy metadata (homeostasis batch path)
    pub fn set_energy(&mut self, key: &str, energy: f64) {
        if let Some(meta) = self.meta.get_mut(key) {
            meta.energy = energy;
        }
    }

    /// Update the tier metadata (tier migration path)
    pub fn set_tier(&mut self, key: &str, tier: Tier) {
        if let Some(meta) = self.meta.get_mut(key) {
            meta.tier = tier;
        }
    }

    /// Update the lifecycle-state metadata (maturation path)
    pub fn set_state(&mut self, key: &str, state: EngramState) {
        if let Some(meta) = self.meta.get_mut(key) {
            meta.state = state;
        }
    }

    /// Search for the k nearest entries admitted by the filter.
    ///
    /// Returns `(key, cosine_similarity)` pairs sorted descending by
    /// similarity with lexicographic id tie-break.
    pub fn search(
        &self,
        query: &[f32],
        k: usize,
        filter: &SearchFilter,
    ) -> Result<Vec<(String, f32)>> {
        self.check_dims(query)?;

        if self.is_empty() || k == 0 {
            return Ok(vec![]);
        }

        // Cosine is undefined on a zero vector; treat as "no neighbors"
        if crate::capabilities::is_zero_vector(query) {
            return Ok(vec![]);
        }

        // Oversample before filtering; usearch caps the result set at
        // the index size on its own
        let limit = (k * FILTER_OVERSAMPLE).max(k);
        let matches = self
            .index
            .search(query, limit)
            .map_err(|e| CortexError::IndexUnavailable(e.to_string()))?;

        let mut results: Vec<(String, f32)> = Vec::with_capacity(matches.keys.len());
        for (internal, distance) in matches.keys.iter().zip(matches.distances.iter()) {
            let Some(key) = self.id_to_key.get(internal) else {
                continue;
            };
            let Some(meta) = self.meta.get(key) else {
                continue;
            };
            if !filter.admits(meta) {
                continue;
            }
            // Convert cosine distance to similarity
            results.push((key.clone(), 1.0 - distance));
        }

        results.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        results.truncate(k);
        Ok(results)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const DIMS: usize = 64;

    fn meta(tenant: &str, project: &str) -> EntryMeta {
        EntryMeta {
            tenant_id: tenant.to_string(),
            project_id: project.to_string(),
            energy: 1.0,
            tier: Tier::Hot,
            is_diamond: false,
            state: EngramState::Active,
        }
    }

    fn test_vector(seed: f32) -> Vec<f32> {
        (0..DIMS)
            .map(|i| ((i as f32 + seed) / DIMS as f32).sin())
            .collect()
    }

    #[test]
    fn test_upsert_and_search() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let v1 = test_vector(1.0);
        let v2 = test_vector(2.0);
        let v3 = test_vector(100.0);

        index.upsert("e-1", &v1, meta("t", "p")).unwrap();
        index.upsert("e-2", &v2, meta("t", "p")).unwrap();
        index.upsert("e-3", &v3, meta("t", "p")).unwrap();
        assert_eq!(index.len(), 3);

        let results = index.search(&v1, 3, &SearchFilter::for_tenant("t")).unwrap();
        assert_eq!(results[0].0, "e-1");
        assert!(results[0].1 > 0.99);
    }

    #[test]
    fn test_upsert_is_idempotent() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let v = test_vector(1.0);
        index.upsert("e-1", &v, meta("t", "p")).unwrap();
        index.upsert("e-1", &v, meta("t", "p")).unwrap();
        assert_eq!(index.len(), 1);
    }

    #[test]
    fn test_tenant_isolation() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let v = test_vector(1.0);
        index.upsert("e-1", &v, meta("t-1", "p")).unwrap();

        let hits = index.search(&v, 5, &SearchFilter::for_tenant("t-2")).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_silent_entries_invisible() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let v = test_vector(1.0);
        let mut m = meta("t", "p");
        m.state = EngramState::Silent;
        index.upsert("e-silent", &v, m).unwrap();

        let hits = index.search(&v, 5, &SearchFilter::for_tenant("t")).unwrap();
        assert!(hits.is_empty());

        // Maturation makes it visible
        index.set_state("e-silent", EngramState::Matured);
        let hits = index.search(&v, 5, &SearchFilter::for_tenant("t")).unwrap();
        assert_eq!(hits.len(), 1);
    }

    #[test]
    fn test_energy_floor_filter() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let v = test_vector(1.0);
        let mut weak = meta("t", "p");
        weak.energy = 0.2;
        index.upsert("e-weak", &v, weak).unwrap();
        index.upsert("e-strong", &test_vector(1.5), meta("t", "p")).unwrap();

        let mut filter = SearchFilter::for_tenant("t");
        filter.min_energy = 0.5;
        let hits = index.search(&v, 5, &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "e-strong");
    }

    #[test]
    fn test_diamond_and_project_filters() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let v = test_vector(1.0);
        let mut diamond = meta("t", "other");
        diamond.is_diamond = true;
        index.upsert("e-diamond", &v, diamond).unwrap();
        index.upsert("e-plain", &test_vector(1.2), meta("t", "mine")).unwrap();

        let mut filter = SearchFilter::for_tenant("t");
        filter.required_diamond = true;
        let hits = index.search(&v, 5, &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "e-diamond");

        let mut filter = SearchFilter::for_tenant("t");
        filter.project_id = Some("mine".to_string());
        filter.allow_cross_project = false;
        let hits = index.search(&v, 5, &filter).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].0, "e-plain");
    }

    #[test]
    fn test_zero_query_returns_nothing() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        index.upsert("e-1", &test_vector(1.0), meta("t", "p")).unwrap();

        let zeros = vec![0.0f32; DIMS];
        let hits = index.search(&zeros, 5, &SearchFilter::for_tenant("t")).unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn test_invalid_dimensions_rejected() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let wrong = vec![1.0f32; 3];
        assert!(matches!(
            index.upsert("e-1", &wrong, meta("t", "p")),
            Err(CortexError::InvalidDimensions { expected: 64, got: 3 })
        ));
        assert!(index.search(&wrong, 5, &SearchFilter::for_tenant("t")).is_err());
    }

    #[test]
    fn test_delete() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let v = test_vector(1.0);
        index.upsert("e-1", &v, meta("t", "p")).unwrap();
        assert!(index.delete("e-1").unwrap());
        assert!(!index.delete("e-1").unwrap());
        assert!(!index.contains("e-1"));
    }

    #[test]
    fn test_tie_break_on_id() {
        let mut index = VectorIndex::new(DIMS).unwrap();
        let v = test_vector(1.0);
        // Two identical vectors: order must be lexicographic by id
        index.upsert("e-b", &v, meta("t", "p")).unwrap();
        index.upsert("e-a", &v, meta("t", "p")).unwrap();

        let hits = index.search(&v, 2, &SearchFilter::for_tenant("t")).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].0, "e-a");
        assert_eq!(hits[1].0, "e-b");
    }
}
