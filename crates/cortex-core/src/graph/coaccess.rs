//! Predictive Memory & Anticipatory Caching
//!
//! The co-access graph records "B follows A" retrieval events. When
//! engram A is accessed followed by B, edge A->B strengthens; over time,
//! strong edges enable prediction. The anticipatory cache wraps the graph
//! with a bounded id->engram cache and emits prefetch plans whenever the
//! prediction confidence clears the configured threshold.

use std::collections::HashMap;
use std::num::NonZeroUsize;

use lru::LruCache;
use serde::{Deserialize, Serialize};

use crate::engram::Engram;

// ============================================================================
// CO-ACCESS GRAPH
// ============================================================================

/// Weighted directed graph over engram ids
#[derive(Debug)]
pub struct CoAccessGraph {
    /// edges[a][b] = how often b followed a
    edges: HashMap<String, HashMap<String, f64>>,
    decay_factor: f64,
    last_accessed: Option<String>,
}

/// Edges below this weight are dropped during decay
const EDGE_PRUNE_WEIGHT: f64 = 0.01;

impl CoAccessGraph {
    /// Create a graph with the given per-sweep decay factor
    pub fn new(decay_factor: f64) -> Self {
        Self {
            edges: HashMap::new(),
            decay_factor,
            last_accessed: None,
        }
    }

    /// Record an access event, strengthening the co-access edge from the
    /// previously accessed engram
    pub fn record_access(&mut self, engram_id: &str) {
        if let Some(last) = &self.last_accessed {
            if last != engram_id {
                *self
                    .edges
                    .entry(last.clone())
                    .or_default()
                    .entry(engram_id.to_string())
                    .or_insert(0.0) += 1.0;
            }
        }
        self.last_accessed = Some(engram_id.to_string());
    }

    /// Predict which engrams will be needed next.
    ///
    /// Returns `(engram_id, confidence)` with confidences normalized over
    /// the outgoing edge weights, sorted descending (id tie-break).
    pub fn predict_next(&self, engram_id: &str, top_k: usize) -> Vec<(String, f64)> {
        let Some(neighbors) = self.edges.get(engram_id) else {
            return vec![];
        };
        let total: f64 = neighbors.values().sum();
        if total <= 0.0 {
            return vec![];
        }

        let mut predictions: Vec<(String, f64)> = neighbors
            .iter()
            .map(|(id, weight)| (id.clone(), weight / total))
            .collect();
        predictions.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        predictions.truncate(top_k);
        predictions
    }

    /// Apply temporal decay to all edges; stale patterns fade unless
    /// reinforced, and depleted edges are removed outright
    pub fn decay_all(&mut self) {
        for targets in self.edges.values_mut() {
            targets.retain(|_, weight| {
                *weight *= self.decay_factor;
                *weight >= EDGE_PRUNE_WEIGHT
            });
        }
        self.edges.retain(|_, targets| !targets.is_empty());
    }

    /// Drop every edge touching an engram (engram destruction path)
    pub fn remove_node(&mut self, engram_id: &str) {
        self.edges.remove(engram_id);
        for targets in self.edges.values_mut() {
            targets.remove(engram_id);
        }
        self.edges.retain(|_, targets| !targets.is_empty());
        if self.last_accessed.as_deref() == Some(engram_id) {
            self.last_accessed = None;
        }
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.edges.values().map(HashMap::len).sum()
    }

    /// Number of distinct nodes
    pub fn node_count(&self) -> usize {
        let mut nodes: std::collections::HashSet<&String> = self.edges.keys().collect();
        for targets in self.edges.values() {
            nodes.extend(targets.keys());
        }
        nodes.len()
    }
}

// ============================================================================
// ANTICIPATORY CACHE
// ============================================================================

/// Result of a predictive prefetch evaluation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrefetchResult {
    /// Ids that should be pre-loaded
    pub prefetched_ids: Vec<String>,
    /// Confidence of the strongest prediction
    pub confidence: f64,
    /// The access that triggered the prediction
    pub source_id: String,
}

/// Observability snapshot for cache tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStatus {
    /// Engrams currently cached
    pub cache_size: usize,
    /// Cache hits observed
    pub hits: u64,
    /// Cache misses observed
    pub misses: u64,
    /// hits / (hits + misses)
    pub hit_rate: f64,
    /// Nodes in the co-access graph
    pub graph_nodes: usize,
    /// Edges in the co-access graph
    pub graph_edges: usize,
}

/// Prediction -> prefetch -> prune loop over the co-access graph
pub struct AnticipatoryCache {
    graph: CoAccessGraph,
    prefetch_threshold: f64,
    max_prefetch: usize,
    cache: LruCache<String, Engram>,
    hits: u64,
    misses: u64,
}

impl AnticipatoryCache {
    /// Create a cache over a fresh co-access graph
    pub fn new(
        decay_factor: f64,
        prefetch_threshold: f64,
        max_prefetch: usize,
        cache_size: usize,
    ) -> Self {
        let capacity = NonZeroUsize::new(cache_size.max(1)).expect("cache size clamped to >= 1");
        Self {
            graph: CoAccessGraph::new(decay_factor),
            prefetch_threshold,
            max_prefetch,
            cache: LruCache::new(capacity),
            hits: 0,
            misses: 0,
        }
    }

    /// Record an access and compute the anticipatory prefetch plan
    pub fn on_access(&mut self, engram_id: &str, engram: Option<Engram>) -> PrefetchResult {
        self.graph.record_access(engram_id);

        if self.cache.contains(engram_id) {
            self.hits += 1;
        } else {
            self.misses += 1;
            if let Some(engram) = engram {
                self.cache.put(engram_id.to_string(), engram);
            }
        }

        let predictions = self.graph.predict_next(engram_id, self.max_prefetch);
        let confidence = predictions.first().map(|(_, c)| *c).unwrap_or(0.0);
        let prefetched_ids: Vec<String> = predictions
            .into_iter()
            .filter(|(_, c)| *c >= self.prefetch_threshold)
            .map(|(id, _)| id)
            .collect();

        if !prefetched_ids.is_empty() {
            tracing::debug!(
                source = engram_id,
                candidates = prefetched_ids.len(),
                confidence,
                "Anticipatory prefetch"
            );
        }

        PrefetchResult {
            prefetched_ids,
            confidence,
            source_id: engram_id.to_string(),
        }
    }

    /// Retrieve from the cache (O(1), refreshes LRU position)
    pub fn get_cached(&mut self, engram_id: &str) -> Option<&Engram> {
        self.cache.get(engram_id)
    }

    /// Remove an engram from the cache and the co-access graph
    pub fn evict(&mut self, engram_id: &str) {
        self.cache.pop(engram_id);
        self.graph.remove_node(engram_id);
    }

    /// Apply co-access decay (background cadence)
    pub fn decay_all(&mut self) {
        self.graph.decay_all();
    }

    /// Observed hit rate
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    /// Snapshot for telemetry
    pub fn status(&self) -> CacheStatus {
        CacheStatus {
            cache_size: self.cache.len(),
            hits: self.hits,
            misses: self.misses,
            hit_rate: self.hit_rate(),
            graph_nodes: self.graph.node_count(),
            graph_edges: self.graph.edge_count(),
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
