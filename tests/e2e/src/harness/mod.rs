//! Test Engine Harness
//!
//! Provides isolated engine instances for testing:
//! - Temporary databases that are automatically cleaned up
//! - A deterministic encoder and a manually advanced clock
//! - Seeding helpers for common scenarios

use std::path::PathBuf;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use cortex_core::{
    Confidence, CortexConfig, CortexCore, FactType, FeatureHashEncoder, ManualClock, QueryHints,
    SearchRequest, SearchResponse, StoreInput, StoreResult,
};
use tempfile::TempDir;

/// Encoder dimension used across the e2e suites
pub const TEST_DIMENSIONS: usize = 128;

/// An isolated engine with deterministic capabilities
pub struct TestCortex {
    /// The engine under test
    pub core: CortexCore,
    /// Advanceable clock shared with the engine
    pub clock: ManualClock,
    /// Temporary directory (kept alive to prevent premature deletion)
    _temp_dir: TempDir,
    db_path: PathBuf,
}

impl TestCortex {
    /// Create an engine in a temp directory with default configuration
    pub fn new() -> Self {
        Self::with_config(CortexConfig::default())
    }

    /// Create an engine with a custom configuration
    pub fn with_config(config: CortexConfig) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let db_path = temp_dir.path().join("test_cortex.db");
        let clock = ManualClock::new(fixed_epoch());

        let core = CortexCore::new(
            Some(db_path.clone()),
            config,
            Arc::new(FeatureHashEncoder::new(TEST_DIMENSIONS)),
            Arc::new(clock.clone()),
        )
        .expect("Failed to create test engine");

        Self {
            core,
            clock,
            _temp_dir: temp_dir,
            db_path,
        }
    }

    /// Database path (for reopen scenarios)
    pub fn path(&self) -> &PathBuf {
        &self.db_path
    }

    /// Reopen the engine over the same database, preserving the clock
    pub fn reopen(self) -> Self {
        let TestCortex {
            core,
            clock,
            _temp_dir,
            db_path,
        } = self;
        drop(core);

        let reopened = CortexCore::new(
            Some(db_path.clone()),
            CortexConfig::default(),
            Arc::new(FeatureHashEncoder::new(TEST_DIMENSIONS)),
            Arc::new(clock.clone()),
        )
        .expect("Failed to reopen test engine");

        Self {
            core: reopened,
            clock,
            _temp_dir,
            db_path,
        }
    }

    /// Advance the shared clock
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Store a fact with default tenant/project scoping
    pub fn store_fact(&self, content: &str, fact_type: FactType) -> StoreResult {
        self.store_scoped("tenant-1", "project-a", content, fact_type)
    }

    /// Store a fact with explicit scoping
    pub fn store_scoped(
        &self,
        tenant: &str,
        project: &str,
        content: &str,
        fact_type: FactType,
    ) -> StoreResult {
        self.core
            .store(StoreInput {
                tenant_id: tenant.to_string(),
                project_id: project.to_string(),
                content: content.to_string(),
                fact_type,
                confidence: Confidence::C3,
                ..Default::default()
            })
            .expect("store failed")
    }

    /// Search within the default scope
    pub fn search_text(&self, query: &str) -> SearchResponse {
        self.search_with_hints(query, QueryHints::default())
    }

    /// Search with explicit band hints
    pub fn search_with_hints(&self, query: &str, hints: QueryHints) -> SearchResponse {
        self.core
            .search(SearchRequest {
                tenant_id: "tenant-1".to_string(),
                project_id: Some("project-a".to_string()),
                query: query.to_string(),
                query_vector: None,
                hints,
                deadline: None,
            })
            .expect("search failed")
    }

    /// Seed a batch of distinct knowledge facts
    pub fn seed_facts(&self, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| {
                self.store_fact(
                    &format!("observation {} for shard {}", i, i),
                    FactType::Knowledge,
                )
                .engram_id
            })
            .collect()
    }
}

impl Default for TestCortex {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed starting instant so journeys are reproducible
pub fn fixed_epoch() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2026-03-01T08:00:00+00:00")
        .expect("valid epoch")
        .with_timezone(&Utc)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_harness_boots_clean_engine() {
        let harness = TestCortex::new();
        let stats = harness.core.stats("tenant-1").unwrap();
        assert_eq!(stats.total, 0);
    }

    #[test]
    fn test_seeding() {
        let harness = TestCortex::new();
        let ids = harness.seed_facts(4);
        assert_eq!(ids.len(), 4);
        // Each fact lands with its silent twin
        assert_eq!(harness.core.stats("tenant-1").unwrap().total, 8);
    }
}
