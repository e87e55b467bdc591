//! Consolidation journeys: dual-trace creation, maturation, contradiction,
//! thermodynamic pruning.

use chrono::Duration;
use cortex_e2e_tests::harness::TestCortex;

use cortex_core::{EngramState, FactType, StoreInput};

#[test]
fn store_creates_active_plus_silent_twin() {
    let harness = TestCortex::new();
    let result = harness.store_fact("we migrated to arena allocation", FactType::Decision);
    let silent_id = result.silent_id.expect("reset must create a silent twin");

    let stats = harness.core.stats("tenant-1").unwrap();
    assert_eq!(stats.active, 1);
    assert_eq!(stats.silent, 1);

    let silent = harness.core.engram_store().get(&silent_id).unwrap().unwrap();
    assert_eq!(silent.state, EngramState::Silent);
    assert_eq!(silent.active_twin_id.as_deref(), Some(result.engram_id.as_str()));
    assert_eq!(silent.content, "we migrated to arena allocation");

    // The silent trace is invisible to natural retrieval
    let response = harness.search_text("we migrated to arena allocation");
    assert!(response.results.iter().all(|r| r.id != silent_id));
}

#[test]
fn silent_twin_matures_after_three_clean_days() {
    let harness = TestCortex::new();
    let result = harness.store_fact("we migrated to arena allocation", FactType::Decision);
    let silent_id = result.silent_id.unwrap();

    harness.advance(Duration::days(3) + Duration::hours(1));
    let report = harness.core.prune_cycle("tenant-1").unwrap();
    assert_eq!(report.matured, 1);

    let matured = harness.core.engram_store().get(&silent_id).unwrap().unwrap();
    assert_eq!(matured.state, EngramState::Matured);

    // Maturation makes the twin searchable
    let response = harness.search_text("we migrated to arena allocation");
    assert!(response.results.iter().any(|r| r.id == silent_id));
}

#[test]
fn contradicted_silent_never_matures_and_eventually_dies() {
    let harness = TestCortex::new();
    let result = harness.store_fact("disputed architectural claim", FactType::Decision);
    let silent_id = result.silent_id.unwrap();

    // Labilize the active twin, then contradict inside the window
    harness.search_text("disputed architectural claim");
    assert!(harness.core.contradict(&result.engram_id).unwrap());

    let silent = harness.core.engram_store().get(&silent_id).unwrap().unwrap();
    assert_eq!(silent.contradiction_count, 1);

    // The reset clock means three days later it is still pending
    harness.advance(Duration::days(3) + Duration::hours(1));
    let report = harness.core.prune_cycle("tenant-1").unwrap();
    assert_eq!(report.matured, 0);

    // Once its energy is gone the contradicted twin is reclaimed
    harness.advance(Duration::days(20));
    let report = harness.core.prune_cycle("tenant-1").unwrap();
    assert!(report.deceased >= 1);
    assert!(harness.core.engram_store().get(&silent_id).unwrap().is_none());
}

#[test]
fn stale_knowledge_is_pruned_from_store_and_index() {
    let harness = TestCortex::new();
    let result = harness.store_fact("ephemeral operational note", FactType::Knowledge);

    harness.advance(Duration::days(100));
    let report = harness.core.prune_cycle("tenant-1").unwrap();
    assert!(report.pruned >= 1);

    // Gone from the store
    assert!(harness.core.engram_store().get(&result.engram_id).unwrap().is_none());
    // Gone from retrieval
    let response = harness.search_text("ephemeral operational note");
    assert!(response.results.is_empty());
    // Lifetime counter reflects the death
    assert!(harness.core.stats("tenant-1").unwrap().deceased >= 1);
}

#[test]
fn diamonds_survive_total_energy_depletion() {
    let harness = TestCortex::new();
    let diamond = harness
        .core
        .store(StoreInput {
            tenant_id: "tenant-1".to_string(),
            project_id: "project-a".to_string(),
            content: "axiomatic invariant never prune".to_string(),
            fact_type: FactType::Rule,
            is_diamond: true,
            ..Default::default()
        })
        .unwrap();

    harness.advance(Duration::days(365));
    harness.core.prune_cycle("tenant-1").unwrap();

    let row = harness.core.engram_store().get(&diamond.engram_id).unwrap().unwrap();
    assert!(row.is_diamond);
    // Energy floored at zero but the row survives
    assert!(row.energy_level >= 0.0);
}

#[test]
fn prune_cycle_is_idempotent() {
    let harness = TestCortex::new();
    harness.store_fact("fact that will decay away", FactType::Knowledge);
    harness.store_fact("another transient note entirely", FactType::Knowledge);

    harness.advance(Duration::days(100));
    harness.core.prune_cycle("tenant-1").unwrap();
    let stats_after_first = harness.core.stats("tenant-1").unwrap();

    let second = harness.core.prune_cycle("tenant-1").unwrap();
    let stats_after_second = harness.core.stats("tenant-1").unwrap();

    assert_eq!(second.pruned, 0);
    assert_eq!(second.deceased, 0);
    assert_eq!(second.decayed, 0);
    assert_eq!(stats_after_first.total, stats_after_second.total);
    assert_eq!(stats_after_first.deceased, stats_after_second.deceased);
}

#[test]
fn orphaned_silent_promotes_when_active_is_deleted_late() {
    let harness = TestCortex::new();
    let result = harness.store_fact("long lived design note", FactType::Decision);
    let silent_id = result.silent_id.unwrap();

    // Past maturation age with healthy energy: deleting the active
    // promotes the twin instead of reclaiming it
    harness.advance(Duration::days(3) + Duration::hours(1));
    assert!(harness.core.delete(&result.engram_id).unwrap());

    let silent = harness.core.engram_store().get(&silent_id).unwrap().unwrap();
    assert_eq!(silent.state, EngramState::Matured);
}

#[test]
fn orphaned_young_silent_is_reclaimed_with_active() {
    let harness = TestCortex::new();
    let result = harness.store_fact("short lived design note", FactType::Decision);
    let silent_id = result.silent_id.unwrap();

    assert!(harness.core.delete(&result.engram_id).unwrap());
    assert!(harness.core.engram_store().get(&silent_id).unwrap().is_none());
}
