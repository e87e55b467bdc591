//! Retrieval journeys: band routing, decay-applied floors,
//! reconsolidation windows, anticipatory prefetch.

use chrono::Duration;
use cortex_e2e_tests::harness::TestCortex;

use cortex_core::{FactType, QueryHints, RetrievalBand, SearchRequest, StoreInput};

#[test]
fn stored_fact_is_found_by_its_own_content() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("cache write-through", FactType::Decision);

    let response = harness.search_text("cache write-through");
    assert_eq!(response.band, RetrievalBand::Gamma);
    assert_eq!(response.results[0].id, stored.engram_id);
    // The stored engram comes back at resonance-grade similarity
    assert!(response.results[0].score >= 0.85);
}

#[test]
fn band_routing_follows_query_shape_and_hints() {
    let harness = TestCortex::new();
    harness.store_fact("background fact for routing", FactType::Knowledge);

    let gamma = harness.search_text("cache policy");
    assert_eq!(gamma.band, RetrievalBand::Gamma);

    let beta = harness.search_text("why did the cache policy change last week");
    assert_eq!(beta.band, RetrievalBand::Beta);

    let theta = harness.search_with_hints(
        "shared retry pattern",
        QueryHints {
            is_cross_project: true,
            ..Default::default()
        },
    );
    assert_eq!(theta.band, RetrievalBand::Theta);

    let delta = harness.search_with_hints(
        "foundational axioms",
        QueryHints {
            is_axiom_lookup: true,
            ..Default::default()
        },
    );
    assert_eq!(delta.band, RetrievalBand::Delta);
}

#[test]
fn delta_band_returns_only_diamonds() {
    let harness = TestCortex::new();
    harness.store_fact("ordinary operational knowledge", FactType::Knowledge);
    let diamond = harness
        .core
        .store(StoreInput {
            tenant_id: "tenant-1".to_string(),
            project_id: "project-a".to_string(),
            content: "never deploy on friday".to_string(),
            fact_type: FactType::Rule,
            is_diamond: true,
            ..Default::default()
        })
        .unwrap();

    let response = harness.search_with_hints(
        "never deploy on friday",
        QueryHints {
            is_axiom_lookup: true,
            ..Default::default()
        },
    );
    assert!(!response.results.is_empty());
    assert!(response.results.iter().all(|r| r.id == diamond.engram_id));
}

#[test]
fn theta_band_crosses_projects() {
    let harness = TestCortex::new();
    harness.store_scoped("tenant-1", "project-a", "alpha local detail", FactType::Knowledge);
    let other = harness.store_scoped(
        "tenant-1",
        "project-b",
        "beta shared learning",
        FactType::Bridge,
    );

    // Single-project search stays home
    let beta = harness.search_text("beta shared learning");
    assert!(beta.results.iter().all(|r| r.project_id == "project-a"));

    // Cross-project hint reaches project-b
    let theta = harness.search_with_hints(
        "beta shared learning",
        QueryHints {
            is_cross_project: true,
            ..Default::default()
        },
    );
    assert!(theta.results.iter().any(|r| r.id == other.engram_id));
}

#[test]
fn decayed_energy_fails_the_band_floor() {
    let harness = TestCortex::new();
    harness.store_fact("will fade below gamma floor", FactType::Knowledge);

    // Some decay: below the gamma floor (0.6) but above beta's (0.3)
    harness.advance(Duration::days(3));
    let gamma = harness.search_text("fade below gamma");
    assert!(gamma.results.is_empty());

    let beta = harness.search_text("will it fade below the gamma floor");
    assert!(!beta.results.is_empty());
}

#[test]
fn confirm_within_window_boosts_energy() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("confirmable operational insight", FactType::Knowledge);
    let before = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();

    harness.search_text("confirmable operational insight");
    harness.advance(Duration::seconds(60));
    assert!(harness.core.confirm(&stored.engram_id).unwrap());

    let after = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();
    assert!((after.energy_level - before.energy_level - 0.2).abs() < 1e-6);

    // The window is consumed: a second confirm is a no-op
    assert!(!harness.core.confirm(&stored.engram_id).unwrap());
}

#[test]
fn confirm_after_window_returns_false() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("perishable labile insight", FactType::Knowledge);

    harness.search_text("perishable labile insight");
    harness.advance(Duration::seconds(301));
    assert!(!harness.core.confirm(&stored.engram_id).unwrap());
}

#[test]
fn ignored_access_decays_energy_by_penalty() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("fact accessed then ignored", FactType::Knowledge);

    harness.search_text("fact accessed then ignored");
    let before = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();

    harness.advance(Duration::seconds(301));
    let report = harness.core.prune_cycle("tenant-1").unwrap();
    assert_eq!(report.expired_labiles, 1);

    let after = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();
    assert!((before.energy_level - after.energy_level - 0.15).abs() < 1e-6);
}

#[test]
fn reaccess_reopens_the_labile_window() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("repeatedly consulted fact", FactType::Knowledge);

    harness.search_text("repeatedly consulted fact");
    harness.advance(Duration::seconds(250));
    harness.search_text("repeatedly consulted fact");
    harness.advance(Duration::seconds(100));

    // 350s after the first access but only 100s after the second
    assert!(harness.core.confirm(&stored.engram_id).unwrap());
}

#[test]
fn coaccess_pattern_emits_prefetch() {
    let harness = TestCortex::new();
    let a = harness.store_fact("first habitual lookup", FactType::Knowledge);
    let b = harness.store_fact("second habitual lookup", FactType::Knowledge);

    // Repeatedly retrieve A then B to carve the co-access edge
    for _ in 0..3 {
        harness.search_text("first habitual lookup");
        harness.search_text("second habitual lookup");
    }

    let response = harness.search_text("first habitual lookup");
    assert!(response.results[0].id == a.engram_id);
    let prefetch = response.prefetch.expect("expected a prefetch plan");
    assert!(prefetch.prefetched_ids.contains(&b.engram_id));
}

#[test]
fn read_your_writes_in_recall() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("immediately recallable fact", FactType::Knowledge);

    let recalled = harness.core.recall("tenant-1", Some("project-a")).unwrap();
    assert!(recalled.iter().any(|e| e.id == stored.engram_id));
}

#[test]
fn repeated_access_promotes_tier() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("frequently accessed hot fact", FactType::Knowledge);

    for _ in 0..8 {
        harness.search_text("frequently accessed hot fact");
    }

    let row = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();
    assert!(row.access_count >= 8);
    assert_eq!(row.tier, cortex_core::Tier::Warm);
}

#[test]
fn expired_deadline_fails_fast() {
    let harness = TestCortex::new();
    harness.store_fact("deadline guarded fact", FactType::Knowledge);

    let result = harness.core.search(SearchRequest {
        tenant_id: "tenant-1".to_string(),
        project_id: Some("project-a".to_string()),
        query: "deadline guarded fact".to_string(),
        query_vector: None,
        hints: QueryHints::default(),
        deadline: Some(std::time::Instant::now() - std::time::Duration::from_millis(10)),
    });
    assert!(matches!(result, Err(cortex_core::CortexError::Timeout)));
}
