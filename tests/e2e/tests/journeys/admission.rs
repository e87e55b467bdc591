//! Admission journeys: resonance vs reset, boundary inputs, isolation.

use cortex_e2e_tests::harness::TestCortex;

use cortex_core::{
    CortexError, EngramState, FactType, QueryHints, SearchRequest, StoreInput, StoreOutcome,
};

#[test]
fn near_duplicate_resonates_instead_of_inserting() {
    let harness = TestCortex::new();

    let first = harness.store_fact("the cache is write-through", FactType::Decision);
    assert_eq!(first.outcome, StoreOutcome::Reset);
    let before = harness.core.engram_store().get(&first.engram_id).unwrap().unwrap();

    let second = harness.store_fact("cache is write-through", FactType::Decision);
    assert_eq!(second.outcome, StoreOutcome::Resonance);
    assert_eq!(second.engram_id, first.engram_id);

    // Reinforcement landed in full
    let after = harness.core.engram_store().get(&first.engram_id).unwrap().unwrap();
    assert!(after.energy_level - before.energy_level >= 0.2);
    assert!(after.last_accessed >= before.last_accessed);
    assert!(!after.entangled_refs.is_empty());

    // Only one active engram exists in the tenant
    let stats = harness.core.stats("tenant-1").unwrap();
    assert_eq!(stats.active, 1);
}

#[test]
fn identical_content_resonates_with_unit_similarity() {
    let harness = TestCortex::new();
    harness.store_fact("retry with exponential backoff", FactType::Rule);

    let dup = harness.store_fact("retry with exponential backoff", FactType::Rule);
    assert_eq!(dup.outcome, StoreOutcome::Resonance);
    assert!(dup.similarity.unwrap() > 0.99);
}

#[test]
fn distinct_content_resets() {
    let harness = TestCortex::new();
    let a = harness.store_fact("invoices are generated monthly", FactType::Knowledge);
    let b = harness.store_fact("websocket handshake requires auth header", FactType::Knowledge);

    assert_eq!(a.outcome, StoreOutcome::Reset);
    assert_eq!(b.outcome, StoreOutcome::Reset);
    assert_ne!(a.engram_id, b.engram_id);
    assert_eq!(harness.core.stats("tenant-1").unwrap().active, 2);
}

#[test]
fn same_content_in_other_tenant_resets() {
    let harness = TestCortex::new();
    let a = harness.store_scoped("tenant-1", "p", "shared fact text", FactType::Knowledge);
    let b = harness.store_scoped("tenant-2", "p", "shared fact text", FactType::Knowledge);

    // Tenants never resonate with each other
    assert_eq!(a.outcome, StoreOutcome::Reset);
    assert_eq!(b.outcome, StoreOutcome::Reset);
    assert_eq!(harness.core.stats("tenant-1").unwrap().active, 1);
    assert_eq!(harness.core.stats("tenant-2").unwrap().active, 1);
}

#[test]
fn empty_content_is_rejected() {
    let harness = TestCortex::new();
    let result = harness.core.store(StoreInput {
        tenant_id: "tenant-1".to_string(),
        project_id: "project-a".to_string(),
        content: "  \n\t ".to_string(),
        ..Default::default()
    });
    assert!(matches!(result, Err(CortexError::Validation(_))));
    assert_eq!(harness.core.stats("tenant-1").unwrap().total, 0);
}

#[test]
fn zero_vector_content_is_treated_as_novel() {
    let harness = TestCortex::new();

    // Pure punctuation encodes to a zero vector: cosine undefined, so
    // admission must take the reset path both times
    let a = harness.store_fact("!!! ???", FactType::Knowledge);
    assert_eq!(a.outcome, StoreOutcome::Reset);
    let b = harness.store_fact("... !!!", FactType::Knowledge);
    assert_eq!(b.outcome, StoreOutcome::Reset);

    assert_eq!(harness.core.stats("tenant-1").unwrap().active, 2);
    let row = harness.core.engram_store().get(&a.engram_id).unwrap().unwrap();
    assert_eq!(row.state, EngramState::Active);
}

#[test]
fn wrong_dimension_query_vector_is_rejected() {
    let harness = TestCortex::new();
    harness.store_fact("dimension checked fact", FactType::Knowledge);

    let result = harness.core.search(SearchRequest {
        tenant_id: "tenant-1".to_string(),
        project_id: Some("project-a".to_string()),
        query: "dimension checked fact".to_string(),
        query_vector: Some(vec![0.5, 0.25, 0.125]),
        hints: QueryHints::default(),
        deadline: None,
    });
    assert!(matches!(
        result,
        Err(CortexError::InvalidDimensions { got: 3, .. })
    ));
}

#[test]
fn resonance_survives_reopen() {
    let harness = TestCortex::new();
    let first = harness.store_fact("the cache is write-through", FactType::Decision);

    // Reboot the engine: bloom and index are rebuilt from the store
    let harness = harness.reopen();
    let second = harness.store_fact("cache is write-through", FactType::Decision);
    assert_eq!(second.outcome, StoreOutcome::Resonance);
    assert_eq!(second.engram_id, first.engram_id);
}
