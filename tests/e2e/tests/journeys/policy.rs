//! Policy journeys: Bellman action queue over real stored memory.

use chrono::Duration;
use cortex_e2e_tests::harness::TestCortex;

use cortex_core::{ActionType, CortexConfig, FactType};

#[test]
fn recent_error_leads_the_queue() {
    let harness = TestCortex::new();

    harness.store_fact("use rust for the rewrite", FactType::Decision);
    harness.advance(Duration::days(25));
    harness.store_fact("refactor pending for months", FactType::Ghost);
    harness.advance(Duration::days(5));
    harness.store_fact("prod is broken", FactType::Error);
    harness.advance(Duration::hours(1));

    let actions = harness.core.prioritize("tenant-1", None).unwrap();
    let order: Vec<FactType> = actions.iter().map(|a| a.source_type).collect();
    assert_eq!(
        order,
        vec![FactType::Error, FactType::Ghost, FactType::Decision]
    );

    // The blocking recent error saturates at the clamp
    assert!((actions[0].value - 1.0).abs() < 1e-9);
    assert_eq!(actions[0].action_type, ActionType::FixError);
}

#[test]
fn blocking_keywords_raise_impact() {
    let harness = TestCortex::new();
    harness.store_fact("minor logging glitch somewhere", FactType::Error);
    harness.store_fact("release deploy blocked by migration", FactType::Error);
    harness.advance(Duration::days(2));

    let actions = harness.core.prioritize("tenant-1", None).unwrap();
    let blocking = actions
        .iter()
        .find(|a| a.description.contains("deploy blocked"))
        .unwrap();
    let quiet = actions
        .iter()
        .find(|a| a.description.contains("logging glitch"))
        .unwrap();

    assert!(blocking.impact > quiet.impact);
    assert!(blocking.value >= quiet.value);
}

#[test]
fn cross_project_bridge_outranks_local_knowledge() {
    let harness = TestCortex::new();
    harness.store_scoped(
        "tenant-1",
        "api",
        "billing retry pattern applies here too",
        FactType::Bridge,
    );
    harness.store_scoped("tenant-1", "billing", "invoices close monthly", FactType::Knowledge);
    harness.advance(Duration::days(1));

    let actions = harness.core.prioritize("tenant-1", None).unwrap();
    assert_eq!(actions[0].action_type, ActionType::ApplyBridge);
    // The bridge's content mentions the other project
    assert!(actions[0].impact > 0.0);
}

#[test]
fn project_scope_limits_the_queue() {
    let harness = TestCortex::new();
    harness.store_scoped("tenant-1", "api", "api handler panics sometimes", FactType::Error);
    harness.store_scoped("tenant-1", "billing", "billing worker stalls", FactType::Error);

    let actions = harness.core.prioritize("tenant-1", Some("api")).unwrap();
    assert!(!actions.is_empty());
    assert!(actions.iter().all(|a| a.project == "api"));
}

#[test]
fn max_actions_caps_queue_length() {
    let harness = TestCortex::with_config(CortexConfig {
        max_actions: 3,
        ..Default::default()
    });
    harness.seed_facts(10);

    let actions = harness.core.prioritize("tenant-1", None).unwrap();
    assert_eq!(actions.len(), 3);
}

#[test]
fn metadata_carries_provenance() {
    let harness = TestCortex::new();
    harness.store_fact("documented decision with context", FactType::Decision);

    let actions = harness.core.prioritize("tenant-1", None).unwrap();
    let action = &actions[0];
    assert!(action.metadata.contains_key("confidence"));
    assert!(action.metadata.contains_key("created_at"));
    assert_eq!(action.metadata.get("consensus_score").map(String::as_str), Some("1.00"));
}
