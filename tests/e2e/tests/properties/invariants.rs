//! System invariants checked across operation sequences.

use chrono::Duration;
use cortex_e2e_tests::harness::TestCortex;

use cortex_core::{Clock, EngramState, FactType, ScanFilter, StoreOutcome, Tier, TierClassifier};

fn all_rows(harness: &TestCortex) -> Vec<cortex_core::Engram> {
    harness
        .core
        .engram_store()
        .scan("tenant-1", None, &ScanFilter::default())
        .unwrap()
}

#[test]
fn energy_stays_in_unit_interval_across_lifecycle() {
    let harness = TestCortex::new();
    let ids = harness.seed_facts(5);

    // Exercise every energy-mutating path
    harness.search_text("observation 0 for shard 0");
    harness.core.confirm(&ids[0]).unwrap();
    harness.search_text("observation 1 for shard 1");
    harness.advance(Duration::seconds(301));
    harness.core.prune_cycle("tenant-1").unwrap();
    harness.advance(Duration::days(2));
    harness.core.prune_cycle("tenant-1").unwrap();
    harness.advance(Duration::days(50));
    harness.core.prune_cycle("tenant-1").unwrap();

    for engram in all_rows(&harness) {
        assert!(
            (0.0..=1.0).contains(&engram.energy_level),
            "energy out of bounds for {}: {}",
            engram.id,
            engram.energy_level
        );
    }
}

#[test]
fn access_count_never_decreases() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("counted fact under observation", FactType::Knowledge);

    let mut last = 0i64;
    for _ in 0..5 {
        harness.search_text("counted fact under observation");
        let row = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();
        assert!(row.access_count >= last);
        last = row.access_count;
    }
    assert!(last >= 5);

    // Background cycles never decrement the counter
    harness.advance(Duration::days(1));
    harness.core.prune_cycle("tenant-1").unwrap();
    let row = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();
    assert!(row.access_count >= last);
}

#[test]
fn no_depleted_nondiamond_survives_a_prune_cycle() {
    let harness = TestCortex::new();
    harness.seed_facts(6);
    harness.advance(Duration::days(40));
    harness.core.prune_cycle("tenant-1").unwrap();

    let now = harness.clock.now();
    let decay_rate = harness.core.config().decay_rate_per_day;
    let atp = harness.core.config().atp_threshold;

    for engram in all_rows(&harness) {
        if engram.state == EngramState::Silent || engram.is_diamond {
            continue;
        }
        assert!(
            engram.compute_decay(now, decay_rate) >= atp,
            "depleted engram {} survived the cycle",
            engram.id
        );
    }
}

#[test]
fn duplicate_store_leaves_exactly_one_active_with_entanglement() {
    let harness = TestCortex::new();
    harness.store_fact("single source of truth", FactType::Knowledge);
    let second = harness.store_fact("single source of truth", FactType::Knowledge);
    assert_eq!(second.outcome, StoreOutcome::Resonance);

    let actives: Vec<_> = all_rows(&harness)
        .into_iter()
        .filter(|e| e.state == EngramState::Active)
        .collect();
    assert_eq!(actives.len(), 1);
    assert_eq!(actives[0].entangled_refs.len(), 1);
}

#[test]
fn matured_engrams_were_clean_for_the_full_period() {
    let harness = TestCortex::new();
    harness.store_fact("steady uncontested observation", FactType::Knowledge);
    harness.advance(Duration::days(4));
    harness.core.prune_cycle("tenant-1").unwrap();

    let maturation_days = harness.core.config().maturation_days;
    let now = harness.clock.now();
    for engram in all_rows(&harness) {
        if engram.state != EngramState::Matured {
            continue;
        }
        assert_eq!(engram.contradiction_count, 0);
        assert!(engram.age_days(now) >= maturation_days);
    }
}

#[test]
fn search_only_surfaces_searchable_states() {
    let harness = TestCortex::new();
    harness.seed_facts(4);

    let response = harness.search_text("observation 2 for shard 2");
    for hit in &response.results {
        let row = harness.core.engram_store().get(&hit.id).unwrap().unwrap();
        assert!(matches!(
            row.state,
            EngramState::Active | EngramState::Matured
        ));
    }
}

#[test]
fn tier_classifier_is_a_pure_function() {
    let classifier = TierClassifier::default();
    for (count, energy, expected) in [
        (0i64, 1.0, Tier::Hot),
        (8, 0.5, Tier::Warm),
        (32, 0.6, Tier::Cold),
        (128, 0.9, Tier::Permafrost),
        (128, 0.1, Tier::Hot),
    ] {
        for _ in 0..3 {
            assert_eq!(classifier.classify(count, energy), expected);
        }
    }
}

#[test]
fn session_guardrail_accounting_holds() {
    let harness = TestCortex::new();
    let mut guardrail = harness.core.session_guardrail();
    let max = harness.core.config().max_session_tokens;

    let mut consumed_before = guardrail.consumed();
    for chunk in [1000u64, 5000, 20_000, 200_000] {
        let accepted = guardrail.consume(chunk);
        // Consumed never decreases, and the ledger always balances
        assert!(guardrail.consumed() >= consumed_before);
        assert_eq!(guardrail.consumed() + guardrail.remaining(), max);
        if !accepted {
            assert_eq!(guardrail.consumed(), consumed_before);
        }
        consumed_before = guardrail.consumed();
    }
}

#[test]
fn working_set_buffer_respects_budget() {
    let harness = TestCortex::new();
    let mut buffer = harness.core.working_set_buffer();
    let budget = harness.core.config().working_set_max_tokens;

    for i in 0..100 {
        buffer.add_event(cortex_core::BufferedEvent {
            content: format!("event {}", i),
            tokens: 500,
        });
        assert!(buffer.current_tokens() <= budget);
    }
    assert!(!buffer.is_empty());
}
