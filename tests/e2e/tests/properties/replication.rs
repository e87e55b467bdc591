//! CRDT merge laws and replica exchange at the engine surface.

use chrono::Duration;
use cortex_e2e_tests::harness::TestCortex;

use cortex_core::{Clock, CrdtEngram, FactType};

#[test]
fn merge_algebra_holds_for_engine_snapshots() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("replicated shared observation", FactType::Knowledge);

    // Three divergent replicas of the same engram
    let mut a = harness.core.crdt_snapshot(&stored.engram_id, "agent-a").unwrap();
    let mut b = harness.core.crdt_snapshot(&stored.engram_id, "agent-b").unwrap();
    let mut c = harness.core.crdt_snapshot(&stored.engram_id, "agent-c").unwrap();

    let t = harness.clock.now();
    a.access_count.increment("agent-a", 3);
    a.tags.add("from-a", t);
    b.access_count.increment("agent-b", 1);
    b.content.update("revised by b".to_string(), t + Duration::seconds(10), "agent-b");
    c.tags.add("from-c", t + Duration::seconds(5));
    c.energy.update(0.9, t + Duration::seconds(5), "agent-c");

    // Associativity
    let left = a.merge(&b).unwrap().merge(&c).unwrap();
    let right = a.merge(&b.merge(&c).unwrap()).unwrap();
    assert_eq!(left, right);

    // Commutativity
    assert_eq!(a.merge(&b), b.merge(&a));

    // Idempotence
    assert_eq!(left.merge(&left).unwrap(), left);

    // The merged register carries the newest write
    assert_eq!(left.content.value, "revised by b");
    assert_eq!(left.access_count.value(), 4);
}

#[test]
fn merge_replica_persists_growth_into_the_row() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("gossiped engram payload", FactType::Knowledge);

    let mut remote = harness.core.crdt_snapshot(&stored.engram_id, "agent-remote").unwrap();
    remote.access_count.increment("agent-remote", 7);
    remote.tags.add("replica-tag", harness.clock.now());

    harness
        .core
        .merge_replica(&stored.engram_id, &remote, "agent-local")
        .unwrap();

    let row = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();
    assert!(row.access_count >= 7);
    assert!(row.tags.contains(&"replica-tag".to_string()));

    // Re-merging the same remote changes nothing (idempotence on disk)
    let before = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();
    harness
        .core
        .merge_replica(&stored.engram_id, &remote, "agent-local")
        .unwrap();
    let after = harness.core.engram_store().get(&stored.engram_id).unwrap().unwrap();
    assert_eq!(before.access_count, after.access_count);
    assert_eq!(before.tags, after.tags);
    assert_eq!(before.energy_level, after.energy_level);
}

#[test]
fn replicas_of_different_engrams_do_not_merge() {
    let harness = TestCortex::new();
    let first = harness.store_fact("replica subject alpha", FactType::Knowledge);
    let second = harness.store_fact("replica subject bravo", FactType::Knowledge);

    let other = harness.core.crdt_snapshot(&second.engram_id, "agent-x").unwrap();
    let result = harness
        .core
        .merge_replica(&first.engram_id, &other, "agent-x");
    assert!(result.is_err());
}

#[test]
fn snapshot_roundtrips_through_json() {
    let harness = TestCortex::new();
    let stored = harness.store_fact("serializable replica state", FactType::Knowledge);

    let snapshot = harness.core.crdt_snapshot(&stored.engram_id, "agent-a").unwrap();
    let json = serde_json::to_string(&snapshot).unwrap();
    let restored: CrdtEngram = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, snapshot);
}
