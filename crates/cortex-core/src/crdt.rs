//! CRDT Memory Merge
//!
//! When multiple agents work in parallel, each accumulates independent
//! memories. CRDTs enable conflict-free merge without coordination:
//!
//! - G-Counter for access counts (only grows, per-agent slots)
//! - LWW-Register for content and energy (timestamp + agent tiebreak)
//! - OR-Set for tags (union semantics)
//!
//! Timestamps always come from the injected clock - never the system
//! clock - so merges are reproducible under test. Merge is associative,
//! commutative, and idempotent; conflicts in non-CRDT fields default to
//! the local replica.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// G-COUNTER
// ============================================================================

/// Grow-only counter CRDT. Each agent has its own slot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GCounter {
    counts: BTreeMap<String, u64>,
}

impl GCounter {
    /// Create an empty counter
    pub fn new() -> Self {
        Self::default()
    }

    /// Increment this agent's slot
    pub fn increment(&mut self, agent_id: &str, amount: u64) {
        *self.counts.entry(agent_id.to_string()).or_insert(0) += amount;
    }

    /// Total across all agents
    pub fn value(&self) -> u64 {
        self.counts.values().sum()
    }

    /// Merge two counters by taking the max per agent
    pub fn merge(&self, other: &GCounter) -> GCounter {
        let mut merged = self.clone();
        for (agent, count) in &other.counts {
            let slot = merged.counts.entry(agent.clone()).or_insert(0);
            *slot = (*slot).max(*count);
        }
        merged
    }
}

// ============================================================================
// LWW-REGISTER
// ============================================================================

/// Last-Writer-Wins register with timestamp + agent-id tiebreak
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LwwRegister<T> {
    /// Current value
    pub value: T,
    /// Write timestamp (from the injected clock)
    pub timestamp: DateTime<Utc>,
    /// Writing agent; lexicographic max wins equal timestamps
    pub agent_id: String,
}

impl<T: Clone> LwwRegister<T> {
    /// Create a register with an initial value
    pub fn new(value: T, timestamp: DateTime<Utc>, agent_id: impl Into<String>) -> Self {
        Self {
            value,
            timestamp,
            agent_id: agent_id.into(),
        }
    }

    fn beats(&self, other: &Self) -> bool {
        (self.timestamp, self.agent_id.as_str()) > (other.timestamp, other.agent_id.as_str())
    }

    /// Apply a write if it is newer than the current one
    pub fn update(&mut self, value: T, timestamp: DateTime<Utc>, agent_id: &str) {
        let incoming = LwwRegister {
            value,
            timestamp,
            agent_id: agent_id.to_string(),
        };
        if incoming.beats(self) {
            *self = incoming;
        }
    }

    /// Merge by keeping the latest write
    pub fn merge(&self, other: &Self) -> Self {
        if other.beats(self) {
            other.clone()
        } else {
            self.clone()
        }
    }
}

// ============================================================================
// OR-SET
// ============================================================================

/// Observed-Remove set CRDT with add-wins union merge
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OrSet {
    elements: BTreeMap<String, DateTime<Utc>>,
}

impl OrSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element with its observation timestamp
    pub fn add(&mut self, element: &str, timestamp: DateTime<Utc>) {
        self.elements.insert(element.to_string(), timestamp);
    }

    /// Remove an observed element
    pub fn remove(&mut self, element: &str) {
        self.elements.remove(element);
    }

    /// Whether an element is present
    pub fn contains(&self, element: &str) -> bool {
        self.elements.contains_key(element)
    }

    /// Current elements
    pub fn elements(&self) -> Vec<String> {
        self.elements.keys().cloned().collect()
    }

    /// Merge two sets - union of all elements, newest observation wins
    pub fn merge(&self, other: &OrSet) -> OrSet {
        let mut merged = self.clone();
        for (element, ts) in &other.elements {
            merged
                .elements
                .entry(element.clone())
                .and_modify(|existing| {
                    if ts > existing {
                        *existing = *ts;
                    }
                })
                .or_insert(*ts);
        }
        merged
    }
}

// ============================================================================
// CRDT ENGRAM
// ============================================================================

/// Replica state for an engram with CRDT-typed fields
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CrdtEngram {
    /// The engram both replicas describe
    pub engram_id: String,
    /// Content - last writer wins
    pub content: LwwRegister<String>,
    /// Access count - grow-only across agents
    pub access_count: GCounter,
    /// Tags - add-wins union
    pub tags: OrSet,
    /// Energy - last writer wins
    pub energy: LwwRegister<f64>,
}

impl CrdtEngram {
    /// Create replica state for an engram
    pub fn new(
        engram_id: impl Into<String>,
        content: impl Into<String>,
        energy: f64,
        timestamp: DateTime<Utc>,
        agent_id: &str,
    ) -> Self {
        Self {
            engram_id: engram_id.into(),
            content: LwwRegister::new(content.into(), timestamp, agent_id),
            access_count: GCounter::new(),
            tags: OrSet::new(),
            energy: LwwRegister::new(energy, timestamp, agent_id),
        }
    }

    /// Merge two replicas of the same engram.
    ///
    /// Returns `None` when the ids differ - replicas of different
    /// engrams are never mergeable.
    pub fn merge(&self, other: &CrdtEngram) -> Option<CrdtEngram> {
        if self.engram_id != other.engram_id {
            return None;
        }

        let merged = CrdtEngram {
            engram_id: self.engram_id.clone(),
            content: self.content.merge(&other.content),
            access_count: self.access_count.merge(&other.access_count),
            tags: self.tags.merge(&other.tags),
            energy: self.energy.merge(&other.energy),
        };

        tracing::debug!(
            engram = %merged.engram_id,
            accesses = merged.access_count.value(),
            "CRDT merge"
        );
        Some(merged)
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn ts(offset_s: i64) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339("2026-01-01T00:00:00+00:00")
            .unwrap()
            .with_timezone(&Utc)
            + Duration::seconds(offset_s)
    }

    #[test]
    fn test_gcounter_grows_and_merges() {
        let mut a = GCounter::new();
        let mut b = GCounter::new();
        a.increment("agent-a", 3);
        b.increment("agent-a", 1);
        b.increment("agent-b", 2);

        let merged = a.merge(&b);
        // Max per slot: agent-a 3, agent-b 2
        assert_eq!(merged.value(), 5);
    }

    #[test]
    fn test_lww_latest_wins() {
        let old = LwwRegister::new("old".to_string(), ts(0), "agent-a");
        let new = LwwRegister::new("new".to_string(), ts(10), "agent-b");

        assert_eq!(old.merge(&new).value, "new");
        assert_eq!(new.merge(&old).value, "new");
    }

    #[test]
    fn test_lww_tiebreak_on_agent() {
        let a = LwwRegister::new("from-a".to_string(), ts(5), "agent-a");
        let b = LwwRegister::new("from-b".to_string(), ts(5), "agent-b");

        // Same instant: lexicographically larger agent id wins on both sides
        assert_eq!(a.merge(&b).value, "from-b");
        assert_eq!(b.merge(&a).value, "from-b");
    }

    #[test]
    fn test_lww_update_ignores_stale_write() {
        let mut register = LwwRegister::new("current".to_string(), ts(10), "agent-a");
        register.update("stale".to_string(), ts(5), "agent-b");
        assert_eq!(register.value, "current");

        register.update("fresh".to_string(), ts(15), "agent-b");
        assert_eq!(register.value, "fresh");
    }

    #[test]
    fn test_orset_union() {
        let mut a = OrSet::new();
        let mut b = OrSet::new();
        a.add("rust", ts(0));
        b.add("memory", ts(1));
        b.add("rust", ts(2));

        let merged = a.merge(&b);
        assert!(merged.contains("rust"));
        assert!(merged.contains("memory"));
        assert_eq!(merged.elements().len(), 2);
    }

    fn replica(agent: &str, offset_s: i64) -> CrdtEngram {
        let mut replica = CrdtEngram::new("e-1", format!("content from {}", agent), 0.8, ts(offset_s), agent);
        replica.access_count.increment(agent, 2);
        replica.tags.add(agent, ts(offset_s));
        replica
    }

    #[test]
    fn test_merge_is_commutative() {
        let a = replica("agent-a", 0);
        let b = replica("agent-b", 5);
        assert_eq!(a.merge(&b), b.merge(&a));
    }

    #[test]
    fn test_merge_is_associative() {
        let a = replica("agent-a", 0);
        let b = replica("agent-b", 5);
        let c = replica("agent-c", 3);

        let left = a.merge(&b).unwrap().merge(&c).unwrap();
        let right = a.merge(&b.merge(&c).unwrap()).unwrap();
        assert_eq!(left, right);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let a = replica("agent-a", 0);
        assert_eq!(a.merge(&a).unwrap(), a);
    }

    #[test]
    fn test_merge_rejects_different_engrams() {
        let a = CrdtEngram::new("e-1", "x", 0.5, ts(0), "agent-a");
        let b = CrdtEngram::new("e-2", "y", 0.5, ts(0), "agent-a");
        assert!(a.merge(&b).is_none());
    }

    #[test]
    fn test_merged_access_counts_survive_roundtrip() {
        let a = replica("agent-a", 0);
        let b = replica("agent-b", 5);
        let merged = a.merge(&b).unwrap();
        assert_eq!(merged.access_count.value(), 4);

        // Serde roundtrip for the crdt_state column
        let json = serde_json::to_string(&merged).unwrap();
        let restored: CrdtEngram = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, merged);
    }
}
