//! Causal Memory Graph
//!
//! Don't just store WHAT happened - store WHY. Each engram can carry
//! causal links enabling:
//! - Forward tracing: "what did this decision cause?"
//! - Backward tracing: "why was this decision made?"
//! - Zombie detection: "is the root cause still valid?"
//! - Impact analysis: "what breaks if I remove this?"
//!
//! Modeled as id-keyed adjacency maps in both directions; no object
//! pointers, so deletion is explicit: remove the edges, then the engram.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

// ============================================================================
// LINKS
// ============================================================================

/// Relation kind of a causal edge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CausalRelation {
    /// Direct causation
    #[default]
    Caused,
    /// Made possible
    Enabled,
    /// Blocked an alternative
    Prevented,
    /// Hard prerequisite
    Required,
}

impl CausalRelation {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            CausalRelation::Caused => "caused",
            CausalRelation::Enabled => "enabled",
            CausalRelation::Prevented => "prevented",
            CausalRelation::Required => "required",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "enabled" => CausalRelation::Enabled,
            "prevented" => CausalRelation::Prevented,
            "required" => CausalRelation::Required,
            _ => CausalRelation::Caused,
        }
    }
}

/// A directed causal relationship between two engrams
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CausalLink {
    /// The cause
    pub cause_id: String,
    /// The effect
    pub effect_id: String,
    /// Relation kind
    pub relation: CausalRelation,
    /// Edge strength in [0, 1]
    pub strength: f64,
    /// Free-text annotation
    pub description: String,
}

impl CausalLink {
    /// Create a default-strength `caused` link
    pub fn new(cause_id: impl Into<String>, effect_id: impl Into<String>) -> Self {
        Self {
            cause_id: cause_id.into(),
            effect_id: effect_id.into(),
            relation: CausalRelation::Caused,
            strength: 1.0,
            description: String::new(),
        }
    }

    /// Strong edges carry most of the analytical weight
    pub fn is_strong(&self) -> bool {
        self.strength >= 0.7
    }
}

// ============================================================================
// GRAPH
// ============================================================================

/// Directed graph of causal relationships between engrams
#[derive(Debug, Default)]
pub struct CausalGraph {
    /// cause -> effects
    forward: HashMap<String, Vec<CausalLink>>,
    /// effect -> causes
    backward: HashMap<String, Vec<CausalLink>>,
}

impl CausalGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a causal relationship
    pub fn add_link(&mut self, link: CausalLink) {
        tracing::debug!(
            cause = %link.cause_id,
            effect = %link.effect_id,
            relation = link.relation.as_str(),
            "Causal link added"
        );
        self.backward
            .entry(link.effect_id.clone())
            .or_default()
            .push(link.clone());
        self.forward.entry(link.cause_id.clone()).or_default().push(link);
    }

    /// What did this engram cause? (forward trace)
    pub fn effects_of(&self, engram_id: &str) -> &[CausalLink] {
        self.forward.get(engram_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Why does this engram exist? (backward trace)
    pub fn causes_of(&self, engram_id: &str) -> &[CausalLink] {
        self.backward.get(engram_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Trace the full downstream impact chain (BFS), excluding the start
    pub fn impact_chain(&self, engram_id: &str, max_depth: usize) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue = vec![engram_id.to_string()];
        let mut chain = Vec::new();

        for _ in 0..max_depth {
            if queue.is_empty() {
                break;
            }
            let mut next_queue = Vec::new();
            for eid in queue {
                if !visited.insert(eid.clone()) {
                    continue;
                }
                if eid != engram_id {
                    chain.push(eid.clone());
                }
                next_queue.extend(
                    self.effects_of(&eid)
                        .iter()
                        .map(|link| link.effect_id.clone())
                        .filter(|id| !visited.contains(id)),
                );
            }
            queue = next_queue;
        }

        chain
    }

    /// Trace backward to all root causes (nodes with no incoming edges)
    pub fn root_causes(&self, engram_id: &str, max_depth: usize) -> Vec<String> {
        let mut visited: HashSet<String> = HashSet::new();
        let mut queue = vec![engram_id.to_string()];
        let mut roots = Vec::new();

        for _ in 0..max_depth {
            if queue.is_empty() {
                break;
            }
            let mut next_queue = Vec::new();
            for eid in queue {
                if !visited.insert(eid.clone()) {
                    continue;
                }
                let causes = self.causes_of(&eid);
                if causes.is_empty() && eid != engram_id {
                    roots.push(eid.clone());
                }
                next_queue.extend(
                    causes
                        .iter()
                        .map(|link| link.cause_id.clone())
                        .filter(|id| !visited.contains(id)),
                );
            }
            queue = next_queue;
        }

        roots
    }

    /// Find decisions whose root causes no longer exist.
    ///
    /// A zombie is alive itself, has at least one root cause, and ALL of
    /// its root causes have been pruned or deprecated.
    pub fn find_zombies(&self, alive_ids: &HashSet<String>) -> Vec<String> {
        let mut zombies = Vec::new();
        for eid in self.backward.keys() {
            if !alive_ids.contains(eid) {
                continue;
            }
            let roots = self.root_causes(eid, 5);
            if !roots.is_empty() && roots.iter().all(|r| !alive_ids.contains(r)) {
                zombies.push(eid.clone());
            }
        }
        zombies.sort();
        zombies
    }

    /// Remove every edge touching an engram. Called before the engram
    /// itself is destroyed.
    pub fn remove_node(&mut self, engram_id: &str) {
        self.forward.remove(engram_id);
        self.backward.remove(engram_id);
        for links in self.forward.values_mut() {
            links.retain(|l| l.effect_id != engram_id);
        }
        for links in self.backward.values_mut() {
            links.retain(|l| l.cause_id != engram_id);
        }
        self.forward.retain(|_, links| !links.is_empty());
        self.backward.retain(|_, links| !links.is_empty());
    }

    /// Number of distinct nodes
    pub fn node_count(&self) -> usize {
        let mut all: HashSet<&String> = self.forward.keys().collect();
        all.extend(self.backward.keys());
        all.len()
    }

    /// Number of edges
    pub fn edge_count(&self) -> usize {
        self.forward.values().map(Vec::len).sum()
    }
}

// ============================================================================
// TESTS
// ============================================================================
