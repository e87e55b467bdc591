//! Policy Engine - Data Models

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::engram::FactType;

// ============================================================================
// ACTION TYPES
// ============================================================================

/// Category of action derived from a fact
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionType {
    /// Close out a haunting unfinished item
    ResolveGhost,
    /// Repair a recorded failure
    FixError,
    /// Transfer a proven pattern across projects
    ApplyBridge,
    /// Re-examine a past decision
    ReviewDecision,
    /// Absorb informational content
    AbsorbKnowledge,
}

impl ActionType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::ResolveGhost => "resolve_ghost",
            ActionType::FixError => "fix_error",
            ActionType::ApplyBridge => "apply_bridge",
            ActionType::ReviewDecision => "review_decision",
            ActionType::AbsorbKnowledge => "absorb_knowledge",
        }
    }

    /// Human-readable prefix for action descriptions
    pub fn description_prefix(&self) -> &'static str {
        match self {
            ActionType::ResolveGhost => "Resolve ghost",
            ActionType::FixError => "Fix error",
            ActionType::ApplyBridge => "Apply bridge pattern",
            ActionType::ReviewDecision => "Review decision",
            ActionType::AbsorbKnowledge => "Absorb knowledge",
        }
    }

    /// Map a fact type to its action category
    pub fn for_fact_type(fact_type: FactType) -> Self {
        match fact_type {
            FactType::Ghost => ActionType::ResolveGhost,
            FactType::Error => ActionType::FixError,
            FactType::Bridge => ActionType::ApplyBridge,
            FactType::Decision => ActionType::ReviewDecision,
            FactType::Knowledge | FactType::Rule => ActionType::AbsorbKnowledge,
        }
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// REWARDS
// ============================================================================

/// Base reward per fact type. Higher = more actionable. Ghost and error
/// are high because they represent incomplete/broken state; bridge is a
/// proven pattern transfer opportunity; decision is already resolved;
/// knowledge is informational.
pub fn base_reward(fact_type: FactType) -> f64 {
    match fact_type {
        FactType::Error => 0.90,
        FactType::Ghost => 0.70,
        FactType::Bridge => 0.50,
        FactType::Decision => 0.30,
        FactType::Knowledge | FactType::Rule => 0.10,
    }
}

/// Tie-break priority when values are equal (lower = more urgent)
pub fn source_priority(fact_type: FactType) -> u8 {
    match fact_type {
        FactType::Error => 0,
        FactType::Ghost => 1,
        FactType::Bridge => 2,
        FactType::Decision => 3,
        FactType::Knowledge => 4,
        FactType::Rule => 5,
    }
}

// ============================================================================
// ACTION ITEM
// ============================================================================

/// A scored, prioritized action derived from stored memory
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionItem {
    /// Source fact id
    pub fact_id: String,
    /// Project this action belongs to
    pub project: String,
    /// Action category
    pub action_type: ActionType,
    /// Human-readable action description
    pub description: String,
    /// Final Bellman value, clamped to [0, 1]
    pub value: f64,
    /// Time-discounted urgency component
    pub urgency: f64,
    /// Estimated downstream impact component
    pub impact: f64,
    /// Original fact type
    pub source_type: FactType,
    /// Extra context (tags, confidence, consensus, timestamps)
    pub metadata: BTreeMap<String, String>,
}

// ============================================================================
// CONFIG
// ============================================================================

/// Tunable parameters for the Bellman value function
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PolicyConfig {
    /// Discount factor; higher = future value matters more
    pub gamma: f64,
    /// Future-value bonus for items that block other work
    pub blocking_multiplier: f64,
    /// Additive bonus for cross-project mentions
    pub cross_project_bonus: f64,
    /// Reward multiplier for recently created errors
    pub error_recency_weight: f64,
    /// Per-day multiplicative decay of ghost urgency
    pub ghost_age_decay: f64,
    /// Maximum actions returned
    pub max_actions: usize,
    /// Errors younger than this get the recency weight
    pub recency_window_hours: f64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            gamma: 0.90,
            blocking_multiplier: 3.0,
            cross_project_bonus: 1.5,
            error_recency_weight: 2.0,
            ghost_age_decay: 0.95,
            max_actions: 20,
            recency_window_hours: 24.0,
        }
    }
}
