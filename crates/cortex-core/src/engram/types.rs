//! Engram - The fundamental unit of memory
//!
//! Each engram carries:
//! - Content, provenance, and logical isolation keys (tenant/project)
//! - Thermodynamic state: energy level, valence, access counters
//! - Consolidation state: ACTIVE / SILENT / MATURED / DECEASED
//! - Frequency tier: HOT / WARM / COLD / PERMAFROST
//! - Ledger fields: `hash` / `prev_hash` per-tenant append chain

use std::collections::BTreeMap;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// FACT TYPES
// ============================================================================

/// Types of stored facts
#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum FactType {
    /// A resolved architectural or tactical decision
    Decision,
    /// A failure worth remembering (anti-patterns included)
    Error,
    /// A cross-project pattern transfer opportunity
    Bridge,
    /// General informational content
    #[default]
    Knowledge,
    /// Unfinished or haunting work item
    Ghost,
    /// An axiom or immutable rule
    Rule,
}

impl FactType {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            FactType::Decision => "decision",
            FactType::Error => "error",
            FactType::Bridge => "bridge",
            FactType::Knowledge => "knowledge",
            FactType::Ghost => "ghost",
            FactType::Rule => "rule",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "decision" => FactType::Decision,
            "error" => FactType::Error,
            "bridge" => FactType::Bridge,
            "ghost" => FactType::Ghost,
            "rule" => FactType::Rule,
            _ => FactType::Knowledge,
        }
    }
}

impl std::fmt::Display for FactType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// CONFIDENCE
// ============================================================================

/// Graded confidence level, C1 (hypothesis) through C5 (confirmed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    /// Hypothesis - needs validation
    C1,
    /// Speculative
    C2,
    /// Inferred
    #[default]
    C3,
    /// Probable
    C4,
    /// Confirmed
    C5,
}

impl Confidence {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::C1 => "c1",
            Confidence::C2 => "c2",
            Confidence::C3 => "c3",
            Confidence::C4 => "c4",
            Confidence::C5 => "c5",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "c1" => Confidence::C1,
            "c2" => Confidence::C2,
            "c4" => Confidence::C4,
            "c5" => Confidence::C5,
            _ => Confidence::C3,
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// LIFECYCLE STATE
// ============================================================================

/// Lifecycle state of an engram in the consolidation pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum EngramState {
    /// Hippocampal trace - immediately retrievable
    #[default]
    Active,
    /// Cortical trace - exists but invisible to search
    Silent,
    /// Fully consolidated, stable, searchable
    Matured,
    /// Marked for garbage collection
    Deceased,
}

impl EngramState {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            EngramState::Active => "active",
            EngramState::Silent => "silent",
            EngramState::Matured => "matured",
            EngramState::Deceased => "deceased",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "silent" => EngramState::Silent,
            "matured" => EngramState::Matured,
            "deceased" => EngramState::Deceased,
            _ => EngramState::Active,
        }
    }

    /// Visibility predicate for the vector index: only active and
    /// matured engrams can be recalled by natural cues.
    pub fn is_searchable(&self) -> bool {
        matches!(self, EngramState::Active | EngramState::Matured)
    }
}

impl std::fmt::Display for EngramState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// FREQUENCY TIER
// ============================================================================

/// Frequency tier stratifying engrams by access pattern and stability
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    /// Working memory - every query
    #[default]
    Hot,
    /// Semantic patterns
    Warm,
    /// Architectural decisions
    Cold,
    /// Foundational axioms
    Permafrost,
}

impl Tier {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Tier::Hot => "hot",
            Tier::Warm => "warm",
            Tier::Cold => "cold",
            Tier::Permafrost => "permafrost",
        }
    }

    /// Parse from string name
    pub fn parse_name(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "warm" => Tier::Warm,
            "cold" => Tier::Cold,
            "permafrost" => Tier::Permafrost,
            _ => Tier::Hot,
        }
    }

    /// All tiers, least stable first
    pub const ALL: [Tier; 4] = [Tier::Hot, Tier::Warm, Tier::Cold, Tier::Permafrost];
}

impl std::fmt::Display for Tier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// ENGRAM
// ============================================================================

/// A single engram row
///
/// One flat struct for every lifecycle state; `state` discriminates.
/// Silent-trace fields (`active_twin_id`, `maturation_days`,
/// `contradiction_count`) are defaulted on non-silent rows.
#[non_exhaustive]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Engram {
    /// Unique identifier (UUID v4)
    pub id: String,
    /// Logical isolation key - each tenant owns a separate chain
    pub tenant_id: String,
    /// Project scope within the tenant
    pub project_id: String,
    /// The immutable original payload
    pub content: String,
    /// Hex SHA-256 of `content`
    pub content_hash: String,
    /// Type of fact
    pub fact_type: FactType,
    /// Graded confidence level
    pub confidence: Confidence,
    /// When the engram was created (reset by contradictions on silents)
    pub created_at: DateTime<Utc>,
    /// When the engram was last accessed
    pub last_accessed: DateTime<Utc>,

    // ========== Thermodynamic state ==========
    /// Current synaptic strength in [0, 1]; decays unless accessed
    pub energy_level: f64,
    /// Grow-only access counter (feeds the tier classifier)
    pub access_count: i64,
    /// Emotional valence in [-1, 1]
    pub valence: f64,
    /// Arousal in [0, 1]
    pub arousal: f64,
    /// Energy multiplier derived from valence/arousal, in [0.5, 2.0]
    pub energy_multiplier: f64,

    // ========== Consolidation state ==========
    /// Lifecycle state
    pub state: EngramState,
    /// Backref from a silent twin to its active engram
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_twin_id: Option<String>,
    /// Maturation period for SILENT -> MATURED
    pub maturation_days: f64,
    /// Grow-only contradiction counter; each contradiction resets `created_at`
    pub contradiction_count: i64,

    // ========== Classification ==========
    /// Frequency tier
    pub tier: Tier,
    /// Protected-from-pruning flag
    pub is_diamond: bool,
    /// Ids of semantically entangled engrams discovered via resonance
    pub entangled_refs: Vec<String>,

    // ========== Provenance ==========
    /// Tags for categorization
    pub tags: Vec<String>,
    /// Source of the fact (file, conversation, observer, ...)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    /// Narrow escape hatch for host metadata (e.g. "consensus")
    #[serde(default)]
    pub extra: BTreeMap<String, String>,

    // ========== Ledger ==========
    /// Chain hash of this row
    pub hash: String,
    /// Chain hash of the predecessor row within the tenant
    pub prev_hash: String,
}

impl Engram {
    /// Age in days relative to `now`
    pub fn age_days(&self, now: DateTime<Utc>) -> f64 {
        ((now - self.created_at).num_milliseconds() as f64 / 86_400_000.0).max(0.0)
    }

    /// Days since the last access relative to `now`
    pub fn days_since_access(&self, now: DateTime<Utc>) -> f64 {
        ((now - self.last_accessed).num_milliseconds() as f64 / 86_400_000.0).max(0.0)
    }

    /// Current actual energy accounting for temporal decay
    pub fn compute_decay(&self, now: DateTime<Utc>, decay_rate_per_day: f64) -> f64 {
        let decayed = self.energy_level - self.days_since_access(now) * decay_rate_per_day;
        decayed.clamp(0.0, 1.0)
    }

    /// Consensus score from the host metadata escape hatch; 1.0 when absent
    pub fn consensus_score(&self) -> f64 {
        self.extra
            .get("consensus")
            .and_then(|v| v.parse::<f64>().ok())
            .unwrap_or(1.0)
    }
}

// ============================================================================
// INPUT / OUTPUT TYPES
// ============================================================================

/// Input for storing a new fact
///
/// Uses `deny_unknown_fields` to prevent field injection from hosts that
/// deserialize untrusted payloads into this struct.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct StoreInput {
    /// Tenant scope
    pub tenant_id: String,
    /// Project scope
    pub project_id: String,
    /// The content to store
    pub content: String,
    /// Type of fact
    #[serde(default)]
    pub fact_type: FactType,
    /// Confidence level
    #[serde(default)]
    pub confidence: Confidence,
    /// Tags for categorization
    #[serde(default)]
    pub tags: Vec<String>,
    /// Source of the fact
    pub source: Option<String>,
    /// Protect from automatic pruning
    #[serde(default)]
    pub is_diamond: bool,
    /// Host metadata escape hatch
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
    /// Foreground deadline; exceeded deadlines return TIMEOUT with no mutation
    #[serde(skip)]
    pub deadline: Option<Instant>,
}

impl Default for StoreInput {
    fn default() -> Self {
        Self {
            tenant_id: "default".to_string(),
            project_id: "default".to_string(),
            content: String::new(),
            fact_type: FactType::Knowledge,
            confidence: Confidence::C3,
            tags: vec![],
            source: None,
            is_diamond: false,
            extra: BTreeMap::new(),
            deadline: None,
        }
    }
}

/// How the admission gate disposed of a store request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StoreOutcome {
    /// The candidate matched an existing engram, which was reinforced
    Resonance,
    /// The candidate was novel and inserted as a new engram
    Reset,
}

/// A single retrieval hit
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetrievedEngram {
    /// Engram id
    pub id: String,
    /// Original content
    pub content: String,
    /// Cosine similarity to the query
    pub score: f32,
    /// Project the engram belongs to
    pub project_id: String,
    /// Type of fact
    pub fact_type: FactType,
    /// Current (decay-applied) energy at retrieval time
    pub energy: f64,
    /// Frequency tier at retrieval time
    pub tier: Tier,
}

// ============================================================================
// TESTS
// ============================================================================
