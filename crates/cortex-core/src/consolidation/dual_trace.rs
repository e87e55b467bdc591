//! Dual-Trace Consolidation
//!
//! When a fact is admitted, TWO engrams are created simultaneously:
//! - The active engram: immediately searchable
//! - A silent twin in a colder tier: invisible to search until matured
//!
//! The silent twin matures autonomously after its maturation period if no
//! contradictions arrive and its energy has not collapsed. If the active
//! trace decays but the silent one matured, the memory persists; if both
//! decay, natural death.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::engram::{Engram, EngramState, Tier};

/// Counts from a consolidation sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepCounts {
    /// Silent twins promoted to MATURED
    pub matured: usize,
    /// Silent twins that reached DECEASED
    pub deceased: usize,
    /// Silent twins still waiting
    pub pending: usize,
}

/// Planned transitions for a sweep; the engine applies them so index
/// updates always precede row deletions.
#[derive(Debug, Clone, Default)]
pub struct SweepPlan {
    /// Ids to promote to MATURED
    pub mature: Vec<String>,
    /// Ids to remove (index first, then store)
    pub decease: Vec<String>,
    /// Ids left pending
    pub pending: Vec<String>,
}

impl SweepPlan {
    /// Summarize the plan
    pub fn counts(&self) -> SweepCounts {
        SweepCounts {
            matured: self.mature.len(),
            deceased: self.decease.len(),
            pending: self.pending.len(),
        }
    }
}

/// Orchestrates the dual-trace memory consolidation pipeline
#[derive(Debug, Clone)]
pub struct DualTraceConsolidator {
    maturation_days: f64,
    silent_initial_energy: f64,
    decay_rate_per_day: f64,
}

impl DualTraceConsolidator {
    /// Create a consolidator
    pub fn new(maturation_days: f64, silent_initial_energy: f64, decay_rate_per_day: f64) -> Self {
        Self {
            maturation_days,
            silent_initial_energy,
            decay_rate_per_day,
        }
    }

    /// Build the silent twin for a freshly admitted active engram.
    ///
    /// Same content and embedding, colder tier, weaker starting energy,
    /// backref to the active twin. The caller persists both.
    pub fn make_silent(&self, active: &Engram, now: DateTime<Utc>) -> Engram {
        let mut silent = active.clone();
        silent.id = Uuid::new_v4().to_string();
        silent.state = EngramState::Silent;
        silent.active_twin_id = Some(active.id.clone());
        silent.energy_level = self.silent_initial_energy;
        silent.maturation_days = self.maturation_days;
        silent.contradiction_count = 0;
        silent.created_at = now;
        silent.last_accessed = now;
        silent.access_count = 0;
        silent.tier = Tier::Cold;
        silent.entangled_refs = vec![active.id.clone()];
        silent.hash = String::new();
        silent.prev_hash = String::new();
        silent
    }

    /// Maturation predicate for a silent engram
    fn is_mature(&self, engram: &Engram, now: DateTime<Utc>) -> bool {
        engram.age_days(now) >= engram.maturation_days
            && engram.contradiction_count == 0
            && engram.compute_decay(now, self.decay_rate_per_day) > 0.1
    }

    /// Evaluate one engram's lifecycle. Idempotent - safe to re-run on
    /// the same state, which makes cancelling a sweep mid-iteration safe.
    pub fn tick(&self, engram: &Engram, now: DateTime<Utc>) -> EngramState {
        if engram.state == EngramState::Deceased {
            return EngramState::Deceased;
        }

        let current_energy = engram.compute_decay(now, self.decay_rate_per_day);
        if current_energy <= 0.0 && engram.contradiction_count > 0 {
            return EngramState::Deceased;
        }

        if engram.state == EngramState::Silent && self.is_mature(engram, now) {
            return EngramState::Matured;
        }

        engram.state
    }

    /// Plan a consolidation sweep over a tenant's silent engrams
    pub fn plan_sweep(&self, silents: &[Engram], now: DateTime<Utc>) -> SweepPlan {
        let mut plan = SweepPlan::default();

        for engram in silents {
            if engram.state != EngramState::Silent {
                continue;
            }
            match self.tick(engram, now) {
                EngramState::Matured => {
                    tracing::info!(
                        engram = %engram.id,
                        age_days = engram.age_days(now),
                        "Silent engram MATURED"
                    );
                    plan.mature.push(engram.id.clone());
                }
                EngramState::Deceased => {
                    tracing::info!(
                        engram = %engram.id,
                        contradictions = engram.contradiction_count,
                        "Silent engram DECEASED"
                    );
                    plan.decease.push(engram.id.clone());
                }
                _ => plan.pending.push(engram.id.clone()),
            }
        }

        plan
    }
}

// ============================================================================
// TESTS
// ============================================================================
