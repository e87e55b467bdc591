//! Thermodynamic Homeostasis
//!
//! Active memory management via ATP-constrained synaptic pruning: when an
//! engram's predictive value (energy) falls below the threshold, it is
//! destroyed to prevent semantic noise. Diamonds are exempt regardless of
//! energy.
//!
//! Energy write-backs re-base the decay baseline to the evaluation
//! instant (linear decay is path-independent, so the trajectory is
//! unchanged), which makes `prune_cycle` idempotent: a second
//! back-to-back run observes zero elapsed time and changes nothing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engram::Engram;

/// Verdict for a single engram during a homeostasis pass
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EnergyVerdict {
    /// Depleted below the ATP threshold; remove from index, then store
    Prune,
    /// Energy drifted by more than the persistence threshold; write back
    Update(f64),
    /// No action needed
    Keep,
}

/// Counts from a full prune cycle
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PruneReport {
    /// Engrams destroyed for energy depletion
    pub pruned: usize,
    /// Silent twins promoted during the coupled consolidation sweep
    pub matured: usize,
    /// Silent twins destroyed during the coupled consolidation sweep
    pub deceased: usize,
    /// Batched energy write-backs
    pub decayed: usize,
    /// Labile windows that expired and drew the ignore penalty
    pub expired_labiles: usize,
}

/// Scans and regulates the structural entropy of the store
#[derive(Debug, Clone)]
pub struct HomeostasisEngine {
    decay_rate_per_day: f64,
    atp_threshold: f64,
}

/// Persist the recomputed energy only when it moved by more than this
const ENERGY_DRIFT_THRESHOLD: f64 = 0.05;

impl HomeostasisEngine {
    /// Create an engine with the given decay rate and pruning threshold
    pub fn new(decay_rate_per_day: f64, atp_threshold: f64) -> Self {
        Self {
            decay_rate_per_day,
            atp_threshold,
        }
    }

    /// Decay rate in energy units per day
    pub fn decay_rate(&self) -> f64 {
        self.decay_rate_per_day
    }

    /// Evaluate a single engram
    pub fn evaluate(&self, engram: &Engram, now: DateTime<Utc>) -> EnergyVerdict {
        let current_energy = engram.compute_decay(now, self.decay_rate_per_day);

        if current_energy < self.atp_threshold && !engram.is_diamond {
            tracing::debug!(
                engram = %engram.id,
                energy = current_energy,
                "Pruning depleted engram"
            );
            return EnergyVerdict::Prune;
        }

        if (current_energy - engram.energy_level).abs() > ENERGY_DRIFT_THRESHOLD {
            return EnergyVerdict::Update(current_energy);
        }

        EnergyVerdict::Keep
    }
}

// ============================================================================
// TESTS
// ============================================================================
