//! Frequency Tier Classifier
//!
//! Stratifies memory into frequency layers with different update
//! cadences. Engrams enter at HOT and promote to higher stability tiers
//! with access frequency; they demote when their energy drops below the
//! tier's floor. Tier transitions are observational - they never change
//! energy or access counts.

use crate::engram::Tier;

/// Pure tier classification from promotion/demotion tables.
///
/// Tables are indexed HOT, WARM, COLD, PERMAFROST. The highest tier
/// whose access-count floor and energy floor are both satisfied wins.
#[derive(Debug, Clone)]
pub struct TierClassifier {
    promotion_thresholds: [i64; 4],
    min_energy: [f64; 4],
}

impl Default for TierClassifier {
    fn default() -> Self {
        Self {
            promotion_thresholds: [0, 8, 32, 128],
            min_energy: [0.0, 0.3, 0.5, 0.8],
        }
    }
}

impl TierClassifier {
    /// Create a classifier with custom threshold tables
    pub fn new(promotion_thresholds: [i64; 4], min_energy: [f64; 4]) -> Self {
        Self {
            promotion_thresholds,
            min_energy,
        }
    }

    /// Determine the appropriate tier for an engram.
    ///
    /// Pure function of `(access_count, energy_level)` - checked from
    /// most stable to least stable.
    pub fn classify(&self, access_count: i64, energy_level: f64) -> Tier {
        for (i, tier) in Tier::ALL.iter().enumerate().rev() {
            if access_count >= self.promotion_thresholds[i] && energy_level >= self.min_energy[i] {
                return *tier;
            }
        }
        Tier::Hot
    }

    /// Evaluate whether an engram should migrate; returns the new tier
    /// when it differs from the current one.
    pub fn evaluate_and_migrate(
        &self,
        engram_id: &str,
        access_count: i64,
        energy_level: f64,
        current_tier: Tier,
    ) -> Option<Tier> {
        let new_tier = self.classify(access_count, energy_level);
        if new_tier == current_tier {
            return None;
        }

        let direction = if new_tier > current_tier { "PROMOTED" } else { "DEMOTED" };
        tracing::info!(
            engram = engram_id,
            from = %current_tier,
            to = %new_tier,
            accesses = access_count,
            energy = energy_level,
            "CMS {}",
            direction
        );
        Some(new_tier)
    }
}

// ============================================================================
// TESTS
// ============================================================================
