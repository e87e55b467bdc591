//! Engine configuration
//!
//! Every tunable in one struct with defaults matching the reference
//! deployment. Validation happens once at construction; a misconfigured
//! engine fails loudly before any request is served.

use serde::{Deserialize, Serialize};

use crate::error::{CortexError, Result};

/// Tunable parameters for the whole engine
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CortexConfig {
    // ========== Admission (ART) ==========
    /// Vigilance threshold: similarity at or above resonates
    pub vigilance_rho: f32,
    /// Energy boost applied on resonance (long-term potentiation)
    pub ltp_boost: f64,
    /// Neighbors fetched per admission check
    pub art_search_k: usize,

    // ========== Dual-trace consolidation ==========
    /// Days a silent twin needs without contradiction to mature
    pub maturation_days: f64,
    /// Energy a silent twin starts with
    pub silent_initial_energy: f64,

    // ========== Homeostasis ==========
    /// Energy lost per day without access
    pub decay_rate_per_day: f64,
    /// Engrams below this computed energy are pruned (unless diamond)
    pub atp_threshold: f64,

    // ========== Reconsolidation ==========
    /// Seconds an accessed engram stays labile
    pub labile_window_seconds: f64,
    /// Energy boost for confirming within the window
    pub reconsolidate_boost: f64,
    /// Energy penalty for ignoring the window
    pub ignore_penalty: f64,

    // ========== Frequency tiers ==========
    /// Access-count floors for HOT/WARM/COLD/PERMAFROST
    pub tier_promotion_thresholds: [i64; 4],
    /// Energy floors for HOT/WARM/COLD/PERMAFROST
    pub tier_min_energy: [f64; 4],

    // ========== Policy engine ==========
    /// Bellman discount factor
    pub gamma: f64,
    /// Maximum actions returned per evaluation
    pub max_actions: usize,
    /// Additive future-value bonus for cross-project mentions
    pub cross_project_bonus: f64,
    /// Additive future-value bonus for blocking ghosts/errors
    pub blocking_multiplier: f64,
    /// Reward multiplier for errors younger than the recency window
    pub error_recency_weight: f64,
    /// Per-day multiplicative decay of ghost urgency
    pub ghost_age_decay: f64,
    /// Errors younger than this get the recency weight
    pub recency_window_hours: f64,

    // ========== Bloom fast-negative ==========
    /// Expected distinct content hashes
    pub bloom_expected_items: usize,
    /// Target false-positive rate
    pub bloom_fp_rate: f64,

    // ========== Background cadence ==========
    /// Seconds between homeostasis prune cycles
    pub prune_cycle_interval_s: u64,
    /// Seconds between consolidation sweeps
    pub consolidation_interval_s: u64,

    // ========== Co-access / anticipatory cache ==========
    /// Multiplicative decay applied to co-access edges per sweep
    pub coaccess_decay_factor: f64,
    /// Minimum normalized confidence to emit a prefetch
    pub prefetch_threshold: f64,
    /// Engrams held in the anticipatory cache
    pub anticipatory_cache_size: usize,

    // ========== Session guardrail ==========
    /// Hard cap on tokens per agent session
    pub max_session_tokens: u64,
    /// Warn-once utilization threshold
    pub warn_threshold: f64,
    /// Hard cap on conversation turns (0 = unlimited)
    pub max_turns: u64,
    /// Sliding working-set window budget
    pub working_set_max_tokens: u64,

    // ========== Randomness ==========
    /// Seed for the injected random source
    pub rng_seed: u64,
}

impl Default for CortexConfig {
    fn default() -> Self {
        Self {
            vigilance_rho: 0.85,
            ltp_boost: 0.25,
            art_search_k: 10,
            maturation_days: 3.0,
            silent_initial_energy: 0.5,
            decay_rate_per_day: 0.05,
            atp_threshold: 0.2,
            labile_window_seconds: 300.0,
            reconsolidate_boost: 0.2,
            ignore_penalty: 0.15,
            tier_promotion_thresholds: [0, 8, 32, 128],
            tier_min_energy: [0.0, 0.3, 0.5, 0.8],
            gamma: 0.9,
            max_actions: 20,
            cross_project_bonus: 1.5,
            blocking_multiplier: 3.0,
            error_recency_weight: 2.0,
            ghost_age_decay: 0.95,
            recency_window_hours: 24.0,
            bloom_expected_items: 10_000,
            bloom_fp_rate: 0.01,
            prune_cycle_interval_s: 14_400,
            consolidation_interval_s: 3_600,
            coaccess_decay_factor: 0.95,
            prefetch_threshold: 0.3,
            anticipatory_cache_size: 128,
            max_session_tokens: 100_000,
            warn_threshold: 0.8,
            max_turns: 0,
            working_set_max_tokens: 8_192,
            rng_seed: 0,
        }
    }
}

impl CortexConfig {
    /// Validate the configuration. Called once by the engine constructor.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.vigilance_rho) {
            return Err(CortexError::Validation(format!(
                "vigilance_rho must be in [0, 1], got {}",
                self.vigilance_rho
            )));
        }
        if self.decay_rate_per_day <= 0.0 {
            return Err(CortexError::Validation(
                "decay_rate_per_day must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.atp_threshold) {
            return Err(CortexError::Validation(format!(
                "atp_threshold must be in [0, 1], got {}",
                self.atp_threshold
            )));
        }
        if self.art_search_k == 0 {
            return Err(CortexError::Validation(
                "art_search_k must be at least 1".to_string(),
            ));
        }
        if self.tier_promotion_thresholds.windows(2).any(|w| w[0] >= w[1]) {
            return Err(CortexError::Validation(
                "tier_promotion_thresholds must be strictly increasing".to_string(),
            ));
        }
        if self.tier_min_energy.windows(2).any(|w| w[0] > w[1]) {
            return Err(CortexError::Validation(
                "tier_min_energy must be non-decreasing".to_string(),
            ));
        }
        if self
            .tier_min_energy
            .iter()
            .any(|e| !(0.0..=1.0).contains(e))
        {
            return Err(CortexError::Validation(
                "tier_min_energy entries must be in [0, 1]".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.gamma) {
            return Err(CortexError::Validation(format!(
                "gamma must be in [0, 1], got {}",
                self.gamma
            )));
        }
        if self.bloom_fp_rate <= 0.0 || self.bloom_fp_rate >= 1.0 {
            return Err(CortexError::Validation(format!(
                "bloom_fp_rate must be in (0, 1), got {}",
                self.bloom_fp_rate
            )));
        }
        if self.labile_window_seconds <= 0.0 {
            return Err(CortexError::Validation(
                "labile_window_seconds must be positive".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.warn_threshold) {
            return Err(CortexError::Validation(format!(
                "warn_threshold must be in [0, 1], got {}",
                self.warn_threshold
            )));
        }
        Ok(())
    }
}
