//! Memory Reconsolidation
//!
//! Every time an engram is accessed it becomes LABILE (editable) for a
//! temporal window. If not re-stabilized, it degrades. This removes the
//! problem of obsolete facts persisting because nobody actively deletes
//! them: access without confirmation = decay.
//!
//! Timeline:
//! - `t=0` accessed -> marked labile
//! - within window, confirmed -> re-stabilize with LTP boost
//! - within window, contradicted -> update in place (no duplicate)
//! - window expires untouched -> energy penalty

use std::collections::HashMap;

use chrono::{DateTime, Utc};

/// Tracks the labile state of an accessed engram
#[derive(Debug, Clone)]
pub struct LabileRecord {
    /// The labilized engram
    pub engram_id: String,
    /// When the labile window opened
    pub accessed_at: DateTime<Utc>,
    /// Window length in seconds
    pub window_seconds: f64,
}

impl LabileRecord {
    /// Has the labilization window closed?
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        (now - self.accessed_at).num_milliseconds() as f64 / 1000.0 > self.window_seconds
    }
}

/// Tracks labile engrams and resolves their fate.
///
/// At most one open record per engram id; re-accessing resets the window.
/// Purely in-memory and O(1) per operation - callers apply the returned
/// energy deltas to the store.
#[derive(Debug)]
pub struct ReconsolidationTracker {
    window_seconds: f64,
    boost: f64,
    penalty: f64,
    labile: HashMap<String, LabileRecord>,
}

impl ReconsolidationTracker {
    /// Create a tracker with the given window and delta magnitudes
    pub fn new(window_seconds: f64, boost: f64, penalty: f64) -> Self {
        Self {
            window_seconds,
            boost,
            penalty,
            labile: HashMap::new(),
        }
    }

    /// Mark an engram as labile after access. Resets any open window.
    pub fn on_access(&mut self, engram_id: &str, now: DateTime<Utc>) {
        self.labile.insert(
            engram_id.to_string(),
            LabileRecord {
                engram_id: engram_id.to_string(),
                accessed_at: now,
                window_seconds: self.window_seconds,
            },
        );
        tracing::debug!(
            engram = engram_id,
            window_s = self.window_seconds,
            "Engram entered labile state"
        );
    }

    /// Confirm a labile engram -> re-stabilize.
    ///
    /// Returns the energy boost to apply, or `None` if the window already
    /// closed (expired records are dropped on the spot; the sweep will
    /// not double-penalize a confirmed-too-late engram).
    pub fn confirm(&mut self, engram_id: &str, now: DateTime<Utc>) -> Option<f64> {
        let record = self.labile.remove(engram_id)?;
        if record.is_expired(now) {
            return None;
        }
        tracing::debug!(engram = engram_id, boost = self.boost, "Engram RECONSOLIDATED");
        Some(self.boost)
    }

    /// Contradict a labile engram -> flag for in-place update.
    ///
    /// Returns true when the window was still open. Energy stays neutral;
    /// the content correction happens externally.
    pub fn contradict(&mut self, engram_id: &str, now: DateTime<Utc>) -> bool {
        let Some(record) = self.labile.remove(engram_id) else {
            return false;
        };
        if record.is_expired(now) {
            return false;
        }
        tracing::debug!(engram = engram_id, "Engram CONTRADICTED during labile window");
        true
    }

    /// Sweep expired labile records.
    ///
    /// Returns `(engram_id, energy_delta)` penalties for every record that
    /// expired without confirmation or contradiction.
    pub fn sweep(&mut self, now: DateTime<Utc>) -> Vec<(String, f64)> {
        let expired_ids: Vec<String> = self
            .labile
            .values()
            .filter(|r| r.is_expired(now))
            .map(|r| r.engram_id.clone())
            .collect();

        let mut penalties = Vec::with_capacity(expired_ids.len());
        for id in expired_ids {
            self.labile.remove(&id);
            tracing::debug!(engram = %id, penalty = self.penalty, "Engram IGNORED during labile window");
            penalties.push((id, -self.penalty));
        }
        penalties
    }

    /// Number of currently labile engrams
    pub fn labile_count(&self) -> usize {
        self.labile.len()
    }

    /// Ids of currently labile engrams
    pub fn labile_ids(&self) -> Vec<String> {
        self.labile.keys().cloned().collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
