//! Consolidation Module
//!
//! The background lifecycle machinery:
//! - Dual-trace silent twins with time-gated maturation
//! - Thermodynamic homeostasis: decay recomputation and entropy pruning
//! - Reconsolidation: post-access labile windows

mod dual_trace;
mod homeostasis;
mod reconsolidation;

pub use dual_trace::{DualTraceConsolidator, SweepCounts, SweepPlan};
pub use homeostasis::{EnergyVerdict, HomeostasisEngine, PruneReport};
pub use reconsolidation::{LabileRecord, ReconsolidationTracker};
