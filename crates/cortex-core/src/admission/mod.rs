//! Admission Module
//!
//! The write-path filter stack:
//! - Bloom fast-negative check short-circuits the gate on novel content
//! - Adaptive resonance gate deduplicates on vector similarity

mod bloom;
mod resonance;

pub use bloom::{semantic_fingerprint, FastNegativeFilter};
pub use resonance::{AdaptiveResonanceGate, GateDecision};
