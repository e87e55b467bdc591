//! Adaptive Resonance Gate
//!
//! ART-inspired admission filter. Instead of blindly appending facts,
//! the gate checks for semantic resonance with existing engrams:
//!
//! - Resonance (best similarity >= vigilance) -> reinforce the existing
//!   engram via long-term potentiation; the candidate is not inserted.
//! - Reset (no match above vigilance) -> the candidate becomes a new
//!   engram category.
//!
//! Higher vigilance = more granular memory (more categories). Lower
//! vigilance = more generalization (fewer, broader engrams).

use crate::error::Result;
use crate::search::{SearchFilter, VectorIndex};

/// Outcome of a gate evaluation
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Reinforce an existing engram instead of inserting
    Resonance {
        /// The matched engram
        engram_id: String,
        /// Similarity that cleared vigilance
        similarity: f32,
    },
    /// Insert the candidate as a new engram
    Reset {
        /// Best similarity observed (below vigilance)
        best_similarity: f32,
    },
}

/// ART-inspired gate that controls memory write operations
#[derive(Debug, Clone)]
pub struct AdaptiveResonanceGate {
    vigilance: f32,
    search_k: usize,
}

impl AdaptiveResonanceGate {
    /// Create a gate with the given vigilance and neighbor depth
    pub fn new(vigilance: f32, search_k: usize) -> Self {
        Self { vigilance, search_k }
    }

    /// Vigilance threshold
    pub fn vigilance(&self) -> f32 {
        self.vigilance
    }

    /// Evaluate a candidate vector against existing memory.
    ///
    /// The neighbor search is scoped to the tenant with no energy floor;
    /// only searchable (active/matured) engrams can resonate, so a silent
    /// twin never absorbs its own duplicate.
    pub fn evaluate(
        &self,
        candidate_vector: &[f32],
        tenant_id: &str,
        index: &VectorIndex,
    ) -> Result<GateDecision> {
        let neighbors = index.search(
            candidate_vector,
            self.search_k,
            &SearchFilter::for_tenant(tenant_id),
        )?;

        let best = neighbors.into_iter().next();

        match best {
            Some((engram_id, similarity)) if similarity >= self.vigilance => {
                tracing::info!(
                    engram = %engram_id,
                    sim = similarity,
                    "ART RESONANCE: reinforcing existing engram"
                );
                Ok(GateDecision::Resonance {
                    engram_id,
                    similarity,
                })
            }
            Some((_, similarity)) => {
                tracing::info!(
                    best_sim = similarity,
                    vigilance = self.vigilance,
                    "ART RESET: candidate below vigilance"
                );
                Ok(GateDecision::Reset {
                    best_similarity: similarity,
                })
            }
            None => {
                tracing::debug!("ART RESET: no neighbors in tenant");
                Ok(GateDecision::Reset {
                    best_similarity: 0.0,
                })
            }
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
