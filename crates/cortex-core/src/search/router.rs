//! Retrieval Router
//!
//! Maps incoming queries to oscillatory frequency bands, each with its
//! own search parameters. Gamma handles local exact-ish lookups;
//! theta/delta handle long-range and axiom retrieval.
//!
//! The router never reads memory - it only shapes the search the caller
//! runs against the vector index.

use serde::{Deserialize, Serialize};

// ============================================================================
// BANDS
// ============================================================================

/// Neural oscillation-inspired retrieval bands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetrievalBand {
    /// High freq: exact match, keyword, recent facts
    Gamma,
    /// Standard: cosine similarity semantic search
    Beta,
    /// Low freq: cross-project bridges, long-range
    Theta,
    /// Lowest: axioms, immutable rules, diamonds
    Delta,
}

impl RetrievalBand {
    /// Convert to string representation
    pub fn as_str(&self) -> &'static str {
        match self {
            RetrievalBand::Gamma => "gamma",
            RetrievalBand::Beta => "beta",
            RetrievalBand::Theta => "theta",
            RetrievalBand::Delta => "delta",
        }
    }
}

impl std::fmt::Display for RetrievalBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Search configuration for a retrieval band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BandConfig {
    /// Maximum results to fetch
    pub max_results: usize,
    /// Minimum current energy for a hit
    pub min_energy: f64,
    /// Only diamonds pass
    pub require_diamond: bool,
    /// Results may come from other projects
    pub cross_project: bool,
}

/// Query hints supplied by the caller
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryHints {
    /// Looking up foundational axioms/rules
    pub is_axiom_lookup: bool,
    /// Expecting results from other projects
    pub is_cross_project: bool,
}

// ============================================================================
// ROUTER
// ============================================================================

/// Routes retrieval queries to the appropriate frequency band
pub struct RetrievalRouter;

impl RetrievalRouter {
    /// Classify a query into its optimal frequency band
    pub fn classify_query(query: &str, hints: QueryHints) -> RetrievalBand {
        if hints.is_axiom_lookup {
            return RetrievalBand::Delta;
        }
        if hints.is_cross_project {
            return RetrievalBand::Theta;
        }

        // Heuristic: short queries with exact keywords -> gamma
        if query.trim().split_whitespace().count() <= 3 {
            return RetrievalBand::Gamma;
        }

        RetrievalBand::Beta
    }

    /// Search configuration for a band
    pub fn config_for(band: RetrievalBand) -> BandConfig {
        match band {
            RetrievalBand::Gamma => BandConfig {
                max_results: 5,
                min_energy: 0.6,
                require_diamond: false,
                cross_project: false,
            },
            RetrievalBand::Beta => BandConfig {
                max_results: 10,
                min_energy: 0.3,
                require_diamond: false,
                cross_project: false,
            },
            RetrievalBand::Theta => BandConfig {
                max_results: 15,
                min_energy: 0.1,
                require_diamond: false,
                cross_project: true,
            },
            RetrievalBand::Delta => BandConfig {
                max_results: 20,
                min_energy: 0.0,
                require_diamond: true,
                cross_project: true,
            },
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
