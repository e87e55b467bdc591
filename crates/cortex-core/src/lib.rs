//! # Cortex Core
//!
//! Persistent, multi-tier memory engine for long-running autonomous
//! agents. Facts get a full biologically-inspired lifecycle:
//!
//! - **Adaptive Resonance admission**: near-duplicate facts reinforce the
//!   existing engram (long-term potentiation) instead of piling up
//! - **Dual-trace consolidation**: every admitted fact gets a silent twin
//!   that matures into searchability after days without contradiction
//! - **Frequency tiers**: HOT / WARM / COLD / PERMAFROST stratification
//!   driven by access counts and energy
//! - **Oscillatory retrieval bands**: query shape picks the search
//!   parameters (gamma/beta/theta/delta)
//! - **Thermodynamic homeostasis**: per-engram energy decay with
//!   entropy-threshold pruning under a protected-diamond rule
//! - **Reconsolidation**: accessed engrams become transiently labile -
//!   confirm, contradict, or pay the ignore penalty
//! - **Bellman action queue**: stored facts ranked into a prioritized
//!   work queue
//! - **Append-only hash chain** per tenant for integrity audits
//! - **CRDT merge** for replicated multi-agent deployments
//!
//! The engine does not embed text, call models, or speak any wire
//! protocol. Hosts inject an [`Encoder`], a [`Clock`], and a seed at
//! construction.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use cortex_core::{CortexConfig, CortexCore, FeatureHashEncoder, StoreInput, SystemClock};
//!
//! let core = CortexCore::new(
//!     None,
//!     CortexConfig::default(),
//!     Arc::new(FeatureHashEncoder::default()),
//!     Arc::new(SystemClock),
//! )?;
//!
//! let result = core.store(StoreInput {
//!     tenant_id: "agent-1".into(),
//!     project_id: "api".into(),
//!     content: "the cache is write-through".into(),
//!     ..Default::default()
//! })?;
//!
//! let actions = core.prioritize("agent-1", None)?;
//! ```
//!
//! ## Feature Flags
//!
//! - `bundled-sqlite` (default): bundled unencrypted SQLite
//! - `encryption`: SQLCipher backend keyed by `CORTEX_ENCRYPTION_KEY`

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(rustdoc::missing_crate_level_docs)]

// ============================================================================
// MODULES
// ============================================================================

pub mod admission;
pub mod capabilities;
pub mod config;
pub mod consolidation;
pub mod core;
pub mod crdt;
pub mod daemon;
pub mod engram;
pub mod error;
pub mod frequency;
pub mod graph;
pub mod policy;
pub mod search;
pub mod session;
pub mod storage;

// ============================================================================
// PUBLIC API RE-EXPORTS
// ============================================================================

// Engram types
pub use engram::{
    classify_valence, content_hash, Confidence, EmotionalTag, Engram, EngramState, FactType,
    RetrievedEngram, StoreInput, StoreOutcome, Tier, ValenceRecord, GENESIS_HASH,
};

// Errors
pub use error::{CortexError, Result};

// Engine facade
pub use crate::core::{CortexCore, SearchRequest, SearchResponse, StoreResult};

// Configuration
pub use config::CortexConfig;

// Injected capabilities
pub use capabilities::{
    cosine_similarity, seeded_rng, Clock, Encoder, FeatureHashEncoder, ManualClock, SystemClock,
};

// Storage layer
pub use storage::{ChainReport, EngramStore, ScanFilter, TenantStats};

// Admission
pub use admission::{AdaptiveResonanceGate, FastNegativeFilter, GateDecision};

// Search
pub use search::{BandConfig, QueryHints, RetrievalBand, RetrievalRouter, SearchFilter, VectorIndex};

// Consolidation lifecycle
pub use consolidation::{
    DualTraceConsolidator, EnergyVerdict, HomeostasisEngine, PruneReport, ReconsolidationTracker,
    SweepCounts,
};

// Tiers
pub use frequency::TierClassifier;

// Graphs
pub use graph::{AnticipatoryCache, CacheStatus, CausalGraph, CausalLink, CausalRelation, CoAccessGraph, PrefetchResult};

// Policy
pub use policy::{ActionItem, ActionType, PolicyConfig, PolicyEngine};

// CRDT replication
pub use crdt::{CrdtEngram, GCounter, LwwRegister, OrSet};

// Session guardrails
pub use session::{BufferedEvent, GuardrailStatus, SessionGuardrail, WorkingSetBuffer};

// Background maintenance
pub use daemon::MaintenanceDaemon;

// ============================================================================
// VERSION INFO
// ============================================================================

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================================================
// PRELUDE
// ============================================================================

/// Convenient imports for common usage
pub mod prelude {
    pub use crate::{
        ActionItem, Clock, Confidence, CortexConfig, CortexCore, CortexError, Encoder, Engram,
        EngramState, FactType, FeatureHashEncoder, ManualClock, QueryHints, Result,
        SearchRequest, SearchResponse, StoreInput, StoreOutcome, StoreResult, SystemClock, Tier,
    };

    pub use crate::{
        AdaptiveResonanceGate, AnticipatoryCache, CausalGraph, CausalLink, CrdtEngram,
        FastNegativeFilter, MaintenanceDaemon, PolicyEngine, ReconsolidationTracker,
        SessionGuardrail, TierClassifier, VectorIndex, WorkingSetBuffer,
    };
}
