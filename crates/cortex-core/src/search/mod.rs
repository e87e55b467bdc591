//! Search Module
//!
//! Provides the retrieval side of the engine:
//! - Filtered HNSW vector search (USearch) with deterministic ordering
//! - Band routing that shapes search parameters from query shape

mod router;
mod vector;

pub use router::{BandConfig, QueryHints, RetrievalBand, RetrievalRouter};
pub use vector::{
    EntryMeta, SearchFilter, VectorIndex, DEFAULT_CONNECTIVITY, DEFAULT_EXPANSION_ADD,
    DEFAULT_EXPANSION_SEARCH,
};
