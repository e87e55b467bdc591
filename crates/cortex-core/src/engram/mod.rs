//! Engram module - Core types and data structures
//!
//! An engram is the fundamental unit of stored knowledge:
//! - Immutable content plus a dense embedding (supplied by the host encoder)
//! - A metabolic energy level that decays unless the engram is accessed
//! - A lifecycle state driving the dual-trace consolidation pipeline
//! - A frequency tier reflecting observed access patterns
//! - Chain fields (`hash`, `prev_hash`) forming a per-tenant append ledger

mod types;
pub mod valence;

pub use types::{
    Confidence, Engram, EngramState, FactType, RetrievedEngram, StoreInput, StoreOutcome, Tier,
};
pub use valence::{classify_valence, EmotionalTag, ValenceRecord};

use sha2::{Digest, Sha256};

/// Hex SHA-256 of an engram's content. Used for bloom pre-checks,
/// the ACTIVE-uniqueness constraint, and as the chain payload digest.
pub fn content_hash(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex_digest(&hasher.finalize())
}

/// Chain hash for a row: binds the predecessor hash, the tenant, the
/// content digest, and the creation timestamp into one link.
pub fn chain_hash(prev_hash: &str, tenant_id: &str, content_hash: &str, created_at: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(prev_hash.as_bytes());
    hasher.update(tenant_id.as_bytes());
    hasher.update(content_hash.as_bytes());
    hasher.update(created_at.as_bytes());
    hex_digest(&hasher.finalize())
}

/// `prev_hash` of the first engram in a tenant's chain.
pub const GENESIS_HASH: &str =
    "0000000000000000000000000000000000000000000000000000000000000000";

fn hex_digest(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        use std::fmt::Write;
        let _ = write!(out, "{:02x}", b);
    }
    out
}
