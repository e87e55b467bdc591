//! Bloom Fast-Negative Pre-Check
//!
//! Before the admission gate runs a neighbor search, the bloom filter
//! answers in O(1): "has content with this hash PROBABLY been seen?"
//!
//! - NO  -> store directly, skip the gate (fast-insert path)
//! - YES -> run the full resonance pipeline
//!
//! False positives only cost one extra neighbor search; false negatives
//! are impossible, so a genuine duplicate can never skip the gate twice
//! with the same hash.

use bloomfilter::Bloom;
use sha2::{Digest, Sha256};

/// Tokens too common to distinguish content; stripped before
/// fingerprinting so trivial rephrasings ("the cache is write-through"
/// vs "cache is write-through") collide in the filter and reach the gate
const STOPWORDS: [&str; 22] = [
    "the", "a", "an", "is", "are", "was", "were", "be", "been", "to", "of", "in", "on", "at",
    "for", "and", "or", "we", "it", "this", "that", "with",
];

/// Order-insensitive content fingerprint for the fast-negative filter.
///
/// Lowercased alphanumeric tokens, stopwords removed, sorted and
/// deduplicated, hashed. Distinct phrasings of the same fact map to the
/// same key; genuinely novel content almost never does.
pub fn semantic_fingerprint(content: &str) -> String {
    let mut tokens: Vec<String> = content
        .split_whitespace()
        .map(|t| {
            t.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
                .to_lowercase()
        })
        .filter(|t| !t.is_empty() && !STOPWORDS.contains(&t.as_str()))
        .collect();
    tokens.sort();
    tokens.dedup();

    let mut hasher = Sha256::new();
    for token in &tokens {
        hasher.update(token.as_bytes());
        hasher.update([0u8]);
    }
    let digest = hasher.finalize();
    let mut out = String::with_capacity(64);
    for b in digest {
        use std::fmt::Write;
        let _ = write!(out, "{:02x}", b);
    }
    out
}

/// Space-efficient probabilistic set over content hashes
pub struct FastNegativeFilter {
    bloom: Bloom<str>,
    inserted: usize,
}

impl FastNegativeFilter {
    /// Create a filter sized for `expected_items` at `fp_rate`
    pub fn new(expected_items: usize, fp_rate: f64) -> Self {
        let expected = expected_items.max(1);
        let rate = if fp_rate > 0.0 && fp_rate < 1.0 { fp_rate } else { 0.01 };
        Self {
            bloom: Bloom::new_for_fp_rate(expected, rate),
            inserted: 0,
        }
    }

    /// Record a content hash
    pub fn add(&mut self, content_hash: &str) {
        self.bloom.set(content_hash);
        self.inserted += 1;
    }

    /// Check if the hash MIGHT exist (false positives possible)
    pub fn might_contain(&self, content_hash: &str) -> bool {
        self.bloom.check(content_hash)
    }

    /// Number of hashes recorded (including re-inserts)
    pub fn inserted(&self) -> usize {
        self.inserted
    }

    /// Size of the underlying bit array
    pub fn bit_count(&self) -> u64 {
        self.bloom.number_of_bits()
    }

    /// Number of hash functions used
    pub fn hash_count(&self) -> u32 {
        self.bloom.number_of_hash_functions()
    }
}
