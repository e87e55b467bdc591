//! Injected capabilities
//!
//! The core never embeds text, never reads the wall clock directly, and
//! never seeds its own randomness. All three are supplied by the host at
//! construction, which keeps every lifecycle computation reproducible in
//! tests.

use std::sync::{Arc, Mutex};
use std::time::Instant;

use chrono::{DateTime, Duration, Utc};
use rand::rngs::StdRng;
use rand::SeedableRng;
use sha2::{Digest, Sha256};

use crate::error::{CortexError, Result};

// ============================================================================
// ENCODER
// ============================================================================

/// Embedding encoder capability.
///
/// Stateless from the core's perspective; hosts may batch internally.
pub trait Encoder: Send + Sync {
    /// Encode text into a dense vector of `dimensions()` length
    fn encode(&self, text: &str) -> Result<Vec<f32>>;

    /// Fixed output dimension, stable for the lifetime of the store
    fn dimensions(&self) -> usize;

    /// Model name recorded alongside embeddings
    fn name(&self) -> &str;
}

/// Deterministic token feature-hashing encoder.
///
/// Tokenizes on whitespace, hashes each lowercased token into a signed
/// bucket, and L2-normalizes the counts. Overlapping token sets produce
/// proportionally high cosine similarity, which is exactly what the
/// admission gate and the test suites need. Not a semantic model - hosts
/// with a real encoder inject their own.
#[derive(Debug, Clone)]
pub struct FeatureHashEncoder {
    dimensions: usize,
}

impl Default for FeatureHashEncoder {
    fn default() -> Self {
        Self::new(256)
    }
}

impl FeatureHashEncoder {
    /// Create an encoder with the given output dimension
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn token_bucket(&self, token: &str) -> (usize, f32) {
        let digest = Sha256::digest(token.as_bytes());
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&digest[..8]);
        let bucket = (u64::from_le_bytes(raw) % self.dimensions as u64) as usize;
        let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
        (bucket, sign)
    }
}

impl Encoder for FeatureHashEncoder {
    fn encode(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; self.dimensions];
        for token in text.split_whitespace() {
            let normalized: String = token
                .chars()
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
                .to_lowercase();
            if normalized.is_empty() {
                continue;
            }
            let (bucket, sign) = self.token_bucket(&normalized);
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 1e-12 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        Ok(vector)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn name(&self) -> &str {
        "feature-hash-v1"
    }
}

// ============================================================================
// CLOCK
// ============================================================================

/// Wall-clock and monotonic time capability
pub trait Clock: Send + Sync {
    /// Current wall-clock time
    fn now(&self) -> DateTime<Utc>;

    /// Monotonic instant for deadline arithmetic
    fn monotonic(&self) -> Instant {
        Instant::now()
    }
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Test clock that only moves when advanced
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<DateTime<Utc>>>,
}

impl ManualClock {
    /// Create a manual clock starting at `start`
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Advance the clock by a duration
    pub fn advance(&self, by: Duration) {
        let mut current = self.current.lock().expect("clock lock poisoned");
        *current += by;
    }

    /// Jump the clock to a specific time
    pub fn set(&self, to: DateTime<Utc>) {
        let mut current = self.current.lock().expect("clock lock poisoned");
        *current = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.current.lock().expect("clock lock poisoned")
    }
}

// ============================================================================
// RANDOMNESS
// ============================================================================

/// Build the seeded random source injected into the core
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

// ============================================================================
// DEADLINES
// ============================================================================

/// Deadline guard: returns `Timeout` when the caller's deadline has
/// already passed. Checked on entry and before every commit point so a
/// missed deadline leaves no partial mutation.
pub fn check_deadline(deadline: Option<Instant>) -> Result<()> {
    match deadline {
        Some(d) if Instant::now() >= d => Err(CortexError::Timeout),
        _ => Ok(()),
    }
}

// ============================================================================
// VECTOR MATH
// ============================================================================

/// Cosine similarity between two vectors.
///
/// Returns 0.0 for mismatched lengths or degenerate (near-zero) vectors,
/// which routes zero-vector candidates down the RESET path.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += (*x as f64) * (*y as f64);
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a.sqrt() < 1e-12 || norm_b.sqrt() < 1e-12 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())) as f32
}

/// True when the vector carries no usable direction
pub fn is_zero_vector(v: &[f32]) -> bool {
    v.iter().map(|x| (*x as f64) * (*x as f64)).sum::<f64>().sqrt() < 1e-12
}

// ============================================================================
// TESTS
// ============================================================================
