//! Error taxonomy
//!
//! Foreground operations return a result-or-error sum; callers decide.
//! Background workers log and continue - a background failure never
//! poisons the store.

/// Unified error type for all core operations
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum CortexError {
    /// Database error
    #[error("Storage I/O error: {0}")]
    StorageIo(#[from] rusqlite::Error),
    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    /// Another append is in flight for this tenant; retry
    #[error("Append chain locked for tenant: {0}")]
    ChainLocked(String),
    /// Hash chain continuity violated; quarantine the tenant
    #[error("Hash chain broken at engram {engram_id} (tenant {tenant_id})")]
    ChainBroken {
        /// Tenant whose chain failed verification
        tenant_id: String,
        /// First engram whose link does not verify
        engram_id: String,
    },
    /// Engram id not present in the store
    #[error("Unknown engram id: {0}")]
    UnknownId(String),
    /// Labile window already closed or never opened
    #[error("Reconsolidation window expired for engram {0}")]
    WindowExpired(String),
    /// Caller-side deadline exceeded before any mutation
    #[error("Operation deadline exceeded")]
    Timeout,
    /// Vector index is unavailable; search fails fast, admission degrades
    #[error("Vector index unavailable: {0}")]
    IndexUnavailable(String),
    /// Programmer error caught at construction time
    #[error("Invalid configuration: {0}")]
    Validation(String),
    /// Vector of the wrong dimension
    #[error("Invalid vector dimensions: expected {expected}, got {got}")]
    InvalidDimensions {
        /// Dimension the index was constructed with
        expected: usize,
        /// Dimension the caller supplied
        got: usize,
    },
}

/// Core result type
pub type Result<T> = std::result::Result<T, CortexError>;
