//! End-to-end test support for the cortex-core engine.
//!
//! The harness assembles an engine with deterministic capabilities: a
//! feature-hash encoder (identical content -> identical vectors, shared
//! tokens -> proportional similarity) and a manually advanced clock so
//! maturation, decay, and labile windows run without real waiting.

pub mod harness;
