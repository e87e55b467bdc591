//! Graph Module
//!
//! Id-keyed relationship structures over engrams:
//! - Causal graph with zombie-decision detection
//! - Co-access graph with anticipatory prefetch

mod causal;
mod coaccess;

pub use causal::{CausalGraph, CausalLink, CausalRelation};
pub use coaccess::{AnticipatoryCache, CacheStatus, CoAccessGraph, PrefetchResult};
