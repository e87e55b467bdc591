//! Policy Module
//!
//! Bellman-inspired conversion of stored facts into a prioritized action
//! queue. No extra tables - operates entirely on scan snapshots.

mod engine;
mod models;

pub use engine::PolicyEngine;
pub use models::{base_reward, source_priority, ActionItem, ActionType, PolicyConfig};
