//! Policy Engine - Bellman Value Function
//!
//! Converts stored memory into a prioritized action queue using a
//! Bellman-inspired value function: `V(s) = R(s,a) + gamma * V(s')`.
//!
//! - `R(s,a)` immediate reward: fact-type base modulated by age,
//!   confidence, and consensus
//! - `V(s')` estimated future value: cross-project reach and blocking
//!   pressure, compressed through `1 - exp(-x/3)`
//!
//! Operates entirely on a scan snapshot; results may be slightly stale,
//! which is acceptable for an advisory queue.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::engram::{Confidence, Engram, FactType};

use super::models::{base_reward, source_priority, ActionItem, ActionType, PolicyConfig};

/// Keywords that mark a ghost/error as likely blocking other work
const BLOCKING_KEYWORDS: [&str; 12] = [
    "blocking",
    "blocked",
    "critical",
    "urgent",
    "deploy",
    "ship",
    "production",
    "release",
    "security",
    "vulnerability",
    "crash",
    "broken",
];

/// Bellman-inspired policy engine
#[derive(Debug, Clone, Default)]
pub struct PolicyEngine {
    config: PolicyConfig,
}

impl PolicyEngine {
    /// Create an engine with the given configuration
    pub fn new(config: PolicyConfig) -> Self {
        Self { config }
    }

    /// Current configuration
    pub fn config(&self) -> &PolicyConfig {
        &self.config
    }

    /// Evaluate a snapshot of facts and return a prioritized action queue
    pub fn evaluate(&self, facts: &[Engram], now: DateTime<Utc>) -> Vec<ActionItem> {
        if facts.is_empty() {
            return vec![];
        }

        // Cross-reference index for future value estimation
        let mut project_index: HashMap<&str, Vec<&Engram>> = HashMap::new();
        for fact in facts {
            project_index.entry(fact.project_id.as_str()).or_default().push(fact);
        }

        let mut actions: Vec<ActionItem> = facts
            .iter()
            .map(|fact| self.score_fact(fact, &project_index, now))
            .filter(|action| action.value > 0.0)
            .collect();

        actions.sort_by(|a, b| {
            b.value
                .partial_cmp(&a.value)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| {
                    source_priority(a.source_type).cmp(&source_priority(b.source_type))
                })
                .then_with(|| {
                    let a_created = a.metadata.get("created_at");
                    let b_created = b.metadata.get("created_at");
                    b_created.cmp(&a_created)
                })
        });
        actions.truncate(self.config.max_actions);
        actions
    }

    // ── Scoring ─────────────────────────────────────────────────────

    fn score_fact(
        &self,
        fact: &Engram,
        project_index: &HashMap<&str, Vec<&Engram>>,
        now: DateTime<Utc>,
    ) -> ActionItem {
        let reward = self.compute_reward(fact, now);
        let future = self.compute_future_value(fact, project_index);
        let value = (reward + self.config.gamma * future).clamp(0.0, 1.0);

        let action_type = ActionType::for_fact_type(fact.fact_type);

        let mut metadata = BTreeMap::new();
        metadata.insert("tags".to_string(), fact.tags.join(","));
        metadata.insert("confidence".to_string(), fact.confidence.to_string());
        metadata.insert(
            "consensus_score".to_string(),
            format!("{:.2}", fact.consensus_score()),
        );
        metadata.insert("created_at".to_string(), fact.created_at.to_rfc3339());

        ActionItem {
            fact_id: fact.id.clone(),
            project: fact.project_id.clone(),
            action_type,
            description: Self::describe_action(fact, action_type),
            value,
            urgency: reward,
            impact: future,
            source_type: fact.fact_type,
            metadata,
        }
    }

    /// Immediate reward: base by type, discounted by age, modulated by
    /// confidence and consensus
    fn compute_reward(&self, fact: &Engram, now: DateTime<Utc>) -> f64 {
        let base = base_reward(fact.fact_type);
        let age_days = fact.age_days(now);

        let time_factor = match fact.fact_type {
            FactType::Ghost => self.config.ghost_age_decay.powf(age_days),
            FactType::Error => {
                let age_hours = age_days * 24.0;
                if age_hours < self.config.recency_window_hours {
                    self.config.error_recency_weight
                } else {
                    (1.0 - age_days / 30.0).max(0.3)
                }
            }
            _ => (1.0 - age_days / 90.0).max(0.2),
        };

        // Low confidence -> higher urgency to verify
        let conf_multiplier = match fact.confidence {
            Confidence::C1 => 1.3,
            Confidence::C2 => 1.2,
            Confidence::C3 => 1.0,
            Confidence::C4 => 0.9,
            Confidence::C5 => 0.8,
        };

        // Low consensus -> needs attention
        let consensus_mod = if fact.consensus_score() < 0.5 { 1.3 } else { 1.0 };

        (base * time_factor * conf_multiplier * consensus_mod).min(1.0)
    }

    /// Estimated downstream value of resolving this fact
    fn compute_future_value(
        &self,
        fact: &Engram,
        project_index: &HashMap<&str, Vec<&Engram>>,
    ) -> f64 {
        let mut future = 0.0;
        let content_lower = fact.content.to_lowercase();

        // Cross-project detection: fact content mentions another project
        let other_projects: Vec<&str> = project_index
            .keys()
            .copied()
            .filter(|p| *p != fact.project_id.as_str())
            .collect();
        if other_projects
            .iter()
            .any(|p| content_lower.contains(&p.to_lowercase()))
        {
            future += self.config.cross_project_bonus;
        }

        // Blocking pressure: ghosts and errors referencing critical
        // keywords are likely blocking other work
        if matches!(fact.fact_type, FactType::Ghost | FactType::Error)
            && BLOCKING_KEYWORDS.iter().any(|kw| content_lower.contains(kw))
        {
            future += self.config.blocking_multiplier;
        }

        // Bridges unlock pattern reuse per mentioned project
        if fact.fact_type == FactType::Bridge {
            let mentioned = other_projects
                .iter()
                .filter(|p| content_lower.contains(&p.to_lowercase()))
                .count();
            future += mentioned as f64 * 0.3;
        }

        // Compress high totals into [0, 1]
        if future > 0.0 {
            future = 1.0 - (-future / 3.0).exp();
        }
        future
    }

    fn describe_action(fact: &Engram, action_type: ActionType) -> String {
        let content: String = fact.content.chars().take(120).collect();
        format!(
            "{} [{}]: {}",
            action_type.description_prefix(),
            fact.project_id,
            content
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================
