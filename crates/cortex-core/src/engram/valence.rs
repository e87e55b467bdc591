//! Emotional Valence Tagging
//!
//! Memories with emotional charge are stored more strongly. The tagger
//! does not just label - it amplifies consolidation through the energy
//! multiplier applied at admission time.
//!
//! Valence spectrum:
//! - `+1.0` critical lesson (axiom, breakthrough)
//! - ` 0.0` neutral fact
//! - `-1.0` anti-pattern (confirmed failure to avoid)
//!
//! Both extremes get HIGHER energy than neutral. Anti-patterns are as
//! valuable as patterns.

use serde::{Deserialize, Serialize};

use super::FactType;

/// Error-lexicon matched against content when the fact type alone is not
/// conclusive.
const ERROR_SIGNALS: [&str; 6] = ["error", "bug", "crash", "failed", "broke", "fix"];

/// Discrete emotional categories for memory tagging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum EmotionalTag {
    /// Must never forget (errors, breakthroughs)
    Critical,
    /// Success, good pattern
    Positive,
    /// Standard fact
    #[default]
    Neutral,
    /// Failed attempt
    Negative,
    /// Confirmed bad practice
    AntiPattern,
}

/// Emotional valence metadata for an engram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValenceRecord {
    /// Emotional valence: -1 (anti-pattern) to +1 (critical)
    pub valence: f64,
    /// Discrete emotional category
    pub tag: EmotionalTag,
    /// Arousal level - how activating this memory is
    pub arousal: f64,
}

impl Default for ValenceRecord {
    fn default() -> Self {
        Self {
            valence: 0.0,
            tag: EmotionalTag::Neutral,
            arousal: 0.5,
        }
    }
}

impl ValenceRecord {
    /// Energy multiplier from valence and arousal, in [0.5, 2.0].
    ///
    /// Both extreme positive AND negative valences get boosted. Neutral
    /// memories decay normally. High arousal amplifies.
    pub fn energy_multiplier(&self) -> f64 {
        let intensity = self.valence.abs();
        let base = 1.0 + intensity;
        (base * (0.5 + 0.5 * self.arousal)).min(2.0)
    }

    /// Initial energy for a freshly admitted engram.
    ///
    /// Maps the [0.5, 2.0] multiplier into [0.6, 0.75]: high enough that
    /// a fresh engram clears the strictest retrieval band's energy floor,
    /// low enough to leave headroom for a full potentiation boost before
    /// the [0, 1] clamp bites.
    pub fn initial_energy(&self) -> f64 {
        (0.55 + 0.1 * self.energy_multiplier()).clamp(0.0, 1.0)
    }
}

/// Auto-classify emotional valence from content heuristics.
///
/// This is a fast lexical classifier; hosts that want model-based
/// classification can overwrite valence through reinforcement.
pub fn classify_valence(content: &str, fact_type: FactType) -> ValenceRecord {
    let content_lower = content.to_lowercase();

    // Error indicators -> high negative valence, high arousal
    if fact_type == FactType::Error || ERROR_SIGNALS.iter().any(|s| content_lower.contains(s)) {
        return ValenceRecord {
            valence: -0.8,
            tag: EmotionalTag::Negative,
            arousal: 0.9,
        };
    }

    match fact_type {
        FactType::Decision => ValenceRecord {
            valence: 0.6,
            tag: EmotionalTag::Positive,
            arousal: 0.7,
        },
        FactType::Bridge => ValenceRecord {
            valence: 0.9,
            tag: EmotionalTag::Critical,
            arousal: 0.8,
        },
        FactType::Rule => ValenceRecord {
            valence: 1.0,
            tag: EmotionalTag::Critical,
            arousal: 0.6,
        },
        _ => ValenceRecord::default(),
    }
}
