//! Working-Set Buffer & Session Guardrails
//!
//! The working-set buffer manages a token-counted sliding window (the
//! per-turn budget); the session guardrail caps the ENTIRE session
//! lifetime budget. When the session budget is exceeded, new events are
//! rejected to prevent runaway token consumption in long-running agent
//! loops.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// WORKING-SET BUFFER
// ============================================================================

/// One buffered event with its token cost
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BufferedEvent {
    /// Event payload
    pub content: String,
    /// Token cost as counted by the host
    pub tokens: u64,
}

/// Sliding-window token buffer; evicts from the head when over budget
#[derive(Debug)]
pub struct WorkingSetBuffer {
    events: VecDeque<BufferedEvent>,
    max_tokens: u64,
    current_tokens: u64,
}

impl WorkingSetBuffer {
    /// Create a buffer with the given token budget
    pub fn new(max_tokens: u64) -> Self {
        Self {
            events: VecDeque::new(),
            max_tokens,
            current_tokens: 0,
        }
    }

    /// Append an event, evicting from the head until within budget.
    /// Returns the number of evicted events.
    pub fn add_event(&mut self, event: BufferedEvent) -> usize {
        self.current_tokens += event.tokens;
        self.events.push_back(event);

        let mut evicted = 0;
        while self.current_tokens > self.max_tokens && self.events.len() > 1 {
            if let Some(removed) = self.events.pop_front() {
                self.current_tokens -= removed.tokens;
                evicted += 1;
            }
        }
        // A single oversized event still gets dropped rather than pinning
        // the buffer above budget forever
        if self.current_tokens > self.max_tokens {
            if let Some(removed) = self.events.pop_front() {
                self.current_tokens -= removed.tokens;
                evicted += 1;
            }
        }
        evicted
    }

    /// Events currently in the window, oldest first
    pub fn events(&self) -> impl Iterator<Item = &BufferedEvent> {
        self.events.iter()
    }

    /// Tokens currently held
    pub fn current_tokens(&self) -> u64 {
        self.current_tokens
    }

    /// Number of buffered events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the buffer is empty
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

// ============================================================================
// SESSION GUARDRAIL
// ============================================================================

/// Telemetry snapshot of the guardrail
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuardrailStatus {
    /// Tokens consumed this session
    pub consumed: u64,
    /// Tokens remaining in the budget
    pub remaining: u64,
    /// Session budget
    pub max_tokens: u64,
    /// consumed / max_tokens
    pub utilization: f64,
    /// Turns completed
    pub turns: u64,
    /// Turn cap (0 = unlimited)
    pub max_turns: u64,
    /// Whether the warn threshold has been crossed
    pub warned: bool,
    /// Session duration in seconds
    pub duration_s: f64,
}

/// Hard cap on total tokens consumed per agent session
#[derive(Debug)]
pub struct SessionGuardrail {
    max_tokens: u64,
    warn_threshold: f64,
    max_turns: u64,
    consumed: u64,
    turns: u64,
    started_at: DateTime<Utc>,
    warned: bool,
}

impl SessionGuardrail {
    /// Create a guardrail; `max_turns == 0` means unlimited turns
    pub fn new(max_tokens: u64, warn_threshold: f64, max_turns: u64, started_at: DateTime<Utc>) -> Self {
        Self {
            max_tokens,
            warn_threshold,
            max_turns,
            consumed: 0,
            turns: 0,
            started_at,
            warned: false,
        }
    }

    /// Attempt to consume tokens from the session budget.
    ///
    /// Returns false (hard reject, nothing consumed) when the token cap
    /// or the turn cap would be exceeded. Logs a single warning the first
    /// time utilization crosses the warn threshold.
    pub fn consume(&mut self, tokens: u64) -> bool {
        if self.max_turns > 0 && self.turns >= self.max_turns {
            tracing::warn!(
                turns = self.turns,
                max_turns = self.max_turns,
                "SessionGuardrail: turn limit reached"
            );
            return false;
        }

        if self.consumed + tokens > self.max_tokens {
            tracing::warn!(
                refused = tokens,
                consumed = self.consumed,
                max_tokens = self.max_tokens,
                "SessionGuardrail: hard limit, refusing tokens"
            );
            return false;
        }

        self.consumed += tokens;

        if !self.warned && self.utilization() >= self.warn_threshold {
            self.warned = true;
            tracing::warn!(
                utilization = format!("{:.0}%", self.utilization() * 100.0),
                consumed = self.consumed,
                max_tokens = self.max_tokens,
                "SessionGuardrail: budget warning threshold crossed"
            );
        }

        true
    }

    /// Register a conversation turn
    pub fn tick_turn(&mut self) {
        self.turns += 1;
    }

    /// Tokens consumed this session; never decreases
    pub fn consumed(&self) -> u64 {
        self.consumed
    }

    /// Tokens remaining; `consumed + remaining == max_tokens`
    pub fn remaining(&self) -> u64 {
        self.max_tokens.saturating_sub(self.consumed)
    }

    /// Budget utilization ratio in [0, 1]
    pub fn utilization(&self) -> f64 {
        if self.max_tokens == 0 {
            return 0.0;
        }
        self.consumed as f64 / self.max_tokens as f64
    }

    /// Turns completed
    pub fn turns(&self) -> u64 {
        self.turns
    }

    /// Telemetry snapshot
    pub fn status(&self, now: DateTime<Utc>) -> GuardrailStatus {
        GuardrailStatus {
            consumed: self.consumed,
            remaining: self.remaining(),
            max_tokens: self.max_tokens,
            utilization: self.utilization(),
            turns: self.turns,
            max_turns: self.max_turns,
            warned: self.warned,
            duration_s: (now - self.started_at).num_milliseconds() as f64 / 1000.0,
        }
    }
}

// ============================================================================
// TESTS
// ============================================================================
