// crates/arre-engine/src/config.rs
// ============================================================================
// Module: Engine Tunables
// Description: Defaults for the AI selector and the per-request deadline
//              budget, per spec.md §4.6 and §5.
// Purpose: Give the dispatcher a single place to hold knobs that `arre-server`
//          loads from configuration rather than hardcoding.
// Dependencies: std::time
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

// ============================================================================
// SECTION: AI Selector Tunables
// ============================================================================

/// Tunables for [`crate::selector::AiSelector`], §4.6.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AiSelectorConfig {
    /// Number of candidates handed to the LLM for arbitration (step 2).
    pub top_k: usize,
    /// Upper bound on candidates requested from vector search (step 2).
    pub candidate_pool: usize,
    /// Minimum cosine similarity for a vector-search hit to be considered.
    pub similarity_floor: f64,
    /// Minimum LLM confidence required to accept a selection (step 5).
    pub min_confidence: f64,
    /// Wall-clock deadline for the LLM `select` call.
    pub llm_timeout: Duration,
    /// Dedup interval applied to AI-selected dispatches, which (unlike a
    /// deterministic match) have no trigger rule of their own to source an
    /// interval from. See `DESIGN.md` for the rationale.
    pub dedup_interval: Duration,
}

impl Default for AiSelectorConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            candidate_pool: 10,
            similarity_floor: 0.70,
            min_confidence: 0.5,
            llm_timeout: Duration::from_secs(20),
            dedup_interval: Duration::from_secs(300),
        }
    }
}

// ============================================================================
// SECTION: Request Deadlines
// ============================================================================

/// Per-request deadline budget, §5.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeadlineConfig {
    /// Default deadline for deterministic and AI-selected processing.
    pub default_deadline: Duration,
    /// Extended deadline granted to autonomous-mode processing.
    pub autonomous_deadline: Duration,
}

impl Default for DeadlineConfig {
    fn default() -> Self {
        Self {
            default_deadline: Duration::from_secs(60),
            autonomous_deadline: Duration::from_secs(120),
        }
    }
}

/// Backoff schedule applied to `Transient` job submission failures, §4.8.
pub const JOB_SUBMIT_BACKOFF: [Duration; 2] = [Duration::from_millis(200), Duration::from_millis(600)];

// ============================================================================
// SECTION: Engine Configuration
// ============================================================================

/// Top-level tunables for [`crate::dispatcher::Dispatcher`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EngineConfig {
    /// AI selector tunables.
    pub ai_selector: AiSelectorConfig,
    /// Request deadline budget.
    pub deadlines: DeadlineConfig,
}
