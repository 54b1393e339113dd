// crates/arre-core/src/task.rs
// ============================================================================
// Module: ARRE Task Types
// Description: Read-only view of tasks owned by the external task store.
// Purpose: Give the matcher, AI selector, and dispatcher a typed task shape.
// Dependencies: serde, crate::{alert, identifiers}
// ============================================================================

//! ## Overview
//! ARRE never owns task storage (see `spec.md` §1 Non-goals); it only reads
//! [`Task`] values by value for the duration of a single routing decision.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

use crate::alert::AlertSource;
use crate::identifiers::TaskId;

// ============================================================================
// SECTION: Trigger Rules
// ============================================================================

/// A single `(source, alert_name)` trigger declaration on a task.
///
/// # Invariants
/// - Matching is exact, case-sensitive string equality; there are no
///   wildcards or regular expressions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerRule {
    /// Source that must match exactly.
    pub source: AlertSource,
    /// Alert name that must match exactly.
    pub alert_name: String,
    /// Minimum time between re-executions for the same fingerprint.
    #[serde(with = "duration_secs")]
    pub dedup_interval: Duration,
}

/// `(source, alert_name)` key used to index the deterministic matcher.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TriggerKey {
    /// Canonicalized source.
    pub source: AlertSource,
    /// Alert name.
    pub alert_name: String,
}

impl TriggerKey {
    /// Builds a trigger key from its parts.
    #[must_use]
    pub fn new(source: AlertSource, alert_name: impl Into<String>) -> Self {
        Self {
            source,
            alert_name: alert_name.into(),
        }
    }
}

impl From<&TriggerRule> for TriggerKey {
    fn from(rule: &TriggerRule) -> Self {
        Self::new(rule.source.clone(), rule.alert_name.clone())
    }
}

// ============================================================================
// SECTION: Task
// ============================================================================

/// A task as read from the external task store.
///
/// # Invariants
/// - `trigger_on_alerts` order is preserved but carries no matching
///   significance; only set membership matters for `§4.3` matching.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Task identifier.
    pub id: TaskId,
    /// Human-readable title.
    pub title: String,
    /// Description used for AI-selector embedding queries and prompts.
    pub description: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Script interpreter identifier (opaque to ARRE).
    pub script_type: String,
    /// Script body or command list (opaque to ARRE).
    pub script: String,
    /// Trigger rules declared on this task.
    pub trigger_on_alerts: Vec<TriggerRule>,
    /// Whether this task is discoverable by the AI selector without a
    /// trigger rule.
    pub is_tooltask: bool,
}

impl Task {
    /// Returns the first dedup interval across trigger rules matching the
    /// given key, if any.
    #[must_use]
    pub fn dedup_interval_for(&self, key: &TriggerKey) -> Option<Duration> {
        self.trigger_on_alerts
            .iter()
            .find(|rule| rule.source == key.source && rule.alert_name == key.alert_name)
            .map(|rule| rule.dedup_interval)
    }
}

/// Fields required to create a new autonomously-generated task.
///
/// # Invariants
/// - `trigger_on_alerts` is always empty for autonomously created tasks;
///   they are invoked directly, never trigger-matched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskDraft {
    /// Human-readable title.
    pub title: String,
    /// Description / investigation plan body.
    pub description: String,
    /// Free-form tags.
    pub tags: Vec<String>,
    /// Script interpreter identifier.
    pub script_type: String,
    /// Script body or command list.
    pub script: String,
    /// Whether the created task should be discoverable as a tooltask.
    pub is_tooltask: bool,
}

mod duration_secs {
    use std::time::Duration;

    use serde::Deserialize;
    use serde::Deserializer;
    use serde::Serializer;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
