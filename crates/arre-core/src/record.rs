// crates/arre-core/src/record.rs
// ============================================================================
// Module: ARRE Alert Record
// Description: The persisted outcome of processing a single alert.
// Purpose: Give the alert store an immutable, queryable audit shape.
// Dependencies: serde, chrono, crate::{alert, identifiers}
// ============================================================================

//! ## Overview
//! An [`AlertRecord`] is created exactly once per processed alert (`spec.md`
//! §8 invariant 6) and is never mutated after persistence; a repeated
//! delivery of the same payload produces a new record rather than updating
//! an existing one.

// ============================================================================
// SECTION: Imports
// ============================================================================

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::alert::AlertStatus;
use crate::alert::NormalizedAlert;
use crate::alert::Severity;
use crate::flags::IncidentResponseMode;
use crate::identifiers::AlertId;
use crate::identifiers::JobId;
use crate::identifiers::TaskId;

// ============================================================================
// SECTION: Selection Mode
// ============================================================================

/// Which policy, if any, produced the dispatch decision for an alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    /// A deterministic trigger rule matched.
    Deterministic,
    /// The AI selector chose a tooltask.
    AiSelected,
    /// The autonomous launcher created and ran an investigation.
    Autonomous,
    /// No policy produced a dispatch.
    None,
}

// ============================================================================
// SECTION: Execution Status
// ============================================================================

/// Outcome of a single task dispatch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskExecutionStatus {
    /// The job was submitted successfully.
    Started,
    /// Job submission failed permanently.
    Failed,
    /// The request deadline expired before submission completed.
    Timeout,
}

/// Outcome of processing an alert as a whole, summarizing its dispatches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertExecutionStatus {
    /// Every attempted dispatch started successfully (including zero
    /// dispatches, i.e. a clean no-match).
    Success,
    /// At least one dispatch started and at least one failed.
    PartialFailure,
    /// Every attempted dispatch failed.
    Failed,
    /// The request deadline expired while processing.
    Timeout,
    /// The payload could not be parsed; no routing was attempted.
    Unparseable,
}

/// A single task's dispatch outcome, as reported in the HTTP response and
/// persisted on the [`AlertRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutedTask {
    /// Task that was dispatched.
    pub task_id: TaskId,
    /// Job identifier, present when submission started successfully.
    pub job_id: Option<JobId>,
    /// Outcome of this specific dispatch.
    pub execution_status: TaskExecutionStatus,
    /// Error detail, present when `execution_status != Started`.
    pub error: Option<String>,
}

// ============================================================================
// SECTION: Alert Record
// ============================================================================

/// The persisted, immutable record of processing one alert.
///
/// # Invariants
/// - Created exactly once per processed alert; never mutated thereafter.
/// - `incident_response_mode` is the flag value observed at processing
///   time, which may differ from `selection_mode` when a deterministic
///   match pre-empted a configured AI mode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    /// Store-assigned identifier.
    pub id: AlertId,
    /// The normalized alert this record describes.
    pub alert: NormalizedAlert,
    /// Which policy produced the routing decision.
    pub selection_mode: SelectionMode,
    /// The configured mode at the time this alert was processed.
    pub incident_response_mode: IncidentResponseMode,
    /// Parent runbook task, autonomous mode only.
    pub runbook_task_id: Option<TaskId>,
    /// First submitted job, when any dispatch occurred.
    pub primary_job_id: Option<JobId>,
    /// Child investigation task, autonomous mode only.
    pub child_task_id: Option<TaskId>,
    /// Whether the AI selector or autonomous launcher was invoked at all.
    pub ai_attempted: bool,
    /// LLM-reported confidence in `[0, 1]`.
    pub ai_confidence: f64,
    /// LLM-reported reasoning text.
    pub ai_reasoning: String,
    /// Tooltask candidates the AI selector considered.
    pub ai_candidate_tooltasks: Vec<TaskId>,
    /// Summary outcome for this alert.
    pub execution_status: AlertExecutionStatus,
    /// Count of tasks whose job submission started successfully.
    pub tasks_executed: u32,
    /// Per-task dispatch outcomes.
    pub executed_tasks: Vec<ExecutedTask>,
    /// Server receipt timestamp, duplicated from `alert.received_at` for
    /// indexing convenience.
    pub received_at: DateTime<Utc>,
}

impl AlertRecord {
    /// Builds a minimal record for an alert that could not be parsed.
    #[must_use]
    pub fn unparseable(id: AlertId, received_at: DateTime<Utc>, raw_payload: serde_json::Value) -> Self {
        use std::collections::BTreeMap;

        use crate::alert::AlertSource;
        use crate::identifiers::Fingerprint;

        Self {
            id,
            alert: NormalizedAlert {
                source: AlertSource::new("Unknown"),
                alert_name: String::new(),
                status: AlertStatus::Firing,
                severity: Severity::Unknown,
                fingerprint: Fingerprint::new(String::new()),
                labels: BTreeMap::new(),
                annotations: BTreeMap::new(),
                starts_at: received_at,
                ends_at: None,
                raw_payload,
                received_at,
            },
            selection_mode: SelectionMode::None,
            incident_response_mode: IncidentResponseMode::DEFAULT,
            runbook_task_id: None,
            primary_job_id: None,
            child_task_id: None,
            ai_attempted: false,
            ai_confidence: 0.0,
            ai_reasoning: String::new(),
            ai_candidate_tooltasks: Vec::new(),
            execution_status: AlertExecutionStatus::Unparseable,
            tasks_executed: 0,
            executed_tasks: Vec::new(),
            received_at,
        }
    }
}

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Filters accepted by [`crate::interfaces::AlertStore::search`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AlertSearchFilters {
    /// Restrict to this canonicalized source.
    pub source: Option<String>,
    /// Restrict to this alert name.
    pub alert_name: Option<String>,
    /// Restrict to this selection mode.
    pub selection_mode: Option<SelectionMode>,
    /// Restrict to this severity.
    pub severity: Option<Severity>,
    /// Restrict to this status.
    pub status: Option<AlertStatus>,
    /// Free-text match over annotation descriptions.
    pub text: Option<String>,
    /// Maximum number of records returned.
    pub limit: Option<usize>,
}

/// Aggregate counts by selection mode, as returned by
/// [`crate::interfaces::AlertStore::stats`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStats {
    /// Total records persisted.
    pub total: u64,
    /// Count with `selection_mode = deterministic`.
    pub deterministic: u64,
    /// Count with `selection_mode = ai_selected`.
    pub ai_selected: u64,
    /// Count with `selection_mode = autonomous`.
    pub autonomous: u64,
    /// Count with `selection_mode = none`.
    pub none: u64,
}
