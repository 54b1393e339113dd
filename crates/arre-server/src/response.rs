// crates/arre-server/src/response.rs
// ============================================================================
// Module: Response Envelopes
// Description: Wire shapes returned by the HTTP handlers, §6.1.
// Purpose: Render a BatchOutcome into the single-object response shape
//          spec.md §6.1 defines, aggregating across however many alerts one
//          payload actually described (§4.2 SUPPLEMENT batching).
// Dependencies: arre-core, arre-engine, serde
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use arre_core::AlertRecord;
use arre_core::AlertStats;
use arre_core::ExecutedTask;
use arre_core::FlagSnapshot;
use arre_core::IncidentResponseMode;
use arre_engine::BatchOutcome;
use serde::Serialize;

// ============================================================================
// SECTION: /processAlert
// ============================================================================

/// Response body for `POST /processAlert`, matching `spec.md` §6.1.
///
/// When a single webhook delivery describes several alerts, the
/// source/name/mode fields reflect the first alert in the batch and the
/// task-level fields aggregate across all of them; every individual
/// [`AlertRecord`] is still persisted in full and reachable via the alert
/// query endpoints.
#[derive(Debug, Serialize)]
pub struct ProcessAlertResponse {
    /// Always `"success"` for a 200 response; unparseable and
    /// permission/transient failures are surfaced as non-2xx via
    /// [`crate::error::ApiError`] instead of this field.
    pub status: &'static str,
    /// Format-derived, `TitleCase`d alert source of the first alert.
    pub alert_source: String,
    /// Alert name of the first alert.
    pub alert_name: String,
    /// Total successful dispatches across every alert in the payload.
    pub tasks_executed: u32,
    /// The configured mode observed while processing.
    pub incident_response_mode: &'static str,
    /// Per-task dispatch outcomes across every alert in the payload.
    pub executed_tasks: Vec<ExecutedTask>,
    /// Autonomous-mode runbook task, when any alert in the batch launched
    /// one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub runbook_task_id: Option<String>,
    /// Autonomous-mode child investigation task.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub child_task_id: Option<String>,
    /// AI-mode confidence, present when the AI selector or launcher ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_confidence: Option<f64>,
    /// AI-mode reasoning text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_reasoning: Option<String>,
    /// Human-readable summary.
    pub message: String,
}

impl From<BatchOutcome> for ProcessAlertResponse {
    fn from(outcome: BatchOutcome) -> Self {
        let first = outcome.records.first();
        let tasks_executed = outcome.tasks_executed;
        let executed_tasks: Vec<ExecutedTask> = outcome.records.iter().flat_map(|record| record.executed_tasks.clone()).collect();
        let ai_leg = outcome.records.iter().find(|record| record.ai_attempted);

        Self {
            status: "success",
            alert_source: first.map(|record| record.alert.source.to_string()).unwrap_or_default(),
            alert_name: first.map(|record| record.alert.alert_name.clone()).unwrap_or_default(),
            tasks_executed,
            incident_response_mode: first.map_or(IncidentResponseMode::DEFAULT.as_str(), |record| record.incident_response_mode.as_str()),
            executed_tasks,
            runbook_task_id: outcome.records.iter().find_map(|record| record.runbook_task_id.as_ref()).map(ToString::to_string),
            child_task_id: outcome.records.iter().find_map(|record| record.child_task_id.as_ref()).map(ToString::to_string),
            ai_confidence: ai_leg.map(|record| record.ai_confidence),
            ai_reasoning: ai_leg.map(|record| record.ai_reasoning.clone()),
            message: summarize_message(&outcome.records, tasks_executed),
        }
    }
}

fn summarize_message(records: &[AlertRecord], tasks_executed: u32) -> String {
    if records.is_empty() {
        return "no alerts found in payload".to_string();
    }
    if tasks_executed == 0 {
        return "no matching task dispatched".to_string();
    }
    format!("{tasks_executed} task(s) dispatched across {} alert(s)", records.len())
}

// ============================================================================
// SECTION: Flags
// ============================================================================

/// Response body for `POST /setFlags` and `GET /getAdminSettingsFlags`.
#[derive(Debug, Serialize)]
pub struct FlagsResponse {
    /// Current flag snapshot.
    pub incident_response_mode: &'static str,
}

impl From<FlagSnapshot> for FlagsResponse {
    fn from(snapshot: FlagSnapshot) -> Self {
        Self {
            incident_response_mode: snapshot.incident_response_mode.as_str(),
        }
    }
}

// ============================================================================
// SECTION: Alert Queries
// ============================================================================

/// Response body for `GET /alerts`.
#[derive(Debug, Serialize)]
pub struct AlertsResponse {
    /// Matching records, newest first.
    pub records: Vec<AlertRecord>,
}

/// Response body for `GET /alerts/stats`.
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    /// Aggregate counts by selection mode.
    #[serde(flatten)]
    pub stats: AlertStats,
}
