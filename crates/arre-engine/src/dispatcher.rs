// crates/arre-engine/src/dispatcher.rs
// ============================================================================
// Module: Dispatcher
// Description: The per-alert state machine, §4.5.
// Purpose: Turn one normalized alert into zero or more job submissions and
//          exactly one persisted AlertRecord.
// Dependencies: arre-core, arre-dedup, arre-matcher, arre-normalize, tracing
// ============================================================================

//! ## Overview
//! [`Dispatcher::process_payload`] is the single entry point `arre-server`
//! calls. It normalizes the raw webhook body into one or more alerts
//! (`spec.md` §4.2's multi-alert Grafana/Alertmanager case) and runs
//! [`Dispatcher::process_alert`] for each, concatenating their outcomes.
//!
//! `process_alert` implements states S1 through S6 of `spec.md` §4.5:
//! deterministic match always pre-empts the configured response mode; a
//! miss falls through to AI-selected or autonomous handling depending on
//! the current flag value; a clean no-match under deterministic mode is not
//! an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use arre_core::AlertContext;
use arre_core::AlertExecutionStatus;
use arre_core::AlertRecord;
use arre_core::AlertStore;
use arre_core::Deadline;
use arre_core::ExecutedTask;
use arre_core::FlagStore;
use arre_core::IncidentResponseMode;
use arre_core::JobId;
use arre_core::JobSubmitError;
use arre_core::JobSubmitter;
use arre_core::NormalizedAlert;
use arre_core::SelectionMode;
use arre_core::StoreError;
use arre_core::TaskExecutionStatus;
use arre_core::TaskId;
use arre_core::TaskStore;
use arre_core::TriggerKey;
use arre_dedup::DedupOutcome;
use arre_dedup::DedupWindow;
use arre_matcher::DeterministicMatcher;
use arre_matcher::MatchError;
use arre_normalize::NormalizeError;
use thiserror::Error;

use crate::config::EngineConfig;
use crate::launcher::AutonomousLauncher;
use crate::selector::AiSelectionOutcome;
use crate::selector::AiSelector;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure modes surfaced to `arre-server`'s HTTP boundary.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The inbound payload could not be normalized into any alert.
    #[error("unparseable payload: {0}")]
    Unparseable(#[from] NormalizeError),
    /// A collaborator needed to make or act on a routing decision is
    /// unavailable; safe to retry.
    #[error("transient dispatch failure: {0}")]
    Transient(String),
    /// The request deadline expired before processing completed.
    #[error("dispatch deadline exceeded")]
    Timeout,
    /// Persisting the resulting record failed.
    #[error("failed to persist alert record: {0}")]
    Persist(#[from] StoreError),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of dispatching a single payload, which may contain multiple
/// alerts.
#[derive(Debug, Clone, Default)]
pub struct BatchOutcome {
    /// Persisted records, one per alert that could be normalized.
    pub records: Vec<AlertRecord>,
    /// Total successfully-started dispatches across every alert.
    pub tasks_executed: u32,
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Composes every collaborator the §4.5 state machine needs.
pub struct Dispatcher {
    flag_store: Arc<dyn FlagStore>,
    matcher: Arc<DeterministicMatcher<dyn TaskStore>>,
    task_store: Arc<dyn TaskStore>,
    dedup_window: DedupWindow,
    ai_selector: AiSelector,
    launcher: AutonomousLauncher,
    job_submitter: Arc<dyn JobSubmitter>,
    alert_store: Arc<dyn AlertStore>,
    config: EngineConfig,
}

impl Dispatcher {
    /// Builds a dispatcher from its collaborators and tunables.
    #[must_use]
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        flag_store: Arc<dyn FlagStore>,
        task_store: Arc<dyn TaskStore>,
        vector_search: Arc<dyn arre_core::VectorSearch>,
        llm: Arc<dyn arre_core::LlmAdapter>,
        job_submitter: Arc<dyn JobSubmitter>,
        alert_store: Arc<dyn AlertStore>,
        config: EngineConfig,
    ) -> Self {
        let ai_selector = AiSelector::new(
            Arc::clone(&vector_search),
            Arc::clone(&llm),
            Arc::clone(&task_store),
            config.ai_selector,
        );
        let launcher = AutonomousLauncher::new(Arc::clone(&task_store), Arc::clone(&llm), Arc::clone(&job_submitter));
        Self {
            flag_store,
            matcher: Arc::new(DeterministicMatcher::new(Arc::clone(&task_store))),
            task_store,
            dedup_window: DedupWindow::new(),
            ai_selector,
            launcher,
            job_submitter,
            alert_store,
            config,
        }
    }

    /// Normalizes `raw_body` and dispatches every resulting alert,
    /// aggregating their outcomes.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::Unparseable`] when no alert can be derived
    /// from the payload at all. Per-alert dispatch failures are captured in
    /// the returned records rather than propagated, except where §4.5
    /// requires the whole request to fail (see `process_alert`).
    pub fn process_payload(
        &self,
        raw_body: &[u8],
        routing_hint: Option<String>,
        workspace: &str,
        received_at: chrono::DateTime<chrono::Utc>,
        deadline: Deadline,
    ) -> Result<BatchOutcome, DispatchError> {
        let alerts = arre_normalize::normalize(raw_body, received_at)?;
        let mut outcome = BatchOutcome::default();
        let mut first_error = None;

        for alert in alerts {
            match self.process_alert(&alert, routing_hint.clone(), workspace, deadline) {
                Ok(record) => {
                    let task_ids: Vec<&str> = record.executed_tasks.iter().map(|task| task.task_id.as_str()).collect();
                    tracing::info!(
                        fingerprint = %alert.fingerprint,
                        task_id = ?task_ids,
                        execution_status = ?record.execution_status,
                        "alert dispatched"
                    );
                    outcome.tasks_executed += record.tasks_executed;
                    outcome.records.push(record);
                }
                Err(err) => {
                    tracing::warn!(fingerprint = %alert.fingerprint, error = %err, "alert dispatch failed");
                    first_error.get_or_insert(err);
                }
            }
        }

        match first_error {
            Some(err) if outcome.records.is_empty() => Err(err),
            _ => Ok(outcome),
        }
    }

    /// Runs the §4.5 state machine for a single alert and persists the
    /// resulting record.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError`] when the matcher's index cannot be read at
    /// all (no misleading record is persisted in that case), or when
    /// persisting the final record fails.
    pub fn process_alert(
        &self,
        alert: &NormalizedAlert,
        routing_hint: Option<String>,
        workspace: &str,
        deadline: Deadline,
    ) -> Result<AlertRecord, DispatchError> {
        let flags = self.flag_store.get_flags();

        // S1/S2: deterministic match always pre-empts the configured mode.
        let trigger_key = TriggerKey::new(alert.source.clone(), alert.alert_name.clone());
        let matches = self.deterministic_matches(alert, deadline)?;

        if !matches.is_empty() {
            return self.dispatch_deterministic(alert, &trigger_key, matches, routing_hint, workspace, deadline, flags.incident_response_mode);
        }

        match flags.incident_response_mode {
            IncidentResponseMode::Deterministic => self.persist_no_match(alert, flags.incident_response_mode),
            IncidentResponseMode::AiSelected => {
                self.dispatch_ai_selected(alert, routing_hint, workspace, deadline, flags.incident_response_mode)
            }
            IncidentResponseMode::Autonomous => {
                self.dispatch_autonomous(alert, routing_hint, workspace, deadline, flags.incident_response_mode)
            }
        }
    }

    // ------------------------------------------------------------------
    // S1/S2: deterministic matching
    // ------------------------------------------------------------------

    fn deterministic_matches(&self, alert: &NormalizedAlert, deadline: Deadline) -> Result<Vec<TaskId>, DispatchError> {
        match self.matcher.match_alert(alert, deadline) {
            Ok(matches) => Ok(matches),
            Err(MatchError::IndexUnavailable(err)) => {
                tracing::warn!(fingerprint = %alert.fingerprint, error = %err, "deterministic matcher index unavailable");
                Err(DispatchError::Transient(err.to_string()))
            }
        }
    }

    fn dispatch_deterministic(
        &self,
        alert: &NormalizedAlert,
        trigger_key: &TriggerKey,
        task_ids: Vec<TaskId>,
        routing_hint: Option<String>,
        workspace: &str,
        deadline: Deadline,
        mode: IncidentResponseMode,
    ) -> Result<AlertRecord, DispatchError> {
        let context = AlertContext {
            alert: alert.clone(),
            routing_hint,
        };

        let mut executed = Vec::with_capacity(task_ids.len());
        let mut primary_job_id = None;

        for task_id in task_ids {
            if deadline.is_expired() {
                executed.push(ExecutedTask {
                    task_id,
                    job_id: None,
                    execution_status: TaskExecutionStatus::Timeout,
                    error: Some("deadline exceeded before dispatch".to_string()),
                });
                continue;
            }

            let dedup_interval = self
                .task_store
                .get_task(&task_id)
                .ok()
                .flatten()
                .and_then(|task| task.dedup_interval_for(trigger_key))
                .unwrap_or(Duration::ZERO);

            let dedup_outcome =
                self.dedup_window.check_and_mark(&task_id, trigger_key, &alert.fingerprint, dedup_interval);
            if dedup_outcome == DedupOutcome::Suppressed {
                continue;
            }

            match self.submit_with_retry(&task_id, &context, workspace, deadline) {
                Ok(job_id) => {
                    primary_job_id.get_or_insert_with(|| job_id.clone());
                    executed.push(ExecutedTask {
                        task_id,
                        job_id: Some(job_id),
                        execution_status: TaskExecutionStatus::Started,
                        error: None,
                    });
                }
                Err(err) => {
                    executed.push(ExecutedTask {
                        task_id,
                        job_id: None,
                        execution_status: TaskExecutionStatus::Failed,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let execution_status = summarize(&executed);
        let tasks_executed = executed
            .iter()
            .filter(|task| task.execution_status == TaskExecutionStatus::Started)
            .count() as u32;

        self.persist(AlertRecord {
            id: arre_core::AlertId::new(String::new()),
            alert: alert.clone(),
            selection_mode: SelectionMode::Deterministic,
            incident_response_mode: mode,
            runbook_task_id: None,
            primary_job_id,
            child_task_id: None,
            ai_attempted: false,
            ai_confidence: 0.0,
            ai_reasoning: String::new(),
            ai_candidate_tooltasks: Vec::new(),
            execution_status,
            tasks_executed,
            executed_tasks: executed,
            received_at: alert.received_at,
        })
    }

    // ------------------------------------------------------------------
    // S3/S4: AI-selected mode
    // ------------------------------------------------------------------

    fn dispatch_ai_selected(
        &self,
        alert: &NormalizedAlert,
        routing_hint: Option<String>,
        workspace: &str,
        deadline: Deadline,
        mode: IncidentResponseMode,
    ) -> Result<AlertRecord, DispatchError> {
        let outcome = self.ai_selector.select(alert, deadline);

        let (task_id, confidence, reasoning, candidates) = match outcome {
            AiSelectionOutcome::NoCandidate { candidates_considered } => {
                let execution_status =
                    if deadline.is_expired() { AlertExecutionStatus::Timeout } else { AlertExecutionStatus::Success };
                return self.persist(AlertRecord {
                    id: arre_core::AlertId::new(String::new()),
                    alert: alert.clone(),
                    selection_mode: SelectionMode::None,
                    incident_response_mode: mode,
                    runbook_task_id: None,
                    primary_job_id: None,
                    child_task_id: None,
                    ai_attempted: true,
                    ai_confidence: 0.0,
                    ai_reasoning: String::new(),
                    ai_candidate_tooltasks: candidates_considered,
                    execution_status,
                    tasks_executed: 0,
                    executed_tasks: Vec::new(),
                    received_at: alert.received_at,
                });
            }
            AiSelectionOutcome::Selected {
                task_id,
                confidence,
                reasoning,
                candidates_considered,
            } => {
                if deadline.is_expired() {
                    return self.persist(AlertRecord {
                        id: arre_core::AlertId::new(String::new()),
                        alert: alert.clone(),
                        selection_mode: SelectionMode::AiSelected,
                        incident_response_mode: mode,
                        runbook_task_id: None,
                        primary_job_id: None,
                        child_task_id: None,
                        ai_attempted: true,
                        ai_confidence: confidence,
                        ai_reasoning: reasoning,
                        ai_candidate_tooltasks: candidates_considered,
                        execution_status: AlertExecutionStatus::Timeout,
                        tasks_executed: 0,
                        executed_tasks: vec![ExecutedTask {
                            task_id,
                            job_id: None,
                            execution_status: TaskExecutionStatus::Timeout,
                            error: Some("deadline exceeded before dispatch".to_string()),
                        }],
                        received_at: alert.received_at,
                    });
                }
                (task_id, confidence, reasoning, candidates_considered)
            }
        };

        // Synthetic trigger key: an AI-selected dispatch has no trigger rule
        // of its own, so dedup keys off the alert's own identity instead.
        let trigger_key = TriggerKey::new(alert.source.clone(), alert.alert_name.clone());
        let dedup_outcome = self.dedup_window.check_and_mark(
            &task_id,
            &trigger_key,
            &alert.fingerprint,
            self.config.ai_selector.dedup_interval,
        );

        let mut executed = Vec::new();
        let mut primary_job_id = None;

        if dedup_outcome == DedupOutcome::Fired && deadline.is_expired() {
            executed.push(ExecutedTask {
                task_id: task_id.clone(),
                job_id: None,
                execution_status: TaskExecutionStatus::Timeout,
                error: Some("deadline exceeded before dispatch".to_string()),
            });
        } else if dedup_outcome == DedupOutcome::Fired {
            let context = AlertContext {
                alert: alert.clone(),
                routing_hint,
            };
            match self.submit_with_retry(&task_id, &context, workspace, deadline) {
                Ok(job_id) => {
                    primary_job_id = Some(job_id.clone());
                    executed.push(ExecutedTask {
                        task_id: task_id.clone(),
                        job_id: Some(job_id),
                        execution_status: TaskExecutionStatus::Started,
                        error: None,
                    });
                }
                Err(err) => {
                    executed.push(ExecutedTask {
                        task_id: task_id.clone(),
                        job_id: None,
                        execution_status: TaskExecutionStatus::Failed,
                        error: Some(err.to_string()),
                    });
                }
            }
        }

        let execution_status = summarize(&executed);
        let tasks_executed = executed
            .iter()
            .filter(|task| task.execution_status == TaskExecutionStatus::Started)
            .count() as u32;

        self.persist(AlertRecord {
            id: arre_core::AlertId::new(String::new()),
            alert: alert.clone(),
            selection_mode: SelectionMode::AiSelected,
            incident_response_mode: mode,
            runbook_task_id: None,
            primary_job_id,
            child_task_id: None,
            ai_attempted: true,
            ai_confidence: confidence,
            ai_reasoning: reasoning,
            ai_candidate_tooltasks: candidates,
            execution_status,
            tasks_executed,
            executed_tasks: executed,
            received_at: alert.received_at,
        })
    }

    // ------------------------------------------------------------------
    // S5/S6: autonomous mode
    // ------------------------------------------------------------------

    fn dispatch_autonomous(
        &self,
        alert: &NormalizedAlert,
        routing_hint: Option<String>,
        workspace: &str,
        deadline: Deadline,
        mode: IncidentResponseMode,
    ) -> Result<AlertRecord, DispatchError> {
        if deadline.is_expired() {
            return self.persist(AlertRecord {
                id: arre_core::AlertId::new(String::new()),
                alert: alert.clone(),
                selection_mode: SelectionMode::None,
                incident_response_mode: mode,
                runbook_task_id: None,
                primary_job_id: None,
                child_task_id: None,
                ai_attempted: true,
                ai_confidence: 0.0,
                ai_reasoning: String::new(),
                ai_candidate_tooltasks: Vec::new(),
                execution_status: AlertExecutionStatus::Timeout,
                tasks_executed: 0,
                executed_tasks: Vec::new(),
                received_at: alert.received_at,
            });
        }

        match self.launcher.launch(alert, workspace, routing_hint, deadline) {
            Ok(launch) => self.persist(AlertRecord {
                id: arre_core::AlertId::new(String::new()),
                alert: alert.clone(),
                selection_mode: SelectionMode::Autonomous,
                incident_response_mode: mode,
                runbook_task_id: Some(launch.runbook_task_id),
                primary_job_id: Some(launch.job_id.clone()),
                child_task_id: Some(launch.child_task_id.clone()),
                ai_attempted: true,
                ai_confidence: 1.0,
                ai_reasoning: "autonomous investigation launched".to_string(),
                ai_candidate_tooltasks: Vec::new(),
                execution_status: AlertExecutionStatus::Success,
                tasks_executed: 1,
                executed_tasks: vec![ExecutedTask {
                    task_id: launch.child_task_id,
                    job_id: Some(launch.job_id),
                    execution_status: TaskExecutionStatus::Started,
                    error: None,
                }],
                received_at: alert.received_at,
            }),
            Err(err) => {
                let execution_status =
                    if deadline.is_expired() { AlertExecutionStatus::Timeout } else { AlertExecutionStatus::Failed };
                let record = self.persist(AlertRecord {
                    id: arre_core::AlertId::new(String::new()),
                    alert: alert.clone(),
                    selection_mode: SelectionMode::None,
                    incident_response_mode: mode,
                    runbook_task_id: None,
                    primary_job_id: None,
                    child_task_id: None,
                    ai_attempted: true,
                    ai_confidence: 0.0,
                    ai_reasoning: String::new(),
                    ai_candidate_tooltasks: Vec::new(),
                    execution_status,
                    tasks_executed: 0,
                    executed_tasks: Vec::new(),
                    received_at: alert.received_at,
                })?;
                tracing::warn!(fingerprint = %alert.fingerprint, error = %err, status = ?execution_status, "autonomous launch failed, record persisted");
                let _ = record;
                Err(DispatchError::Transient(err.to_string()))
            }
        }
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    fn persist_no_match(&self, alert: &NormalizedAlert, mode: IncidentResponseMode) -> Result<AlertRecord, DispatchError> {
        self.persist(AlertRecord {
            id: arre_core::AlertId::new(String::new()),
            alert: alert.clone(),
            selection_mode: SelectionMode::None,
            incident_response_mode: mode,
            runbook_task_id: None,
            primary_job_id: None,
            child_task_id: None,
            ai_attempted: false,
            ai_confidence: 0.0,
            ai_reasoning: String::new(),
            ai_candidate_tooltasks: Vec::new(),
            execution_status: AlertExecutionStatus::Success,
            tasks_executed: 0,
            executed_tasks: Vec::new(),
            received_at: alert.received_at,
        })
    }

    fn persist(&self, record: AlertRecord) -> Result<AlertRecord, DispatchError> {
        Ok(self.alert_store.persist(record)?)
    }

    fn submit_with_retry(
        &self,
        task_id: &TaskId,
        context: &AlertContext,
        workspace: &str,
        deadline: Deadline,
    ) -> Result<JobId, JobSubmitError> {
        let mut attempt = 0;
        loop {
            match self.job_submitter.submit(task_id, context, workspace, deadline) {
                Ok(job_id) => return Ok(job_id),
                Err(JobSubmitError::Transient(reason)) if attempt < crate::config::JOB_SUBMIT_BACKOFF.len() => {
                    tracing::warn!(task_id = %task_id, attempt, reason, "transient job submission failure, retrying");
                    std::thread::sleep(crate::config::JOB_SUBMIT_BACKOFF[attempt]);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

fn summarize(executed: &[ExecutedTask]) -> AlertExecutionStatus {
    if executed.is_empty() {
        return AlertExecutionStatus::Success;
    }
    let started = executed.iter().filter(|task| task.execution_status == TaskExecutionStatus::Started).count();
    let timed_out = executed.iter().any(|task| task.execution_status == TaskExecutionStatus::Timeout);
    if timed_out {
        AlertExecutionStatus::Timeout
    } else if started == executed.len() {
        AlertExecutionStatus::Success
    } else if started == 0 {
        AlertExecutionStatus::Failed
    } else {
        AlertExecutionStatus::PartialFailure
    }
}
