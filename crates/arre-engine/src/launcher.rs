// crates/arre-engine/src/launcher.rs
// ============================================================================
// Module: Autonomous Launcher
// Description: Plans, creates, and runs an investigation task pair when no
//              deterministic or AI-selected dispatch applies, §4.7.
// Purpose: Turn an alert into a runbook task plus a child investigation task,
//          rolling back whatever it created if a later step fails.
// Dependencies: arre-core, tracing
// ============================================================================

//! ## Overview
//! [`AutonomousLauncher::launch`] either returns a fully wired
//! [`LaunchOutcome`] or rolls back every task it created and returns a
//! [`LaunchError`]. It never leaves an orphaned runbook or child task behind
//! on failure.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arre_core::AlertContext;
use arre_core::Deadline;
use arre_core::JobId;
use arre_core::JobSubmitError;
use arre_core::JobSubmitter;
use arre_core::LlmAdapter;
use arre_core::LlmError;
use arre_core::NormalizedAlert;
use arre_core::PlanPrompt;
use arre_core::TaskDraft;
use arre_core::TaskId;
use arre_core::TaskStore;
use thiserror::Error;

use crate::config::JOB_SUBMIT_BACKOFF;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure modes for [`AutonomousLauncher::launch`].
#[derive(Debug, Error)]
pub enum LaunchError {
    /// The LLM could not produce a runbook plan.
    #[error("runbook planning failed: {0}")]
    PlanningFailed(#[from] LlmError),
    /// Creating the runbook or child task failed; any task already created
    /// in this launch has been rolled back.
    #[error("failed to create investigation tasks: {0}")]
    TaskCreationFailed(String),
    /// Job submission failed after retries; the runbook and child tasks
    /// created for this launch have been rolled back.
    #[error("failed to submit investigation job: {0}")]
    SubmissionFailed(JobSubmitError),
}

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of a successful autonomous launch.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchOutcome {
    /// The generated parent runbook task.
    pub runbook_task_id: TaskId,
    /// The generated child investigation task.
    pub child_task_id: TaskId,
    /// The job submitted against the child task.
    pub job_id: JobId,
}

// ============================================================================
// SECTION: Launcher
// ============================================================================

/// Composes the [`TaskStore`], [`LlmAdapter`], and [`JobSubmitter`]
/// collaborators needed to run the §4.7 algorithm.
pub struct AutonomousLauncher {
    task_store: Arc<dyn TaskStore>,
    llm: Arc<dyn LlmAdapter>,
    job_submitter: Arc<dyn JobSubmitter>,
}

impl AutonomousLauncher {
    /// Builds a launcher from its collaborators.
    #[must_use]
    pub fn new(task_store: Arc<dyn TaskStore>, llm: Arc<dyn LlmAdapter>, job_submitter: Arc<dyn JobSubmitter>) -> Self {
        Self {
            task_store,
            llm,
            job_submitter,
        }
    }

    /// Plans and launches an investigation for `alert`, rolling back any
    /// task it created if a later step in the sequence fails.
    ///
    /// # Errors
    ///
    /// Returns [`LaunchError`] when planning, task creation, or job
    /// submission fails; every variant guarantees no task created by this
    /// call remains in the task store.
    pub fn launch(
        &self,
        alert: &NormalizedAlert,
        workspace: &str,
        routing_hint: Option<String>,
        deadline: Deadline,
    ) -> Result<LaunchOutcome, LaunchError> {
        let prompt = PlanPrompt {
            alert_summary: alert.selector_query_text(),
            alert_detail: alert
                .annotations
                .get("description")
                .cloned()
                .unwrap_or_default(),
        };
        let plan = self.llm.plan(&prompt, deadline)?;

        let runbook_task = self
            .task_store
            .create_task(TaskDraft {
                title: plan.title,
                description: plan.description,
                tags: vec!["autonomous".to_string()],
                script_type: plan.script_type,
                script: plan.script,
                is_tooltask: false,
            })
            .map_err(|err| LaunchError::TaskCreationFailed(err.to_string()))?;

        let child_task = match self.task_store.create_task(TaskDraft {
            title: plan.child_title,
            description: plan.child_description,
            tags: vec!["autonomous".to_string()],
            script_type: "shell".to_string(),
            script: String::new(),
            is_tooltask: false,
        }) {
            Ok(task) => task,
            Err(err) => {
                self.rollback(&[&runbook_task.id]);
                return Err(LaunchError::TaskCreationFailed(err.to_string()));
            }
        };

        let context = AlertContext {
            alert: alert.clone(),
            routing_hint,
        };

        match self.submit_with_retry(&child_task.id, &context, workspace, deadline) {
            Ok(job_id) => Ok(LaunchOutcome {
                runbook_task_id: runbook_task.id,
                child_task_id: child_task.id,
                job_id,
            }),
            Err(err) => {
                self.rollback(&[&runbook_task.id, &child_task.id]);
                Err(LaunchError::SubmissionFailed(err))
            }
        }
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
                Err(JobSubmitError::Transient(reason)) if attempt < JOB_SUBMIT_BACKOFF.len() => {
                    tracing::warn!(task_id = %task_id, attempt, reason, "transient job submission failure, retrying");
                    std::thread::sleep(JOB_SUBMIT_BACKOFF[attempt]);
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn rollback(&self, task_ids: &[&TaskId]) {
        for task_id in task_ids {
            if let Err(err) = self.task_store.delete_task(task_id) {
                tracing::warn!(task_id = %task_id, error = %err, "failed to roll back autonomous task");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use arre_core::testing::InMemoryJobSubmitter;
    use arre_core::testing::InMemoryTaskStore;
    use arre_core::testing::StubLlmAdapter;
    use arre_core::AlertSource;
    use arre_core::AlertStatus;
    use arre_core::Fingerprint;
    use arre_core::Severity;
    use arre_core::TaskId;
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn alert() -> NormalizedAlert {
        NormalizedAlert {
            source: AlertSource::new("Grafana"),
            alert_name: "DiskFull".to_string(),
            status: AlertStatus::Firing,
            severity: Severity::Critical,
            fingerprint: Fingerprint::new("fp"),
            labels: BTreeMap::new(),
            annotations: BTreeMap::new(),
            starts_at: Utc::now(),
            ends_at: None,
            raw_payload: json!({}),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn launch_creates_a_runbook_and_child_task_and_submits_a_job() {
        let task_store = Arc::new(InMemoryTaskStore::new());
        let llm = Arc::new(StubLlmAdapter::selecting(TaskId::new("unused"), 1.0, "n/a"));
        let job_submitter = Arc::new(InMemoryJobSubmitter::new());
        let launcher = AutonomousLauncher::new(task_store.clone(), llm, job_submitter.clone());

        let outcome = launcher
            .launch(&alert(), "prod", None, Deadline::after(Duration::from_secs(5)))
            .unwrap();

        assert!(task_store.get_task(&outcome.runbook_task_id).unwrap().is_some());
        assert!(task_store.get_task(&outcome.child_task_id).unwrap().is_some());
        assert_eq!(job_submitter.call_count(), 1);
    }

    #[test]
    fn launch_rolls_back_created_tasks_when_submission_fails() {
        use std::sync::atomic::AtomicUsize;
        use std::sync::atomic::Ordering;
        use arre_core::TaskStoreError;

        struct FailingSubmitter;
        impl JobSubmitter for FailingSubmitter {
            fn submit(
                &self,
                _task_id: &TaskId,
                _context: &AlertContext,
                _workspace: &str,
                _deadline: Deadline,
            ) -> Result<JobId, JobSubmitError> {
                Err(JobSubmitError::Permanent("runtime rejected job".to_string()))
            }
        }

        struct CountingTaskStore {
            inner: InMemoryTaskStore,
            deletes: AtomicUsize,
        }
        impl TaskStore for CountingTaskStore {
            fn get_task(&self, id: &TaskId) -> Result<Option<arre_core::Task>, TaskStoreError> {
                self.inner.get_task(id)
            }
            fn list_trigger_candidates(&self) -> Result<Vec<arre_core::Task>, TaskStoreError> {
                self.inner.list_trigger_candidates()
            }
            fn list_tooltasks(&self) -> Result<Vec<arre_core::Task>, TaskStoreError> {
                self.inner.list_tooltasks()
            }
            fn create_task(&self, draft: arre_core::TaskDraft) -> Result<arre_core::Task, TaskStoreError> {
                self.inner.create_task(draft)
            }
            fn delete_task(&self, id: &TaskId) -> Result<(), TaskStoreError> {
                self.deletes.fetch_add(1, Ordering::SeqCst);
                self.inner.delete_task(id)
            }
        }

        let task_store = Arc::new(CountingTaskStore {
            inner: InMemoryTaskStore::new(),
            deletes: AtomicUsize::new(0),
        });
        let llm = Arc::new(StubLlmAdapter::selecting(TaskId::new("unused"), 1.0, "n/a"));
        let job_submitter = Arc::new(FailingSubmitter);
        let launcher = AutonomousLauncher::new(task_store.clone(), llm, job_submitter);

        let err = launcher
            .launch(&alert(), "prod", None, Deadline::after(Duration::from_secs(5)))
            .unwrap_err();
        assert!(matches!(err, LaunchError::SubmissionFailed(_)));
        assert_eq!(task_store.deletes.load(Ordering::SeqCst), 2);
    }
}
