// crates/arre-core/src/interfaces.rs
// ============================================================================
// Module: ARRE Interfaces
// Description: Backend-agnostic traits for every external collaborator.
// Purpose: Define the contract surfaces the engine programs against, so that
//          production adapters (arre-providers, arre-store-sqlite) and test
//          fakes are interchangeable.
// Dependencies: crate::{alert, deadline, flags, identifiers, record, task}
// ============================================================================

//! ## Overview
//! Every external collaborator named in `spec.md` §1 ("treated as external
//! collaborators") and §6.2 ("Outbound") is represented here as a trait.
//! Implementations must be deterministic for identical inputs where the
//! spec requires determinism (the matcher, the dedup window) and must fail
//! closed on missing or invalid data.

// ============================================================================
// SECTION: Imports
// ============================================================================

use thiserror::Error;

use crate::alert::NormalizedAlert;
use crate::deadline::Deadline;
use crate::flags::FlagError;
use crate::flags::FlagSnapshot;
use crate::flags::FlagUpdate;
use crate::flags::Principal;
use crate::identifiers::JobId;
use crate::identifiers::TaskId;
use crate::record::AlertRecord;
use crate::record::AlertSearchFilters;
use crate::record::AlertStats;
use crate::task::Task;
use crate::task::TaskDraft;

// ============================================================================
// SECTION: Flag Store
// ============================================================================

/// Administrative mode flags, §4.1.
pub trait FlagStore: Send + Sync {
    /// Returns the current flag snapshot. Must be safe for concurrent
    /// readers and must not block on a writer for long.
    fn get_flags(&self) -> FlagSnapshot;

    /// Applies a partial update, validating `incident_response_mode` and
    /// the caller's admin capability.
    ///
    /// # Errors
    ///
    /// Returns [`FlagError::InvalidValue`] when the mode string does not
    /// parse, or [`FlagError::PermissionDenied`] when `principal` is not an
    /// admin.
    fn set_flags(&self, principal: &Principal, update: FlagUpdate) -> Result<FlagSnapshot, FlagError>;
}

// ============================================================================
// SECTION: Task Store
// ============================================================================

/// Errors returned by [`TaskStore`] operations.
#[derive(Debug, Error)]
pub enum TaskStoreError {
    /// The requested task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The task store is temporarily unavailable; safe to retry.
    #[error("task store unavailable: {0}")]
    Transient(String),
    /// The task store rejected the request for a non-retryable reason.
    #[error("task store error: {0}")]
    Permanent(String),
}

/// Read (and, for autonomous mode, write) access to the external task
/// store. ARRE only consumes the narrow surface described in `spec.md` §6.2.
pub trait TaskStore: Send + Sync {
    /// Fetches a single task by id.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError`] when the task cannot be read.
    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, TaskStoreError>;

    /// Lists every task carrying at least one trigger rule, for building
    /// the deterministic matcher index (`spec.md` §4.3).
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError`] when the listing cannot be read.
    fn list_trigger_candidates(&self) -> Result<Vec<Task>, TaskStoreError>;

    /// Lists every task eligible for AI-selected dispatch (`is_tooltask`).
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError`] when the listing cannot be read.
    fn list_tooltasks(&self) -> Result<Vec<Task>, TaskStoreError>;

    /// Creates a new task from a draft (autonomous mode only).
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError`] when creation fails.
    fn create_task(&self, draft: TaskDraft) -> Result<Task, TaskStoreError>;

    /// Deletes a task by id (used to roll back a partially-created
    /// autonomous runbook/child pair).
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError`] when deletion fails.
    fn delete_task(&self, id: &TaskId) -> Result<(), TaskStoreError>;
}

// ============================================================================
// SECTION: Vector Search
// ============================================================================

/// Errors returned by [`VectorSearch`].
#[derive(Debug, Error)]
pub enum VectorSearchError {
    /// The vector index is temporarily unavailable; treated as no
    /// candidate by the dispatcher (`spec.md` §4.5 S4).
    #[error("vector search unavailable: {0}")]
    Transient(String),
}

/// A single KNN result.
#[derive(Debug, Clone, PartialEq)]
pub struct VectorCandidate {
    /// Candidate tooltask.
    pub task_id: TaskId,
    /// Cosine similarity in `[-1, 1]`, typically `[0, 1]` for text
    /// embeddings.
    pub similarity: f64,
}

/// KNN similarity search over tooltasks, §4.6 step 2.
pub trait VectorSearch: Send + Sync {
    /// Returns up to `candidate_pool` tooltask candidates for `query_text`,
    /// ranked by descending cosine similarity (ties broken by ascending
    /// task id), restricted to candidates at or above `similarity_floor`.
    ///
    /// # Errors
    ///
    /// Returns [`VectorSearchError`] when the index cannot be queried.
    fn search_tooltasks(
        &self,
        query_text: &str,
        candidate_pool: usize,
        similarity_floor: f64,
        deadline: Deadline,
    ) -> Result<Vec<VectorCandidate>, VectorSearchError>;
}

// ============================================================================
// SECTION: LLM Adapter
// ============================================================================

/// Errors returned by [`LlmAdapter`].
#[derive(Debug, Error)]
pub enum LlmError {
    /// The call did not complete before its deadline.
    #[error("llm call timed out")]
    Timeout,
    /// The adapter returned a malformed or unusable response.
    #[error("llm adapter error: {0}")]
    Adapter(String),
}

/// Candidate metadata supplied to the LLM for arbitration.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CandidateTaskSummary {
    /// Candidate task id.
    pub task_id: TaskId,
    /// Candidate title.
    pub title: String,
    /// Candidate description.
    pub description: String,
    /// Candidate tags.
    pub tags: Vec<String>,
}

/// Prompt passed to [`LlmAdapter::select`].
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionPrompt {
    /// Alert summary text (see `NormalizedAlert::selector_query_text`).
    pub alert_summary: String,
    /// Candidates the vector search surfaced.
    pub candidates: Vec<CandidateTaskSummary>,
}

/// The LLM's arbitration decision.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionDecision {
    /// The chosen task, or `None` if the LLM declined every candidate.
    pub selected_task_id: Option<TaskId>,
    /// Confidence in `[0, 1]`; meaningless when `selected_task_id` is
    /// `None`.
    pub confidence: f64,
    /// Free-text justification, always present.
    pub reasoning: String,
}

/// Prompt passed to [`LlmAdapter::plan`].
#[derive(Debug, Clone, PartialEq)]
pub struct PlanPrompt {
    /// Alert summary text.
    pub alert_summary: String,
    /// Alert description/annotation detail.
    pub alert_detail: String,
}

/// A generated runbook plan for the autonomous launcher.
#[derive(Debug, Clone, PartialEq)]
pub struct RunbookPlan {
    /// Runbook task title.
    pub title: String,
    /// Runbook task description / plan body.
    pub description: String,
    /// Script type for the generated runbook task.
    pub script_type: String,
    /// Script body for the generated runbook task.
    pub script: String,
    /// Title for the paired child investigation task.
    pub child_title: String,
    /// Description for the paired child investigation task.
    pub child_description: String,
}

/// Narrow interface to the underlying LLM, §6.2.
pub trait LlmAdapter: Send + Sync {
    /// Arbitrates between vector-search candidates for AI-selected mode.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on timeout or adapter failure; the dispatcher
    /// treats both as "no candidate" (`spec.md` §4.5 failure handling).
    fn select(&self, prompt: &SelectionPrompt, deadline: Deadline) -> Result<SelectionDecision, LlmError>;

    /// Produces a runbook plan for autonomous mode.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError`] on timeout or adapter failure.
    fn plan(&self, prompt: &PlanPrompt, deadline: Deadline) -> Result<RunbookPlan, LlmError>;
}

// ============================================================================
// SECTION: Job Submission
// ============================================================================

/// Errors returned by [`JobSubmitter::submit`], §4.8.
#[derive(Debug, Error)]
pub enum JobSubmitError {
    /// The target task does not exist.
    #[error("task not found: {0}")]
    NotFound(TaskId),
    /// The caller lacks permission to submit against this task/workspace.
    #[error("permission denied submitting task {0}")]
    PermissionDenied(TaskId),
    /// A retryable failure (queue full, runtime briefly unavailable).
    #[error("transient job submission failure: {0}")]
    Transient(String),
    /// A non-retryable failure.
    #[error("permanent job submission failure: {0}")]
    Permanent(String),
}

/// Context handed to the job runtime alongside the task id.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertContext {
    /// The alert that triggered this dispatch.
    pub alert: NormalizedAlert,
    /// Opaque deployment-routing hint forwarded from the inbound request,
    /// preserved verbatim per `spec.md` §6.1.
    pub routing_hint: Option<String>,
}

/// Outbound adapter that starts a task execution, §4.8.
pub trait JobSubmitter: Send + Sync {
    /// Submits a job for `task_id` against `workspace`.
    ///
    /// # Errors
    ///
    /// Returns [`JobSubmitError`]; the dispatcher retries `Transient` up to
    /// twice with 200 ms / 600 ms backoff and treats the rest as terminal.
    fn submit(
        &self,
        task_id: &TaskId,
        context: &AlertContext,
        workspace: &str,
        deadline: Deadline,
    ) -> Result<JobId, JobSubmitError>;
}

// ============================================================================
// SECTION: Alert Store
// ============================================================================

/// Errors returned by [`AlertStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store could not complete the operation.
    #[error("alert store error: {0}")]
    Store(String),
}

/// Append-only persistence for [`AlertRecord`]s, §4.9.
pub trait AlertStore: Send + Sync {
    /// Persists a record, returning its store-assigned id.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the write fails.
    fn persist(&self, record: AlertRecord) -> Result<AlertRecord, StoreError>;

    /// Searches persisted records by the given filters.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn search(&self, filters: &AlertSearchFilters) -> Result<Vec<AlertRecord>, StoreError>;

    /// Aggregates counts by selection mode.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the read fails.
    fn stats(&self) -> Result<AlertStats, StoreError>;
}
