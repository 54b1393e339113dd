// crates/arre-core/src/testing.rs
// ============================================================================
// Module: ARRE In-Memory Fakes
// Description: Simple in-memory implementations of every collaborator trait.
// Purpose: Let the engine, server, and CLI crates exercise real control flow
//          in tests without real I/O, mirroring
//          decision-gate-core::runtime::InMemoryRunStateStore.
// Dependencies: std::sync, crate::*
// ============================================================================

//! ## Overview
//! These fakes are not test-gated: like the donor's `InMemoryRunStateStore`,
//! they are a real, documented part of the public API, useful for local
//! demos and for every other crate's test suite.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;

use crate::alert::NormalizedAlert;
use crate::deadline::Deadline;
use crate::flags::FlagError;
use crate::flags::FlagSnapshot;
use crate::flags::FlagUpdate;
use crate::flags::IncidentResponseMode;
use crate::flags::Principal;
use crate::identifiers::AlertId;
use crate::identifiers::JobId;
use crate::identifiers::TaskId;
use crate::interfaces::AlertContext;
use crate::interfaces::AlertStore;
use crate::interfaces::CandidateTaskSummary;
use crate::interfaces::FlagStore;
use crate::interfaces::JobSubmitError;
use crate::interfaces::JobSubmitter;
use crate::interfaces::LlmAdapter;
use crate::interfaces::LlmError;
use crate::interfaces::PlanPrompt;
use crate::interfaces::RunbookPlan;
use crate::interfaces::SelectionDecision;
use crate::interfaces::SelectionPrompt;
use crate::interfaces::StoreError;
use crate::interfaces::TaskStore;
use crate::interfaces::TaskStoreError;
use crate::interfaces::VectorCandidate;
use crate::interfaces::VectorSearch;
use crate::interfaces::VectorSearchError;
use crate::record::AlertRecord;
use crate::record::AlertSearchFilters;
use crate::record::AlertStats;
use crate::record::SelectionMode;
use crate::task::Task;
use crate::task::TaskDraft;

// ============================================================================
// SECTION: Flag Store
// ============================================================================

/// In-memory [`FlagStore`] guarded by a mutex.
#[derive(Debug)]
pub struct InMemoryFlagStore {
    /// Current snapshot.
    snapshot: Mutex<FlagSnapshot>,
}

impl InMemoryFlagStore {
    /// Creates a store with the default snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self {
            snapshot: Mutex::new(FlagSnapshot::default()),
        }
    }

    /// Creates a store pre-seeded with the given mode.
    #[must_use]
    pub fn with_mode(mode: IncidentResponseMode) -> Self {
        Self {
            snapshot: Mutex::new(FlagSnapshot {
                incident_response_mode: mode,
            }),
        }
    }
}

impl Default for InMemoryFlagStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlagStore for InMemoryFlagStore {
    fn get_flags(&self) -> FlagSnapshot {
        *self.snapshot.lock().unwrap_or_else(|poison| poison.into_inner())
    }

    fn set_flags(&self, principal: &Principal, update: FlagUpdate) -> Result<FlagSnapshot, FlagError> {
        if !principal.is_admin {
            return Err(FlagError::PermissionDenied);
        }
        let mut guard = self.snapshot.lock().unwrap_or_else(|poison| poison.into_inner());
        if let Some(raw) = update.incident_response_mode {
            let mode: IncidentResponseMode =
                raw.parse().map_err(|_| FlagError::InvalidValue(raw.clone()))?;
            guard.incident_response_mode = mode;
        }
        Ok(*guard)
    }
}

// ============================================================================
// SECTION: Task Store
// ============================================================================

/// In-memory [`TaskStore`] seeded with a fixed task set.
#[derive(Debug, Default)]
pub struct InMemoryTaskStore {
    /// Tasks keyed by id.
    tasks: Mutex<BTreeMap<TaskId, Task>>,
    /// Counter used to mint ids for autonomously created tasks.
    next_id: AtomicU64,
}

impl InMemoryTaskStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-seeded with `tasks`.
    #[must_use]
    pub fn seeded(tasks: Vec<Task>) -> Self {
        let map = tasks.into_iter().map(|task| (task.id.clone(), task)).collect();
        Self {
            tasks: Mutex::new(map),
            next_id: AtomicU64::new(1),
        }
    }
}

impl TaskStore for InMemoryTaskStore {
    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, TaskStoreError> {
        Ok(self.tasks.lock().unwrap_or_else(|p| p.into_inner()).get(id).cloned())
    }

    fn list_trigger_candidates(&self) -> Result<Vec<Task>, TaskStoreError> {
        Ok(self
            .tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .filter(|task| !task.trigger_on_alerts.is_empty())
            .cloned()
            .collect())
    }

    fn list_tooltasks(&self) -> Result<Vec<Task>, TaskStoreError> {
        Ok(self
            .tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .values()
            .filter(|task| task.is_tooltask)
            .cloned()
            .collect())
    }

    fn create_task(&self, draft: TaskDraft) -> Result<Task, TaskStoreError> {
        let id = TaskId::new(format!("auto-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        let task = Task {
            id: id.clone(),
            title: draft.title,
            description: draft.description,
            tags: draft.tags,
            script_type: draft.script_type,
            script: draft.script,
            trigger_on_alerts: Vec::new(),
            is_tooltask: draft.is_tooltask,
        };
        self.tasks
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id, task.clone());
        Ok(task)
    }

    fn delete_task(&self, id: &TaskId) -> Result<(), TaskStoreError> {
        self.tasks.lock().unwrap_or_else(|p| p.into_inner()).remove(id);
        Ok(())
    }
}

// ============================================================================
// SECTION: Alert Store
// ============================================================================

/// In-memory [`AlertStore`] that retains every persisted record.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    /// Persisted records in insertion order.
    records: Mutex<Vec<AlertRecord>>,
    /// Counter used to mint record ids.
    next_id: AtomicU64,
}

impl InMemoryAlertStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AlertStore for InMemoryAlertStore {
    fn persist(&self, mut record: AlertRecord) -> Result<AlertRecord, StoreError> {
        let id = AlertId::new(format!("alert-{}", self.next_id.fetch_add(1, Ordering::SeqCst)));
        record.id = id;
        self.records.lock().unwrap_or_else(|p| p.into_inner()).push(record.clone());
        Ok(record)
    }

    fn search(&self, filters: &AlertSearchFilters) -> Result<Vec<AlertRecord>, StoreError> {
        let guard = self.records.lock().unwrap_or_else(|p| p.into_inner());
        let mut matches: Vec<AlertRecord> = guard
            .iter()
            .filter(|record| {
                filters
                    .source
                    .as_deref()
                    .is_none_or(|source| record.alert.source.as_str() == source)
                    && filters
                        .alert_name
                        .as_deref()
                        .is_none_or(|name| record.alert.alert_name == name)
                    && filters
                        .selection_mode
                        .is_none_or(|mode| record.selection_mode == mode)
                    && filters.severity.is_none_or(|sev| record.alert.severity == sev)
                    && filters.status.is_none_or(|status| record.alert.status == status)
                    && filters.text.as_deref().is_none_or(|text| {
                        record.alert.annotations.values().any(|value| value.contains(text))
                    })
            })
            .cloned()
            .collect();
        if let Some(limit) = filters.limit {
            matches.truncate(limit);
        }
        Ok(matches)
    }

    fn stats(&self) -> Result<AlertStats, StoreError> {
        let guard = self.records.lock().unwrap_or_else(|p| p.into_inner());
        let mut stats = AlertStats::default();
        for record in guard.iter() {
            stats.total += 1;
            match record.selection_mode {
                SelectionMode::Deterministic => stats.deterministic += 1,
                SelectionMode::AiSelected => stats.ai_selected += 1,
                SelectionMode::Autonomous => stats.autonomous += 1,
                SelectionMode::None => stats.none += 1,
            }
        }
        Ok(stats)
    }
}

// ============================================================================
// SECTION: Job Submitter
// ============================================================================

/// In-memory [`JobSubmitter`] recording every call, useful for asserting
/// at-most-once dispatch under dedup (`spec.md` §8 Scenario F).
#[derive(Debug, Default)]
pub struct InMemoryJobSubmitter {
    /// Task ids submitted, in call order.
    submitted: Mutex<Vec<TaskId>>,
    /// Counter used to mint job ids.
    next_id: AtomicU64,
}

impl InMemoryJobSubmitter {
    /// Creates a submitter with no recorded calls.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of times `submit` was called.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.submitted.lock().unwrap_or_else(|p| p.into_inner()).len()
    }
}

impl JobSubmitter for InMemoryJobSubmitter {
    fn submit(
        &self,
        task_id: &TaskId,
        _context: &AlertContext,
        _workspace: &str,
        _deadline: Deadline,
    ) -> Result<JobId, JobSubmitError> {
        self.submitted.lock().unwrap_or_else(|p| p.into_inner()).push(task_id.clone());
        Ok(JobId::new(format!("job-{}", self.next_id.fetch_add(1, Ordering::SeqCst))))
    }
}

// ============================================================================
// SECTION: Vector Search & LLM Stubs
// ============================================================================

/// [`VectorSearch`] stub returning a fixed candidate list regardless of
/// query text.
#[derive(Debug, Default)]
pub struct StubVectorSearch {
    /// Candidates to return, pre-sorted by the caller.
    candidates: Vec<VectorCandidate>,
}

impl StubVectorSearch {
    /// Creates a stub returning `candidates` verbatim.
    #[must_use]
    pub fn new(candidates: Vec<VectorCandidate>) -> Self {
        Self { candidates }
    }

    /// Creates a stub that always returns no candidates.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

impl VectorSearch for StubVectorSearch {
    fn search_tooltasks(
        &self,
        _query_text: &str,
        candidate_pool: usize,
        similarity_floor: f64,
        _deadline: Deadline,
    ) -> Result<Vec<VectorCandidate>, VectorSearchError> {
        Ok(self
            .candidates
            .iter()
            .filter(|candidate| candidate.similarity >= similarity_floor)
            .take(candidate_pool)
            .cloned()
            .collect())
    }
}

/// [`LlmAdapter`] stub returning pre-programmed decisions/plans.
#[derive(Debug, Clone)]
pub struct StubLlmAdapter {
    /// Decision returned by every `select` call.
    decision: SelectionDecision,
    /// Plan returned by every `plan` call.
    plan: RunbookPlan,
}

impl StubLlmAdapter {
    /// Creates a stub with explicit decision and plan values.
    #[must_use]
    pub fn new(decision: SelectionDecision, plan: RunbookPlan) -> Self {
        Self { decision, plan }
    }

    /// Creates a stub that declines every candidate.
    #[must_use]
    pub fn declining() -> Self {
        Self {
            decision: SelectionDecision {
                selected_task_id: None,
                confidence: 0.0,
                reasoning: "no suitable candidate".to_string(),
            },
            plan: RunbookPlan {
                title: String::new(),
                description: String::new(),
                script_type: String::new(),
                script: String::new(),
                child_title: String::new(),
                child_description: String::new(),
            },
        }
    }

    /// Creates a stub that selects the first candidate passed to `select`
    /// with the given confidence and reasoning.
    #[must_use]
    pub fn selecting(task_id: TaskId, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            decision: SelectionDecision {
                selected_task_id: Some(task_id),
                confidence,
                reasoning: reasoning.into(),
            },
            plan: RunbookPlan {
                title: "Automated investigation".to_string(),
                description: "Investigate the reported condition.".to_string(),
                script_type: "shell".to_string(),
                script: "#!/bin/sh\necho investigating\n".to_string(),
                child_title: "Investigation detail".to_string(),
                child_description: "Child investigation task.".to_string(),
            },
        }
    }
}

impl LlmAdapter for StubLlmAdapter {
    fn select(&self, _prompt: &SelectionPrompt, _deadline: Deadline) -> Result<SelectionDecision, LlmError> {
        Ok(self.decision.clone())
    }

    fn plan(&self, _prompt: &PlanPrompt, _deadline: Deadline) -> Result<RunbookPlan, LlmError> {
        Ok(self.plan.clone())
    }
}

// Silence an unused-import warning when `CandidateTaskSummary` is only
// referenced through doc links in this module.
#[allow(unused_imports)]
use CandidateTaskSummary as _CandidateTaskSummaryDocLink;
#[allow(unused_imports)]
use NormalizedAlert as _NormalizedAlertDocLink;
