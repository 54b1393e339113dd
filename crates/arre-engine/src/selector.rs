// crates/arre-engine/src/selector.rs
// ============================================================================
// Module: AI Selector
// Description: Vector-search + LLM-arbitration pipeline choosing at most one
//              tooltask, §4.6.
// Purpose: Let the dispatcher's S4 state ask "which tooltask, if any, fits
//          this alert?" without knowing how the answer was produced.
// Dependencies: arre-core, tracing
// ============================================================================

//! ## Overview
//! [`AiSelector`] never dispatches anything itself; it returns an
//! [`AiSelectionOutcome`] and leaves dedup and job submission to the
//! dispatcher, matching the "selector returns a value, dispatcher acts on
//! it" design called out in `spec.md` §9.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arre_core::CandidateTaskSummary;
use arre_core::Deadline;
use arre_core::LlmAdapter;
use arre_core::NormalizedAlert;
use arre_core::SelectionPrompt;
use arre_core::TaskId;
use arre_core::TaskStore;
use arre_core::VectorSearch;

use crate::config::AiSelectorConfig;

// ============================================================================
// SECTION: Outcome
// ============================================================================

/// Result of running the AI selector over one alert.
#[derive(Debug, Clone, PartialEq)]
pub enum AiSelectionOutcome {
    /// No candidate cleared the similarity floor, or the LLM declined every
    /// candidate, or confidence fell below the acceptance threshold.
    NoCandidate {
        /// Candidate task ids the selector considered before declining.
        candidates_considered: Vec<TaskId>,
    },
    /// The LLM selected a candidate with sufficient confidence.
    Selected {
        /// The chosen task.
        task_id: TaskId,
        /// LLM-reported confidence in `[0, 1]`.
        confidence: f64,
        /// LLM-reported justification.
        reasoning: String,
        /// Candidate task ids the selector considered.
        candidates_considered: Vec<TaskId>,
    },
}

// ============================================================================
// SECTION: Selector
// ============================================================================

/// Composes a [`VectorSearch`], an [`LlmAdapter`], and the [`TaskStore`]
/// needed to build candidate summaries into the §4.6 algorithm.
pub struct AiSelector {
    vector_search: Arc<dyn VectorSearch>,
    llm: Arc<dyn LlmAdapter>,
    task_store: Arc<dyn TaskStore>,
    config: AiSelectorConfig,
}

impl AiSelector {
    /// Builds a selector from its collaborators and tunables.
    #[must_use]
    pub fn new(
        vector_search: Arc<dyn VectorSearch>,
        llm: Arc<dyn LlmAdapter>,
        task_store: Arc<dyn TaskStore>,
        config: AiSelectorConfig,
    ) -> Self {
        Self {
            vector_search,
            llm,
            task_store,
            config,
        }
    }

    /// Runs the §4.6 algorithm for `alert`.
    ///
    /// Vector-search and LLM failures are both treated as "no candidate"
    /// per `spec.md` §4.5's S4 failure handling; they never propagate as
    /// errors to the dispatcher.
    #[must_use]
    pub fn select(&self, alert: &NormalizedAlert, deadline: Deadline) -> AiSelectionOutcome {
        let query = alert.selector_query_text();

        let mut candidates = match self.vector_search.search_tooltasks(
            &query,
            self.config.candidate_pool,
            self.config.similarity_floor,
            deadline,
        ) {
            Ok(candidates) => candidates,
            Err(err) => {
                tracing::warn!(fingerprint = %alert.fingerprint, error = %err, "vector search failed, treating as no candidate");
                return AiSelectionOutcome::NoCandidate {
                    candidates_considered: Vec::new(),
                };
            }
        };

        // Defensive re-sort: the trait contract promises descending
        // similarity with ascending task-id tiebreak, but fakes under test
        // need not honor it.
        candidates.sort_by(|a, b| {
            b.similarity.partial_cmp(&a.similarity).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.task_id.cmp(&b.task_id))
        });
        candidates.truncate(self.config.top_k);

        if candidates.is_empty() {
            return AiSelectionOutcome::NoCandidate {
                candidates_considered: Vec::new(),
            };
        }

        let candidate_ids: Vec<TaskId> = candidates.iter().map(|candidate| candidate.task_id.clone()).collect();
        let summaries = self.build_summaries(&candidate_ids);

        if deadline.is_expired() {
            tracing::warn!(fingerprint = %alert.fingerprint, "deadline expired before llm arbitration");
            return AiSelectionOutcome::NoCandidate {
                candidates_considered: candidate_ids,
            };
        }

        let prompt = SelectionPrompt {
            alert_summary: query,
            candidates: summaries,
        };

        let llm_deadline = Deadline::after(self.config.llm_timeout.min(deadline.remaining()));
        let decision = match self.llm.select(&prompt, llm_deadline) {
            Ok(decision) => decision,
            Err(err) => {
                tracing::warn!(fingerprint = %alert.fingerprint, error = %err, "llm selection failed, treating as no candidate");
                return AiSelectionOutcome::NoCandidate {
                    candidates_considered: candidate_ids,
                };
            }
        };

        match decision.selected_task_id {
            Some(task_id) if decision.confidence >= self.config.min_confidence => AiSelectionOutcome::Selected {
                task_id,
                confidence: decision.confidence,
                reasoning: decision.reasoning,
                candidates_considered: candidate_ids,
            },
            _ => AiSelectionOutcome::NoCandidate {
                candidates_considered: candidate_ids,
            },
        }
    }

    fn build_summaries(&self, candidate_ids: &[TaskId]) -> Vec<CandidateTaskSummary> {
        candidate_ids
            .iter()
            .filter_map(|id| match self.task_store.get_task(id) {
                Ok(Some(task)) => Some(CandidateTaskSummary {
                    task_id: task.id,
                    title: task.title,
                    description: task.description,
                    tags: task.tags,
                }),
                Ok(None) => None,
                Err(err) => {
                    tracing::warn!(task_id = %id, error = %err, "failed to load candidate task metadata");
                    None
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use arre_core::testing::InMemoryTaskStore;
    use arre_core::testing::StubLlmAdapter;
    use arre_core::testing::StubVectorSearch;
    use arre_core::AlertSource;
    use arre_core::AlertStatus;
    use arre_core::Fingerprint;
    use arre_core::Severity;
    use arre_core::Task;
    use arre_core::TaskDraft;
    use arre_core::VectorCandidate;
    use chrono::Utc;
    use serde_json::json;

    use super::*;

    fn alert() -> NormalizedAlert {
        NormalizedAlert {
            source: AlertSource::new("Grafana"),
            alert_name: "CPUSpike".to_string(),
            status: AlertStatus::Firing,
            severity: Severity::Warning,
            fingerprint: Fingerprint::new("fp"),
            labels: BTreeMap::new(),
            annotations: BTreeMap::from([("description".to_string(), "Server CPU at 95%".to_string())]),
            starts_at: Utc::now(),
            ends_at: None,
            raw_payload: json!({}),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn selects_the_llm_chosen_candidate_above_confidence_floor() {
        let task_store = Arc::new(InMemoryTaskStore::new());
        let tool_task = task_store
            .create_task(TaskDraft {
                title: "CPU performance investigation".to_string(),
                description: "Investigates CPU spikes".to_string(),
                tags: vec![],
                script_type: "shell".to_string(),
                script: String::new(),
                is_tooltask: true,
            })
            .unwrap();
        let vector_search = Arc::new(StubVectorSearch::new(vec![VectorCandidate {
            task_id: tool_task.id.clone(),
            similarity: 0.85,
        }]));
        let llm = Arc::new(StubLlmAdapter::selecting(tool_task.id.clone(), 0.9, "matches CPU symptoms"));
        let selector = AiSelector::new(vector_search, llm, task_store, AiSelectorConfig::default());

        let outcome = selector.select(&alert(), Deadline::after(Duration::from_secs(5)));
        match outcome {
            AiSelectionOutcome::Selected {
                task_id,
                confidence,
                ..
            } => {
                assert_eq!(task_id, tool_task.id);
                assert!((confidence - 0.9).abs() < f64::EPSILON);
            }
            other => panic!("expected Selected, got {other:?}"),
        }
    }

    #[test]
    fn no_candidate_when_vector_search_is_empty() {
        let task_store = Arc::new(InMemoryTaskStore::new());
        let vector_search = Arc::new(StubVectorSearch::empty());
        let llm = Arc::new(StubLlmAdapter::declining());
        let selector = AiSelector::new(vector_search, llm, task_store, AiSelectorConfig::default());

        let outcome = selector.select(&alert(), Deadline::after(Duration::from_secs(5)));
        assert!(matches!(outcome, AiSelectionOutcome::NoCandidate { .. }));
    }

    #[test]
    fn no_candidate_when_llm_declines() {
        let task_store = Arc::new(InMemoryTaskStore::new());
        let tool_task = task_store
            .create_task(TaskDraft {
                title: "t".to_string(),
                description: "d".to_string(),
                tags: vec![],
                script_type: "shell".to_string(),
                script: String::new(),
                is_tooltask: true,
            })
            .unwrap();
        let vector_search = Arc::new(StubVectorSearch::new(vec![VectorCandidate {
            task_id: tool_task.id,
            similarity: 0.9,
        }]));
        let llm = Arc::new(StubLlmAdapter::declining());
        let selector = AiSelector::new(vector_search, llm, task_store, AiSelectorConfig::default());

        let outcome = selector.select(&alert(), Deadline::after(Duration::from_secs(5)));
        assert!(matches!(outcome, AiSelectionOutcome::NoCandidate { .. }));
    }

    #[test]
    fn no_candidate_when_confidence_below_floor() {
        let task_store = Arc::new(InMemoryTaskStore::new());
        let tool_task = task_store
            .create_task(TaskDraft {
                title: "t".to_string(),
                description: "d".to_string(),
                tags: vec![],
                script_type: "shell".to_string(),
                script: String::new(),
                is_tooltask: true,
            })
            .unwrap();
        let vector_search = Arc::new(StubVectorSearch::new(vec![VectorCandidate {
            task_id: tool_task.id.clone(),
            similarity: 0.9,
        }]));
        let llm = Arc::new(StubLlmAdapter::selecting(tool_task.id, 0.3, "weak match"));
        let selector = AiSelector::new(vector_search, llm, task_store, AiSelectorConfig::default());

        let outcome = selector.select(&alert(), Deadline::after(Duration::from_secs(5)));
        assert!(matches!(outcome, AiSelectionOutcome::NoCandidate { .. }));
    }
}
