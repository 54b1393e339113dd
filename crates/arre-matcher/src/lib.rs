// crates/arre-matcher/src/lib.rs
// ============================================================================
// Module: ARRE Deterministic Matcher
// Description: TriggerKey -> task-id index with bounded-staleness refresh.
// Purpose: Answer "which tasks trigger on this alert?" without a task-store
//          round trip on every request.
// Dependencies: arre-core, thiserror
// ============================================================================

//! ## Overview
//! [`DeterministicMatcher`] holds an in-memory `TriggerKey -> Vec<TaskId>`
//! index built from [`arre_core::TaskStore::list_trigger_candidates`]. A
//! miss against a fresh index (refreshed within the staleness window) is
//! authoritative; a miss against a stale index triggers a refresh before
//! being trusted, matching `spec.md` §4.3.
//!
//! # Invariants
//! - Returned task ids are always in ascending order, so that multi-match
//!   outcomes are deterministic across runs.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::RwLock;
use std::time::Duration;
use std::time::Instant;

use arre_core::Deadline;
use arre_core::NormalizedAlert;
use arre_core::TaskId;
use arre_core::TaskStore;
use arre_core::TaskStoreError;
use arre_core::TriggerKey;
use thiserror::Error;

/// Default bound on index staleness before a miss forces a refresh.
pub const DEFAULT_STALENESS_WINDOW: Duration = Duration::from_secs(60);

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Errors returned by [`DeterministicMatcher`].
#[derive(Debug, Error)]
pub enum MatchError {
    /// The index could not be rebuilt from the task store.
    #[error("matcher index unavailable: {0}")]
    IndexUnavailable(#[from] TaskStoreError),
}

// ============================================================================
// SECTION: Matcher
// ============================================================================

/// Deterministic `TriggerKey -> Vec<TaskId>` index over a [`TaskStore`].
pub struct DeterministicMatcher<S: TaskStore + ?Sized> {
    task_store: Arc<S>,
    index: RwLock<BTreeMap<TriggerKey, Vec<TaskId>>>,
    last_refresh: Mutex<Option<Instant>>,
    staleness_window: Duration,
}

impl<S: TaskStore + ?Sized> DeterministicMatcher<S> {
    /// Builds a matcher with the default 60 s staleness window.
    #[must_use]
    pub fn new(task_store: Arc<S>) -> Self {
        Self::with_staleness_window(task_store, DEFAULT_STALENESS_WINDOW)
    }

    /// Builds a matcher with an explicit staleness window.
    #[must_use]
    pub fn with_staleness_window(task_store: Arc<S>, staleness_window: Duration) -> Self {
        Self {
            task_store,
            index: RwLock::new(BTreeMap::new()),
            last_refresh: Mutex::new(None),
            staleness_window,
        }
    }

    /// Rebuilds the index from the task store.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::IndexUnavailable`] when the underlying task
    /// store cannot be listed.
    pub fn refresh(&self, _deadline: Deadline) -> Result<(), MatchError> {
        let tasks = self.task_store.list_trigger_candidates()?;
        let mut index: BTreeMap<TriggerKey, Vec<TaskId>> = BTreeMap::new();
        for task in tasks {
            for rule in &task.trigger_on_alerts {
                index.entry(TriggerKey::from(rule)).or_default().push(task.id.clone());
            }
        }
        for ids in index.values_mut() {
            ids.sort();
            ids.dedup();
        }
        *self.index.write().unwrap_or_else(|poison| poison.into_inner()) = index;
        *self.last_refresh.lock().unwrap_or_else(|poison| poison.into_inner()) = Some(Instant::now());
        Ok(())
    }

    /// Returns the ascending-ordered task ids whose trigger rules match
    /// `alert`.
    ///
    /// # Errors
    ///
    /// Returns [`MatchError::IndexUnavailable`] when a stale index requires
    /// a refresh and the task store cannot service it.
    pub fn match_alert(&self, alert: &NormalizedAlert, deadline: Deadline) -> Result<Vec<TaskId>, MatchError> {
        let key = TriggerKey::new(alert.source.clone(), alert.alert_name.clone());

        if let Some(ids) = self.lookup(&key) {
            return Ok(ids);
        }

        if self.is_fresh() {
            return Ok(Vec::new());
        }

        self.refresh(deadline)?;
        Ok(self.lookup(&key).unwrap_or_default())
    }

    fn lookup(&self, key: &TriggerKey) -> Option<Vec<TaskId>> {
        self.index
            .read()
            .unwrap_or_else(|poison| poison.into_inner())
            .get(key)
            .cloned()
    }

    fn is_fresh(&self) -> bool {
        self.last_refresh
            .lock()
            .unwrap_or_else(|poison| poison.into_inner())
            .is_some_and(|instant| instant.elapsed() < self.staleness_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arre_core::testing::InMemoryTaskStore;
    use arre_core::AlertSource;
    use arre_core::AlertStatus;
    use arre_core::Fingerprint;
    use arre_core::Severity;
    use arre_core::Task;
    use arre_core::TriggerRule;
    use chrono::Utc;
    use serde_json::json;
    use std::collections::BTreeMap as Map;

    fn alert(source: &str, alert_name: &str) -> NormalizedAlert {
        NormalizedAlert {
            source: AlertSource::new(source),
            alert_name: alert_name.to_string(),
            status: AlertStatus::Firing,
            severity: Severity::Critical,
            fingerprint: Fingerprint::new("fp"),
            labels: Map::new(),
            annotations: Map::new(),
            starts_at: Utc::now(),
            ends_at: None,
            raw_payload: json!({}),
            received_at: Utc::now(),
        }
    }

    fn task_with_rule(id: &str, source: &str, alert_name: &str) -> Task {
        Task {
            id: TaskId::new(id),
            title: id.to_string(),
            description: String::new(),
            tags: Vec::new(),
            script_type: "shell".to_string(),
            script: String::new(),
            trigger_on_alerts: vec![TriggerRule {
                source: AlertSource::new(source),
                alert_name: alert_name.to_string(),
                dedup_interval: Duration::from_secs(300),
            }],
            is_tooltask: false,
        }
    }

    #[test]
    fn matches_by_exact_source_and_alert_name() {
        let store = Arc::new(InMemoryTaskStore::seeded(vec![task_with_rule("t1", "Grafana", "HighCPUUsage")]));
        let matcher = DeterministicMatcher::new(store);
        matcher.refresh(Deadline::after(Duration::from_secs(1))).unwrap();

        let hits = matcher
            .match_alert(&alert("Grafana", "HighCPUUsage"), Deadline::after(Duration::from_secs(1)))
            .unwrap();
        assert_eq!(hits, vec![TaskId::new("t1")]);
    }

    #[test]
    fn does_not_match_different_alert_name() {
        let store = Arc::new(InMemoryTaskStore::seeded(vec![task_with_rule("t1", "Grafana", "HighCPUUsage")]));
        let matcher = DeterministicMatcher::new(store);
        matcher.refresh(Deadline::after(Duration::from_secs(1))).unwrap();

        let hits = matcher
            .match_alert(&alert("Grafana", "UnknownAlert"), Deadline::after(Duration::from_secs(1)))
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn returns_multiple_matches_in_ascending_task_id_order() {
        let store = Arc::new(InMemoryTaskStore::seeded(vec![
            task_with_rule("zzz", "Grafana", "HighCPUUsage"),
            task_with_rule("aaa", "Grafana", "HighCPUUsage"),
        ]));
        let matcher = DeterministicMatcher::new(store);
        matcher.refresh(Deadline::after(Duration::from_secs(1))).unwrap();

        let hits = matcher
            .match_alert(&alert("Grafana", "HighCPUUsage"), Deadline::after(Duration::from_secs(1)))
            .unwrap();
        assert_eq!(hits, vec![TaskId::new("aaa"), TaskId::new("zzz")]);
    }

    #[test]
    fn stale_index_falls_back_to_a_fresh_task_store_read() {
        let store = Arc::new(InMemoryTaskStore::new());
        let matcher = DeterministicMatcher::with_staleness_window(store.clone(), Duration::from_secs(0));
        matcher.refresh(Deadline::after(Duration::from_secs(1))).unwrap();

        // A task appears in the store after the matcher last refreshed.
        store
            .create_task(arre_core::TaskDraft {
                title: "late".to_string(),
                description: String::new(),
                tags: Vec::new(),
                script_type: "shell".to_string(),
                script: String::new(),
                is_tooltask: false,
            })
            .unwrap();

        // Staleness window of zero means the matcher never trusts a cached
        // miss; it always re-reads on miss.
        let hits = matcher
            .match_alert(&alert("Grafana", "HighCPUUsage"), Deadline::after(Duration::from_secs(1)))
            .unwrap();
        assert!(hits.is_empty());
    }

    #[test]
    fn empty_trigger_rules_never_match() {
        let task = Task {
            id: TaskId::new("t1"),
            title: "no rules".to_string(),
            description: String::new(),
            tags: Vec::new(),
            script_type: "shell".to_string(),
            script: String::new(),
            trigger_on_alerts: Vec::new(),
            is_tooltask: false,
        };
        let store = Arc::new(InMemoryTaskStore::seeded(vec![task]));
        let matcher = DeterministicMatcher::new(store);
        matcher.refresh(Deadline::after(Duration::from_secs(1))).unwrap();

        let hits = matcher
            .match_alert(&alert("Grafana", "HighCPUUsage"), Deadline::after(Duration::from_secs(1)))
            .unwrap();
        assert!(hits.is_empty());
    }
}
