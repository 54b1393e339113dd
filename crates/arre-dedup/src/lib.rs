// crates/arre-dedup/src/lib.rs
// ============================================================================
// Module: ARRE Dedup Window
// Description: Per-(task, trigger, fingerprint) suppression of re-dispatch
//              inside a configured interval.
// Purpose: Guarantee at most one job submission per dedup interval for a
//          given task/fingerprint pair, regardless of concurrent arrival.
// Dependencies: arre-core
// ============================================================================

//! ## Overview
//! The dedup window is local to the process, not an external collaborator
//! (`spec.md` §1 lists only the task store, vector store, LLM, and job
//! runtime as external). It is sharded by key hash so that
//! `check_and_mark` calls for unrelated keys never contend on the same
//! lock, while calls for the *same* key are fully serialized -- the
//! property `spec.md` §4.4 requires for its atomicity guarantee.
//!
//! # Invariants
//! - For a fixed `(task_id, trigger_key, fingerprint)`, at most one
//!   concurrent `check_and_mark` call observes [`DedupOutcome::Fired`]
//!   within any window of length `dedup_interval`.
//! - `dedup_interval == Duration::ZERO` disables suppression entirely.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::Hash;
use std::hash::Hasher;
use std::sync::Mutex;
use std::time::Duration;
use std::time::Instant;

use arre_core::Fingerprint;
use arre_core::TaskId;
use arre_core::TriggerKey;

/// Number of lock shards; chosen so that unrelated keys rarely collide
/// under typical alert volumes without paying for a full per-key lock.
const SHARD_COUNT: usize = 32;

// ============================================================================
// SECTION: Key & Outcome
// ============================================================================

/// Composite key identifying one dedup slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct DedupKey {
    task_id: TaskId,
    trigger_key: TriggerKey,
    fingerprint: Fingerprint,
}

/// Result of a [`DedupWindow::check_and_mark`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DedupOutcome {
    /// No prior entry existed within the interval; the caller should
    /// dispatch and the window now records `now`.
    Fired,
    /// A prior entry exists within the interval; the caller must not
    /// dispatch.
    Suppressed,
}

// ============================================================================
// SECTION: Dedup Window
// ============================================================================

/// Sharded, in-memory dedup window.
pub struct DedupWindow {
    shards: Vec<Mutex<HashMap<DedupKey, Instant>>>,
}

impl DedupWindow {
    /// Builds an empty dedup window with the default shard count.
    #[must_use]
    pub fn new() -> Self {
        let shards = (0..SHARD_COUNT).map(|_| Mutex::new(HashMap::new())).collect();
        Self { shards }
    }

    /// Atomically checks and, if the interval has elapsed (or no prior
    /// entry exists), marks `now` as the new last-fired time.
    ///
    /// `dedup_interval == Duration::ZERO` always returns
    /// [`DedupOutcome::Fired`] without consulting or mutating stored state.
    pub fn check_and_mark(
        &self,
        task_id: &TaskId,
        trigger_key: &TriggerKey,
        fingerprint: &Fingerprint,
        dedup_interval: Duration,
    ) -> DedupOutcome {
        if dedup_interval.is_zero() {
            return DedupOutcome::Fired;
        }

        let key = DedupKey {
            task_id: task_id.clone(),
            trigger_key: trigger_key.clone(),
            fingerprint: fingerprint.clone(),
        };
        let shard = self.shard_for(&key);
        let mut guard = shard.lock().unwrap_or_else(|poison| poison.into_inner());
        let now = Instant::now();

        match guard.get(&key) {
            Some(last_fired_at) if now.saturating_duration_since(*last_fired_at) < dedup_interval => {
                DedupOutcome::Suppressed
            }
            _ => {
                guard.insert(key, now);
                DedupOutcome::Fired
            }
        }
    }

    /// Removes entries last fired more than `max_active_dedup_interval * 2`
    /// ago, per `spec.md` §4.4's eviction policy. Safe to call
    /// periodically from a background sweep; does not affect correctness,
    /// only memory growth.
    pub fn evict_expired(&self, max_active_dedup_interval: Duration) {
        let ttl = max_active_dedup_interval.saturating_mul(2);
        let now = Instant::now();
        for shard in &self.shards {
            let mut guard = shard.lock().unwrap_or_else(|poison| poison.into_inner());
            guard.retain(|_, last_fired_at| now.saturating_duration_since(*last_fired_at) < ttl);
        }
    }

    fn shard_for(&self, key: &DedupKey) -> &Mutex<HashMap<DedupKey, Instant>> {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        let index = (hasher.finish() as usize) % self.shards.len();
        &self.shards[index]
    }
}

impl Default for DedupWindow {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arre_core::AlertSource;
    use std::sync::Arc;
    use std::thread;

    fn key() -> (TaskId, TriggerKey, Fingerprint) {
        (
            TaskId::new("t1"),
            TriggerKey::new(AlertSource::new("Grafana"), "HighCPUUsage"),
            Fingerprint::new("fp-1"),
        )
    }

    #[test]
    fn first_call_fires() {
        let window = DedupWindow::new();
        let (task_id, trigger_key, fingerprint) = key();
        let outcome = window.check_and_mark(&task_id, &trigger_key, &fingerprint, Duration::from_secs(300));
        assert_eq!(outcome, DedupOutcome::Fired);
    }

    #[test]
    fn second_call_within_interval_is_suppressed() {
        let window = DedupWindow::new();
        let (task_id, trigger_key, fingerprint) = key();
        let interval = Duration::from_secs(300);
        assert_eq!(
            window.check_and_mark(&task_id, &trigger_key, &fingerprint, interval),
            DedupOutcome::Fired
        );
        assert_eq!(
            window.check_and_mark(&task_id, &trigger_key, &fingerprint, interval),
            DedupOutcome::Suppressed
        );
    }

    #[test]
    fn call_after_interval_elapses_fires_again() {
        let window = DedupWindow::new();
        let (task_id, trigger_key, fingerprint) = key();
        let interval = Duration::from_millis(5);
        assert_eq!(
            window.check_and_mark(&task_id, &trigger_key, &fingerprint, interval),
            DedupOutcome::Fired
        );
        thread::sleep(Duration::from_millis(20));
        assert_eq!(
            window.check_and_mark(&task_id, &trigger_key, &fingerprint, interval),
            DedupOutcome::Fired
        );
    }

    #[test]
    fn zero_interval_disables_dedup() {
        let window = DedupWindow::new();
        let (task_id, trigger_key, fingerprint) = key();
        for _ in 0..5 {
            assert_eq!(
                window.check_and_mark(&task_id, &trigger_key, &fingerprint, Duration::ZERO),
                DedupOutcome::Fired
            );
        }
    }

    #[test]
    fn independent_fingerprints_do_not_suppress_each_other() {
        let window = DedupWindow::new();
        let (task_id, trigger_key, _) = key();
        let interval = Duration::from_secs(300);
        assert_eq!(
            window.check_and_mark(&task_id, &trigger_key, &Fingerprint::new("a"), interval),
            DedupOutcome::Fired
        );
        assert_eq!(
            window.check_and_mark(&task_id, &trigger_key, &Fingerprint::new("b"), interval),
            DedupOutcome::Fired
        );
    }

    #[test]
    fn concurrent_callers_for_the_same_key_yield_exactly_one_fired() {
        let window = Arc::new(DedupWindow::new());
        let interval = Duration::from_secs(300);
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let window = Arc::clone(&window);
                thread::spawn(move || {
                    let (task_id, trigger_key, fingerprint) = key();
                    window.check_and_mark(&task_id, &trigger_key, &fingerprint, interval)
                })
            })
            .collect();

        let fired_count = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|outcome| *outcome == DedupOutcome::Fired)
            .count();
        assert_eq!(fired_count, 1);
    }

    #[test]
    fn eviction_removes_only_sufficiently_old_entries() {
        let window = DedupWindow::new();
        let (task_id, trigger_key, fingerprint) = key();
        window.check_and_mark(&task_id, &trigger_key, &fingerprint, Duration::from_secs(300));
        window.evict_expired(Duration::from_secs(300));
        // Freshly-marked entry is well within max*2; it survives eviction
        // and so still suppresses an immediate repeat.
        let outcome = window.check_and_mark(&task_id, &trigger_key, &fingerprint, Duration::from_secs(300));
        assert_eq!(outcome, DedupOutcome::Suppressed);
    }
}
