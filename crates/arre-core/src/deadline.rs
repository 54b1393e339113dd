// crates/arre-core/src/deadline.rs
// ============================================================================
// Module: ARRE Deadlines
// Description: Request-scoped wall-clock deadlines passed explicitly to
//              every component capable of suspending on I/O.
// Purpose: Let subcomponents observe cancellation cooperatively (spec.md §5).
// Dependencies: std::time
// ============================================================================

//! ## Overview
//! ARRE does not use implicit thread-local or task-local cancellation.
//! Every call that may block on I/O (task store, vector search, LLM, job
//! submission, alert persistence) takes a [`Deadline`] explicitly and is
//! expected to bail out once it has expired.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;
use std::time::Instant;

// ============================================================================
// SECTION: Deadline
// ============================================================================

/// A point in time by which an operation must complete.
///
/// # Invariants
/// - Once constructed, the deadline's instant never changes; `remaining`
///   always reflects wall-clock progress toward it.
#[derive(Debug, Clone, Copy)]
pub struct Deadline {
    /// The instant at which this deadline expires.
    expires_at: Instant,
}

impl Deadline {
    /// Creates a deadline `timeout` from now.
    #[must_use]
    pub fn after(timeout: Duration) -> Self {
        Self {
            expires_at: Instant::now() + timeout,
        }
    }

    /// Creates a deadline that has already expired; useful for tests that
    /// exercise timeout handling.
    #[must_use]
    pub fn expired() -> Self {
        Self {
            expires_at: Instant::now(),
        }
    }

    /// Returns the time remaining until expiry, or `Duration::ZERO` if the
    /// deadline has already passed.
    #[must_use]
    pub fn remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    /// Returns true once `remaining()` would be zero.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}
