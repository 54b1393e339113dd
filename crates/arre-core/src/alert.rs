// crates/arre-core/src/alert.rs
// ============================================================================
// Module: ARRE Normalized Alert
// Description: Canonical alert representation derived from any source format.
// Purpose: Give every downstream component (matcher, dedup, store) a single
//          typed shape to operate on, regardless of webhook origin.
// Dependencies: serde, serde_json, chrono
// ============================================================================

//! ## Overview
//! A [`NormalizedAlert`] is the only alert shape that crosses component
//! boundaries inside ARRE. The raw webhook body is preserved verbatim in
//! `raw_payload` for audit, but nothing downstream of the normalizer reads
//! untyped JSON again.
//!
//! # Invariants
//! - `source` is always [`TitleCase`](crate::titlecase)-normalized before a
//!   `NormalizedAlert` is constructed; this module does not re-derive it.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use chrono::DateTime;
use chrono::Utc;
use serde::Deserialize;
use serde::Serialize;

use crate::identifiers::Fingerprint;

// ============================================================================
// SECTION: Source
// ============================================================================

/// Canonical, `TitleCase`d source of an alert (e.g. `Grafana`, `Pagerduty`).
///
/// # Invariants
/// - Always produced by format-driven derivation, never from a caller field.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AlertSource(String);

impl AlertSource {
    /// Wraps an already-canonicalized source string.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the source as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AlertSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

// ============================================================================
// SECTION: Status & Severity
// ============================================================================

/// Alert lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    /// The condition is currently active.
    Firing,
    /// The condition has cleared.
    Resolved,
}

/// Alert severity, normalized from source-specific vocabularies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Highest urgency.
    Critical,
    /// Degraded but not critical.
    Warning,
    /// Informational only.
    Info,
    /// Source did not provide a mappable severity.
    Unknown,
}

// ============================================================================
// SECTION: Normalized Alert
// ============================================================================

/// Canonical representation of an alert, derived from any supported source
/// format by the normalizer.
///
/// # Invariants
/// - `source` is `TitleCase`d.
/// - `labels` keys are unique (guaranteed by the `BTreeMap` representation).
/// - `raw_payload` is preserved unmodified from the inbound webhook body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedAlert {
    /// Canonicalized source system, e.g. `Grafana`.
    pub source: AlertSource,
    /// Alert name as reported by the source (case-sensitive downstream).
    pub alert_name: String,
    /// Current lifecycle status.
    pub status: AlertStatus,
    /// Normalized severity.
    pub severity: Severity,
    /// Stable identifier used for deduplication.
    pub fingerprint: Fingerprint,
    /// Source labels, flattened to string values.
    pub labels: BTreeMap<String, String>,
    /// Source annotations, flattened to string values.
    pub annotations: BTreeMap<String, String>,
    /// When the alert condition started.
    pub starts_at: DateTime<Utc>,
    /// When the alert condition ended, if it has.
    pub ends_at: Option<DateTime<Utc>>,
    /// Opaque copy of the original webhook payload, for audit.
    pub raw_payload: serde_json::Value,
    /// Server-side receipt timestamp.
    pub received_at: DateTime<Utc>,
}

impl NormalizedAlert {
    /// Builds the text query used by the AI selector: alert name plus the
    /// `summary` and `description` annotations, space-joined.
    #[must_use]
    pub fn selector_query_text(&self) -> String {
        let summary = self.annotations.get("summary").map(String::as_str).unwrap_or("");
        let description = self.annotations.get("description").map(String::as_str).unwrap_or("");
        [self.alert_name.as_str(), summary, description]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}
