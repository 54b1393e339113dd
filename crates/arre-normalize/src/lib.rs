// crates/arre-normalize/src/lib.rs
// ============================================================================
// Module: ARRE Normalizer
// Description: Turns a raw webhook body into one or more NormalizedAlerts.
// Purpose: Give every downstream component a single canonical alert shape,
//          derived from payload structure rather than caller assertion.
// Dependencies: serde_json, chrono, arre-core, thiserror
// ============================================================================

//! ## Overview
//! `normalize` is the only entry point external callers need. Format
//! detection happens first (`crate::format::detect`), then the matching
//! parser derives a `TitleCase`d `source` and fills in whatever fields that
//! source format carries. A payload matching no recognized shape is
//! rejected with [`NormalizeError::Unparseable`]; the caller (the HTTP
//! layer) is responsible for turning that into the minimal audit record
//! `spec.md` §4.5 S0 describes.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod fingerprint;
pub mod format;
pub mod titlecase;

// ============================================================================
// SECTION: Imports
// ============================================================================

use arre_core::NormalizedAlert;
use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;
use thiserror::Error;

pub use format::detect;
pub use format::DetectedFormat;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure to recognize or parse an inbound webhook payload.
#[derive(Debug, Error)]
pub enum NormalizeError {
    /// The payload did not match any recognized format, or a recognized
    /// format was missing a field it requires.
    #[error("unparseable alert payload: {0}")]
    Unparseable(String),
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Detects the format of `raw_body` and normalizes it into one or more
/// [`NormalizedAlert`]s.
///
/// # Errors
///
/// Returns [`NormalizeError::Unparseable`] when `raw_body` is not valid
/// JSON, or does not match any recognized webhook shape.
pub fn normalize(raw_body: &[u8], received_at: DateTime<Utc>) -> Result<Vec<NormalizedAlert>, NormalizeError> {
    let payload: Value =
        serde_json::from_slice(raw_body).map_err(|err| NormalizeError::Unparseable(format!("invalid json: {err}")))?;

    match format::detect(&payload) {
        Some(DetectedFormat::Grafana) => format::parse_grafana(&payload, payload.clone(), received_at),
        Some(DetectedFormat::Pagerduty) => format::parse_pagerduty(&payload, payload.clone(), received_at),
        Some(DetectedFormat::Datadog) => format::parse_datadog(&payload, payload.clone(), received_at),
        Some(DetectedFormat::CloudWatch) => format::parse_cloudwatch(&payload, payload.clone(), received_at),
        None => Err(NormalizeError::Unparseable("no recognized webhook format matched".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_a_grafana_payload() {
        let body = json!({
            "alerts": [
                {"status": "firing", "labels": {"alertname": "HighCPUUsage"}, "annotations": {}}
            ]
        })
        .to_string();
        let alerts = normalize(body.as_bytes(), Utc::now()).unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].source.as_str(), "Grafana");
        assert_eq!(alerts[0].alert_name, "HighCPUUsage");
    }

    #[test]
    fn rejects_garbage_bytes() {
        let err = normalize(b"not json", Utc::now()).unwrap_err();
        assert!(matches!(err, NormalizeError::Unparseable(_)));
    }

    #[test]
    fn rejects_unrecognized_json_shapes() {
        let body = json!({"foo": "bar"}).to_string();
        let err = normalize(body.as_bytes(), Utc::now()).unwrap_err();
        assert!(matches!(err, NormalizeError::Unparseable(_)));
    }
}
