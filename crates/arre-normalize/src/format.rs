// crates/arre-normalize/src/format.rs
// ============================================================================
// Module: Webhook Format Detection & Parsing
// Description: Per-source payload shape detection and field extraction.
// Purpose: Derive `source` from payload structure, never from a
//          caller-supplied field (spec.md §4.2).
// Dependencies: serde_json, chrono, arre-core, crate::fingerprint
// ============================================================================

//! ## Overview
//! Each recognized format gets its own parse function returning one or more
//! [`NormalizedAlert`]s (Grafana/Alertmanager batches deliver an `alerts[]`
//! array, so one webhook call can describe several distinct alert
//! instances). Detection inspects payload shape only; a payload's own
//! `source` field, if present, is ignored for the purpose of deriving
//! `NormalizedAlert::source`.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use arre_core::AlertSource;
use arre_core::AlertStatus;
use arre_core::Fingerprint;
use arre_core::NormalizedAlert;
use arre_core::Severity;
use chrono::DateTime;
use chrono::Utc;
use serde_json::Value;

use crate::fingerprint;
use crate::NormalizeError;

// ============================================================================
// SECTION: Format Detection
// ============================================================================

/// A recognized webhook payload shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectedFormat {
    /// Grafana / Prometheus Alertmanager `alerts[]` envelope.
    Grafana,
    /// PagerDuty `incident.*` event shape.
    Pagerduty,
    /// Datadog monitor event envelope.
    Datadog,
    /// CloudWatch alarm wrapped in an SNS notification envelope.
    CloudWatch,
}

impl DetectedFormat {
    /// The canonical, `TitleCase`d source name this format always produces.
    #[must_use]
    pub fn source_name(self) -> &'static str {
        match self {
            Self::Grafana => "Grafana",
            Self::Pagerduty => "Pagerduty",
            Self::Datadog => "Datadog",
            Self::CloudWatch => "CloudWatch",
        }
    }
}

/// Inspects `payload` structure and returns the matching format, or `None`
/// if no recognized shape applies.
#[must_use]
pub fn detect(payload: &Value) -> Option<DetectedFormat> {
    let object = payload.as_object()?;

    if let Some(alerts) = object.get("alerts").and_then(Value::as_array) {
        if alerts
            .first()
            .and_then(|alert| alert.get("labels"))
            .and_then(|labels| labels.get("alertname"))
            .is_some()
        {
            return Some(DetectedFormat::Grafana);
        }
    }

    if object
        .get("event_type")
        .and_then(Value::as_str)
        .is_some_and(|event_type| event_type.starts_with("incident."))
        && object.get("incident").is_some_and(Value::is_object)
    {
        return Some(DetectedFormat::Pagerduty);
    }

    if object.contains_key("alert_type") && object.contains_key("alert_transition_state") {
        return Some(DetectedFormat::Datadog);
    }

    if object.get("Type").and_then(Value::as_str) == Some("Notification") && object.contains_key("Message") {
        return Some(DetectedFormat::CloudWatch);
    }

    None
}

// ============================================================================
// SECTION: Shared Helpers
// ============================================================================

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|object| {
            object
                .iter()
                .filter_map(|(key, value)| value.as_str().map(|text| (key.clone(), text.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

fn parse_timestamp(value: Option<&Value>, fallback: DateTime<Utc>) -> DateTime<Utc> {
    value
        .and_then(Value::as_str)
        .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or(fallback)
}

// ============================================================================
// SECTION: Grafana / Alertmanager
// ============================================================================

/// Parses a Grafana/Alertmanager `alerts[]` envelope into one
/// [`NormalizedAlert`] per entry, per the `spec.md` supplement covering
/// multi-alert batches.
///
/// # Errors
///
/// Returns [`NormalizeError::Unparseable`] if the envelope has no usable
/// `alerts[]` entries.
pub fn parse_grafana(
    payload: &Value,
    raw_payload: Value,
    received_at: DateTime<Utc>,
) -> Result<Vec<NormalizedAlert>, NormalizeError> {
    let alerts = payload
        .get("alerts")
        .and_then(Value::as_array)
        .ok_or_else(|| NormalizeError::Unparseable("grafana payload missing alerts[]".to_string()))?;

    if alerts.is_empty() {
        return Err(NormalizeError::Unparseable("grafana alerts[] is empty".to_string()));
    }

    let source = AlertSource::new(DetectedFormat::Grafana.source_name());

    alerts
        .iter()
        .map(|alert| {
            let labels = string_map(alert.get("labels"));
            let annotations = string_map(alert.get("annotations"));
            let alert_name = labels
                .get("alertname")
                .cloned()
                .ok_or_else(|| NormalizeError::Unparseable("grafana alert missing labels.alertname".to_string()))?;
            let status = match alert.get("status").and_then(Value::as_str) {
                Some("resolved") => AlertStatus::Resolved,
                _ => AlertStatus::Firing,
            };
            let severity = labels
                .get("severity")
                .map(|value| parse_severity(value))
                .unwrap_or(Severity::Unknown);
            let starts_at = parse_timestamp(alert.get("startsAt"), received_at);
            let ends_at = alert
                .get("endsAt")
                .and_then(Value::as_str)
                .filter(|text| !is_zero_time(text))
                .and_then(|text| DateTime::parse_from_rfc3339(text).ok())
                .map(|dt| dt.with_timezone(&Utc));
            let fingerprint = alert
                .get("fingerprint")
                .and_then(Value::as_str)
                .map(Fingerprint::new)
                .unwrap_or_else(|| fingerprint::derive(source.as_str(), &alert_name, &labels));

            Ok(NormalizedAlert {
                source: source.clone(),
                alert_name,
                status,
                severity,
                fingerprint,
                labels,
                annotations,
                starts_at,
                ends_at,
                raw_payload: raw_payload.clone(),
                received_at,
            })
        })
        .collect()
}

fn is_zero_time(text: &str) -> bool {
    text.starts_with("0001-01-01")
}

fn parse_severity(value: &str) -> Severity {
    match value.to_ascii_lowercase().as_str() {
        "critical" | "page" => Severity::Critical,
        "warning" | "warn" => Severity::Warning,
        "info" | "information" => Severity::Info,
        _ => Severity::Unknown,
    }
}

// ============================================================================
// SECTION: PagerDuty
// ============================================================================

/// Parses a PagerDuty `incident.*` event.
///
/// # Errors
///
/// Returns [`NormalizeError::Unparseable`] if the `incident` object is
/// missing required fields.
pub fn parse_pagerduty(
    payload: &Value,
    raw_payload: Value,
    received_at: DateTime<Utc>,
) -> Result<Vec<NormalizedAlert>, NormalizeError> {
    let event_type = payload
        .get("event_type")
        .and_then(Value::as_str)
        .ok_or_else(|| NormalizeError::Unparseable("pagerduty payload missing event_type".to_string()))?;
    let incident = payload
        .get("incident")
        .ok_or_else(|| NormalizeError::Unparseable("pagerduty payload missing incident".to_string()))?;

    let alert_name = incident
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| NormalizeError::Unparseable("pagerduty incident missing title".to_string()))?
        .to_string();

    // incident.trigger and incident.acknowledge both describe a still-open
    // incident; only incident.resolve clears it.
    let status = if event_type == "incident.resolve" {
        AlertStatus::Resolved
    } else {
        AlertStatus::Firing
    };

    let severity = match incident.get("urgency").and_then(Value::as_str) {
        Some("high") => Severity::Critical,
        Some("low") => Severity::Warning,
        _ => Severity::Unknown,
    };

    let mut labels = BTreeMap::new();
    if let Some(id) = incident.get("id").and_then(Value::as_str) {
        labels.insert("incident_id".to_string(), id.to_string());
    }

    let mut annotations = BTreeMap::new();
    if let Some(url) = incident.get("html_url").and_then(Value::as_str) {
        annotations.insert("url".to_string(), url.to_string());
    }
    if let Some(description) = incident.get("description").and_then(Value::as_str) {
        annotations.insert("description".to_string(), description.to_string());
    }

    let source = AlertSource::new(DetectedFormat::Pagerduty.source_name());
    let fingerprint = incident
        .get("incident_key")
        .and_then(Value::as_str)
        .map(Fingerprint::new)
        .unwrap_or_else(|| fingerprint::derive(source.as_str(), &alert_name, &labels));

    Ok(vec![NormalizedAlert {
        source,
        alert_name,
        status,
        severity,
        fingerprint,
        labels,
        annotations,
        starts_at: parse_timestamp(incident.get("created_at"), received_at),
        ends_at: None,
        raw_payload,
        received_at,
    }])
}

// ============================================================================
// SECTION: Datadog
// ============================================================================

/// Parses a Datadog monitor event.
///
/// # Errors
///
/// Returns [`NormalizeError::Unparseable`] if required fields are missing.
pub fn parse_datadog(
    payload: &Value,
    raw_payload: Value,
    received_at: DateTime<Utc>,
) -> Result<Vec<NormalizedAlert>, NormalizeError> {
    let alert_name = payload
        .get("title")
        .and_then(Value::as_str)
        .ok_or_else(|| NormalizeError::Unparseable("datadog payload missing title".to_string()))?
        .to_string();

    let transition = payload.get("alert_transition_state").and_then(Value::as_str).unwrap_or("");
    let status = if transition.to_ascii_lowercase().contains("recover") {
        AlertStatus::Resolved
    } else {
        AlertStatus::Firing
    };

    let severity = match payload.get("alert_type").and_then(Value::as_str) {
        Some("error") => Severity::Critical,
        Some("warning") => Severity::Warning,
        Some("info") | Some("success") => Severity::Info,
        _ => Severity::Unknown,
    };

    let mut labels = BTreeMap::new();
    if let Some(tags) = payload.get("tags").and_then(Value::as_array) {
        for tag in tags.iter().filter_map(Value::as_str) {
            if let Some((key, value)) = tag.split_once(':') {
                labels.insert(key.to_string(), value.to_string());
            }
        }
    }

    let mut annotations = BTreeMap::new();
    if let Some(text) = payload.get("text").and_then(Value::as_str) {
        annotations.insert("description".to_string(), text.to_string());
    }

    let source = AlertSource::new(DetectedFormat::Datadog.source_name());
    let fingerprint = payload
        .get("aggregation_key")
        .and_then(Value::as_str)
        .map(Fingerprint::new)
        .unwrap_or_else(|| fingerprint::derive(source.as_str(), &alert_name, &labels));

    Ok(vec![NormalizedAlert {
        source,
        alert_name,
        status,
        severity,
        fingerprint,
        labels,
        annotations,
        starts_at: parse_timestamp(payload.get("date_happened"), received_at),
        ends_at: None,
        raw_payload,
        received_at,
    }])
}

// ============================================================================
// SECTION: CloudWatch (via SNS)
// ============================================================================

/// Parses a CloudWatch alarm wrapped in an SNS notification envelope.
///
/// # Errors
///
/// Returns [`NormalizeError::Unparseable`] if the `Message` field is not a
/// JSON-encoded alarm state change.
pub fn parse_cloudwatch(
    payload: &Value,
    raw_payload: Value,
    received_at: DateTime<Utc>,
) -> Result<Vec<NormalizedAlert>, NormalizeError> {
    let message_text = payload
        .get("Message")
        .and_then(Value::as_str)
        .ok_or_else(|| NormalizeError::Unparseable("cloudwatch envelope missing Message".to_string()))?;
    let message: Value = serde_json::from_str(message_text)
        .map_err(|err| NormalizeError::Unparseable(format!("cloudwatch Message is not JSON: {err}")))?;

    let alert_name = message
        .get("AlarmName")
        .and_then(Value::as_str)
        .ok_or_else(|| NormalizeError::Unparseable("cloudwatch alarm missing AlarmName".to_string()))?
        .to_string();

    let status = match message.get("NewStateValue").and_then(Value::as_str) {
        Some("OK") => AlertStatus::Resolved,
        _ => AlertStatus::Firing,
    };

    let mut labels = BTreeMap::new();
    if let Some(metric) = message
        .get("Trigger")
        .and_then(|trigger| trigger.get("MetricName"))
        .and_then(Value::as_str)
    {
        labels.insert("metric_name".to_string(), metric.to_string());
    }
    if let Some(namespace) = message
        .get("Trigger")
        .and_then(|trigger| trigger.get("Namespace"))
        .and_then(Value::as_str)
    {
        labels.insert("namespace".to_string(), namespace.to_string());
    }

    let mut annotations = BTreeMap::new();
    if let Some(reason) = message.get("NewStateReason").and_then(Value::as_str) {
        annotations.insert("description".to_string(), reason.to_string());
    }

    let source = AlertSource::new(DetectedFormat::CloudWatch.source_name());
    let fingerprint = fingerprint::derive(source.as_str(), &alert_name, &labels);

    Ok(vec![NormalizedAlert {
        source,
        alert_name,
        status,
        severity: Severity::Unknown,
        fingerprint,
        labels,
        annotations,
        starts_at: parse_timestamp(message.get("StateChangeTime"), received_at),
        ends_at: None,
        raw_payload,
        received_at,
    }])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn detects_grafana_alerts_array() {
        let payload = json!({"alerts": [{"labels": {"alertname": "HighCPUUsage"}}]});
        assert_eq!(detect(&payload), Some(DetectedFormat::Grafana));
    }

    #[test]
    fn detects_pagerduty_incident_event() {
        let payload = json!({"event_type": "incident.trigger", "incident": {"title": "x"}});
        assert_eq!(detect(&payload), Some(DetectedFormat::Pagerduty));
    }

    #[test]
    fn detects_datadog_envelope() {
        let payload = json!({"alert_type": "error", "alert_transition_state": "Triggered"});
        assert_eq!(detect(&payload), Some(DetectedFormat::Datadog));
    }

    #[test]
    fn detects_cloudwatch_sns_envelope() {
        let payload = json!({"Type": "Notification", "Message": "{}"});
        assert_eq!(detect(&payload), Some(DetectedFormat::CloudWatch));
    }

    #[test]
    fn rejects_unrecognized_shapes() {
        let payload = json!({"hello": "world"});
        assert_eq!(detect(&payload), None);
    }

    #[test]
    fn parses_grafana_batch_into_one_alert_per_entry() {
        let received_at = Utc::now();
        let payload = json!({
            "alerts": [
                {"status": "firing", "labels": {"alertname": "HighCPUUsage", "severity": "critical"}, "annotations": {}},
                {"status": "resolved", "labels": {"alertname": "LowDiskSpace"}, "annotations": {}}
            ]
        });
        let alerts = parse_grafana(&payload, payload.clone(), received_at).unwrap();
        assert_eq!(alerts.len(), 2);
        assert_eq!(alerts[0].source.as_str(), "Grafana");
        assert_eq!(alerts[0].alert_name, "HighCPUUsage");
        assert_eq!(alerts[0].severity, Severity::Critical);
        assert_eq!(alerts[1].status, AlertStatus::Resolved);
    }
}
