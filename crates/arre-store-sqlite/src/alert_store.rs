// crates/arre-store-sqlite/src/alert_store.rs
// ============================================================================
// Module: SQLite Alert Store
// Description: Durable, append-only persistence for `AlertRecord`s, §4.9.
// Purpose: Back `arre_core::interfaces::AlertStore` with a `SQLite` file so
//          restarting the server does not lose the alert audit trail.
// Dependencies: arre-core, rusqlite, serde_json, uuid
// ============================================================================

//! ## Overview
//! Each record is stored as a canonical JSON blob plus a handful of
//! indexed columns (`source`, `alert_name`, `selection_mode`, `severity`,
//! `status`, `received_at_ms`) used to answer [`AlertSearchFilters`]
//! without deserializing every row. The JSON blob remains the source of
//! truth returned to callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use arre_core::AlertRecord;
use arre_core::AlertSearchFilters;
use arre_core::AlertStats;
use arre_core::AlertStatus;
use arre_core::AlertStore;
use arre_core::SelectionMode;
use arre_core::Severity;
use arre_core::StoreError;
use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed [`AlertStore`].
pub struct SqliteAlertStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteAlertStore {
    /// Wraps an already-initialized connection.
    pub(crate) fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl AlertStore for SqliteAlertStore {
    fn persist(&self, mut record: AlertRecord) -> Result<AlertRecord, StoreError> {
        record.id = uuid::Uuid::new_v4().to_string().into();
        let record_json = serde_json::to_vec(&record).map_err(|err| StoreError::Store(err.to_string()))?;
        let annotation_text = record.alert.annotations.values().cloned().collect::<Vec<_>>().join(" ");

        let connection = self.connection.lock().unwrap_or_else(|poison| poison.into_inner());
        connection
            .execute(
                "INSERT INTO alert_records
                    (id, source, alert_name, selection_mode, severity, status, annotation_text, received_at_ms, record_json)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.id.as_str(),
                    record.alert.source.as_str(),
                    record.alert.alert_name,
                    selection_mode_str(record.selection_mode),
                    severity_str(record.alert.severity),
                    status_str(record.alert.status),
                    annotation_text,
                    record.received_at.timestamp_millis(),
                    record_json,
                ],
            )
            .map_err(|err| StoreError::Store(err.to_string()))?;
        Ok(record)
    }

    fn search(&self, filters: &AlertSearchFilters) -> Result<Vec<AlertRecord>, StoreError> {
        let connection = self.connection.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut sql = "SELECT record_json FROM alert_records WHERE 1 = 1".to_string();
        let mut bound: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();

        if let Some(source) = &filters.source {
            sql.push_str(" AND source = ?");
            bound.push(Box::new(source.clone()));
        }
        if let Some(alert_name) = &filters.alert_name {
            sql.push_str(" AND alert_name = ?");
            bound.push(Box::new(alert_name.clone()));
        }
        if let Some(mode) = filters.selection_mode {
            sql.push_str(" AND selection_mode = ?");
            bound.push(Box::new(selection_mode_str(mode).to_string()));
        }
        if let Some(severity) = filters.severity {
            sql.push_str(" AND severity = ?");
            bound.push(Box::new(severity_str(severity).to_string()));
        }
        if let Some(status) = filters.status {
            sql.push_str(" AND status = ?");
            bound.push(Box::new(status_str(status).to_string()));
        }
        if let Some(text) = &filters.text {
            sql.push_str(" AND annotation_text LIKE ?");
            bound.push(Box::new(format!("%{text}%")));
        }
        sql.push_str(" ORDER BY received_at_ms DESC");
        if let Some(limit) = filters.limit {
            sql.push_str(" LIMIT ?");
            #[allow(clippy::cast_possible_wrap)]
            bound.push(Box::new(limit as i64));
        }

        let mut statement = connection.prepare(&sql).map_err(|err| StoreError::Store(err.to_string()))?;
        let param_refs: Vec<&dyn rusqlite::ToSql> = bound.iter().map(std::convert::AsRef::as_ref).collect();
        let rows = statement
            .query_map(param_refs.as_slice(), parse_record_row)
            .map_err(|err| StoreError::Store(err.to_string()))?;

        let mut records = Vec::new();
        for row in rows {
            records.push(row.map_err(|err| StoreError::Store(err.to_string()))?);
        }
        Ok(records)
    }

    fn stats(&self) -> Result<AlertStats, StoreError> {
        let connection = self.connection.lock().unwrap_or_else(|poison| poison.into_inner());
        let mut stats = AlertStats::default();
        let mut statement = connection
            .prepare("SELECT selection_mode, COUNT(*) FROM alert_records GROUP BY selection_mode")
            .map_err(|err| StoreError::Store(err.to_string()))?;
        let rows = statement
            .query_map(params![], |row| {
                let mode: String = row.get(0)?;
                let count: i64 = row.get(1)?;
                Ok((mode, count))
            })
            .map_err(|err| StoreError::Store(err.to_string()))?;

        for row in rows {
            let (mode, count) = row.map_err(|err| StoreError::Store(err.to_string()))?;
            #[allow(clippy::cast_sign_loss)]
            let count = count as u64;
            stats.total += count;
            match mode.as_str() {
                "deterministic" => stats.deterministic = count,
                "ai_selected" => stats.ai_selected = count,
                "autonomous" => stats.autonomous = count,
                _ => stats.none = count,
            }
        }
        Ok(stats)
    }
}

fn parse_record_row(row: &Row<'_>) -> rusqlite::Result<AlertRecord> {
    let blob: Vec<u8> = row.get(0)?;
    serde_json::from_slice(&blob).map_err(|err| rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Blob, Box::new(err)))
}

fn selection_mode_str(mode: SelectionMode) -> &'static str {
    match mode {
        SelectionMode::Deterministic => "deterministic",
        SelectionMode::AiSelected => "ai_selected",
        SelectionMode::Autonomous => "autonomous",
        SelectionMode::None => "none",
    }
}

fn severity_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Critical => "critical",
        Severity::Warning => "warning",
        Severity::Info => "info",
        Severity::Unknown => "unknown",
    }
}

fn status_str(status: AlertStatus) -> &'static str {
    match status {
        AlertStatus::Firing => "firing",
        AlertStatus::Resolved => "resolved",
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use arre_core::AlertSource;
    use arre_core::Fingerprint;
    use arre_core::IncidentResponseMode;
    use arre_core::NormalizedAlert;
    use chrono::Utc;
    use serde_json::json;
    use tempfile::tempdir;

    use super::*;
    use crate::ArreSqliteStore;
    use crate::SqliteStoreConfig;

    fn record(alert_name: &str, mode: SelectionMode) -> AlertRecord {
        AlertRecord {
            id: "placeholder".into(),
            alert: NormalizedAlert {
                source: AlertSource::new("Grafana"),
                alert_name: alert_name.to_string(),
                status: AlertStatus::Firing,
                severity: Severity::Critical,
                fingerprint: Fingerprint::new("fp"),
                labels: BTreeMap::new(),
                annotations: BTreeMap::from([("summary".to_string(), "disk full".to_string())]),
                starts_at: Utc::now(),
                ends_at: None,
                raw_payload: json!({}),
                received_at: Utc::now(),
            },
            selection_mode: mode,
            incident_response_mode: IncidentResponseMode::DEFAULT,
            runbook_task_id: None,
            primary_job_id: None,
            child_task_id: None,
            ai_attempted: false,
            ai_confidence: 0.0,
            ai_reasoning: String::new(),
            ai_candidate_tooltasks: Vec::new(),
            execution_status: AlertExecutionStatus::Success,
            tasks_executed: 1,
            executed_tasks: Vec::new(),
            received_at: Utc::now(),
        }
    }

    #[test]
    fn persist_assigns_an_id_and_round_trips_through_search() {
        let dir = tempdir().unwrap();
        let store = ArreSqliteStore::open(SqliteStoreConfig::new(dir.path().join("arre.db"))).unwrap();
        let alert_store = store.alert_store();

        let persisted = alert_store.persist(record("DiskFull", SelectionMode::Deterministic)).unwrap();
        assert_ne!(persisted.id.as_str(), "placeholder");

        let found = alert_store
            .search(&AlertSearchFilters {
                alert_name: Some("DiskFull".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].id, persisted.id);
    }

    #[test]
    fn stats_aggregates_by_selection_mode() {
        let dir = tempdir().unwrap();
        let store = ArreSqliteStore::open(SqliteStoreConfig::new(dir.path().join("arre.db"))).unwrap();
        let alert_store = store.alert_store();

        alert_store.persist(record("A", SelectionMode::Deterministic)).unwrap();
        alert_store.persist(record("B", SelectionMode::AiSelected)).unwrap();
        alert_store.persist(record("C", SelectionMode::Deterministic)).unwrap();

        let stats = alert_store.stats().unwrap();
        assert_eq!(stats.total, 3);
        assert_eq!(stats.deterministic, 2);
        assert_eq!(stats.ai_selected, 1);
    }

    #[test]
    fn search_respects_limit_and_text_filter() {
        let dir = tempdir().unwrap();
        let store = ArreSqliteStore::open(SqliteStoreConfig::new(dir.path().join("arre.db"))).unwrap();
        let alert_store = store.alert_store();

        for name in ["A", "B", "C"] {
            alert_store.persist(record(name, SelectionMode::Deterministic)).unwrap();
        }

        let limited = alert_store
            .search(&AlertSearchFilters {
                limit: Some(2),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(limited.len(), 2);

        let texted = alert_store
            .search(&AlertSearchFilters {
                text: Some("disk full".to_string()),
                ..Default::default()
            })
            .unwrap();
        assert_eq!(texted.len(), 3);
    }
}
