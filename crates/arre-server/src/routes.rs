// crates/arre-server/src/routes.rs
// ============================================================================
// Module: HTTP Routes
// Description: Axum handlers for the §6.1 inbound surface.
// Purpose: Translate HTTP requests into Dispatcher/FlagStore/AlertStore
//          calls and translate their results back into §6.1's wire shapes.
// Dependencies: arre-core, arre-engine, axum, tokio, tracing
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arre_core::AlertSearchFilters;
use arre_core::AlertStatus;
use arre_core::Deadline;
use arre_core::FlagUpdate;
use arre_core::IncidentResponseMode;
use arre_core::Principal;
use arre_core::SelectionMode;
use arre_core::Severity;
use axum::extract::Query;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::routing::get;
use axum::routing::post;
use axum::Json;
use axum::Router;
use serde::Deserialize;

use crate::auth::resolve_principal;
use crate::error::ApiError;
use crate::response::AlertsResponse;
use crate::response::FlagsResponse;
use crate::response::ProcessAlertResponse;
use crate::response::StatsResponse;
use crate::state::AppState;

/// Builds the router exposing every §6.1 route over `state`.
#[must_use]
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/processAlert", post(process_alert))
        .route("/setFlags", post(set_flags))
        .route("/getAdminSettingsFlags", get(get_flags))
        .route("/alerts", get(list_alerts))
        .route("/alerts/stats", get(alert_stats))
        .with_state(state)
}

// ============================================================================
// SECTION: POST /processAlert
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct ProcessAlertQuery {
    routing_hint: Option<String>,
}

async fn process_alert(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<ProcessAlertQuery>,
    body: axum::body::Bytes,
) -> Result<Json<ProcessAlertResponse>, ApiError> {
    resolve_principal(&headers, &state.auth)?;

    let mode = state.flag_store.get_flags().incident_response_mode;
    let budget = if mode == IncidentResponseMode::Autonomous {
        state.deadlines.autonomous_deadline
    } else {
        state.deadlines.default_deadline
    };
    let deadline = Deadline::after(budget);
    let workspace = Arc::clone(&state.workspace);
    let dispatcher = Arc::clone(&state.dispatcher);
    let received_at = chrono::Utc::now();

    let outcome = tokio::time::timeout(
        budget,
        tokio::task::spawn_blocking(move || dispatcher.process_payload(&body, query.routing_hint, &workspace, received_at, deadline)),
    )
    .await
    .map_err(|_| ApiError::Timeout)?
    .map_err(|join_err| ApiError::Transient(join_err.to_string()))??;

    for record in &outcome.records {
        let task_ids: Vec<&str> = record.executed_tasks.iter().map(|task| task.task_id.as_str()).collect();
        tracing::info!(
            fingerprint = %record.alert.fingerprint,
            task_id = ?task_ids,
            execution_status = ?record.execution_status,
            "processAlert request handled"
        );
    }

    Ok(Json(outcome.into()))
}

// ============================================================================
// SECTION: Flags
// ============================================================================

#[derive(Debug, Deserialize)]
struct SetFlagsRequest {
    incident_response_mode: Option<String>,
}

async fn set_flags(State(state): State<AppState>, headers: HeaderMap, Json(request): Json<SetFlagsRequest>) -> Result<Json<FlagsResponse>, ApiError> {
    let principal: Principal = resolve_principal(&headers, &state.auth)?;
    let snapshot = state.flag_store.set_flags(
        &principal,
        FlagUpdate {
            incident_response_mode: request.incident_response_mode,
        },
    )?;
    Ok(Json(snapshot.into()))
}

async fn get_flags(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<FlagsResponse>, ApiError> {
    resolve_principal(&headers, &state.auth)?;
    Ok(Json(state.flag_store.get_flags().into()))
}

// ============================================================================
// SECTION: Operator Queries
// ============================================================================

#[derive(Debug, Deserialize, Default)]
struct AlertsQuery {
    source: Option<String>,
    alert_name: Option<String>,
    selection_mode: Option<SelectionMode>,
    severity: Option<Severity>,
    status: Option<AlertStatus>,
    text: Option<String>,
    limit: Option<usize>,
}

impl From<AlertsQuery> for AlertSearchFilters {
    fn from(query: AlertsQuery) -> Self {
        Self {
            source: query.source,
            alert_name: query.alert_name,
            selection_mode: query.selection_mode,
            severity: query.severity,
            status: query.status,
            text: query.text,
            limit: query.limit,
        }
    }
}

async fn list_alerts(State(state): State<AppState>, headers: HeaderMap, Query(query): Query<AlertsQuery>) -> Result<Json<AlertsResponse>, ApiError> {
    resolve_principal(&headers, &state.auth)?;
    let records = state.alert_store.search(&query.into())?;
    Ok(Json(AlertsResponse { records }))
}

async fn alert_stats(State(state): State<AppState>, headers: HeaderMap) -> Result<Json<StatsResponse>, ApiError> {
    resolve_principal(&headers, &state.auth)?;
    let stats = state.alert_store.stats()?;
    Ok(Json(StatsResponse { stats }))
}
