// crates/arre-server/tests/http_routes.rs
// ============================================================================
// Integration tests: admin-flags and query routes over a real router.
// Dependencies: tower, tempfile
// ============================================================================

use arre_providers::HttpProviderConfig;
use arre_server::build_state;
use arre_server::config::AuthConfig;
use arre_server::config::ServerConfig;
use arre_server::routes::build_router;
use arre_store_sqlite::SqliteStoreConfig;
use axum::body::Body;
use axum::http::Request;
use axum::http::StatusCode;
use tower::ServiceExt;

fn dummy_provider(name: &str) -> HttpProviderConfig {
    HttpProviderConfig {
        base_url: format!("http://127.0.0.1:0/{name}"),
        bearer_token: None,
        timeout_ms: 1_000,
        user_agent: "arre-server-tests".to_string(),
    }
}

fn test_config(dir: &std::path::Path) -> ServerConfig {
    ServerConfig {
        bind_addr: "127.0.0.1:0".to_string(),
        workspace: "test-workspace".to_string(),
        auth: AuthConfig::None,
        sqlite: SqliteStoreConfig::new(dir.join("arre.db")),
        task_store: dummy_provider("tasks"),
        vector_search: dummy_provider("vectors"),
        llm: dummy_provider("llm"),
        job_submitter: dummy_provider("jobs"),
        ai_selector: arre_server::config::AiSelectorConfigToml::default(),
        deadlines: arre_server::config::DeadlineConfigToml::default(),
    }
}

#[tokio::test]
async fn get_flags_defaults_to_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&test_config(dir.path())).unwrap();
    let router = build_router(state);

    let response = router
        .oneshot(Request::builder().uri("/getAdminSettingsFlags").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["incident_response_mode"], "deterministic");
}

#[tokio::test]
async fn set_flags_round_trips_through_get_flags() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&test_config(dir.path())).unwrap();
    let router = build_router(state);

    let set_request = Request::builder()
        .method("POST")
        .uri("/setFlags")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"incident_response_mode":"autonomous"}"#))
        .unwrap();
    let response = router.clone().oneshot(set_request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let get_request = Request::builder().uri("/getAdminSettingsFlags").body(Body::empty()).unwrap();
    let response = router.oneshot(get_request).await.unwrap();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["incident_response_mode"], "autonomous");
}

#[tokio::test]
async fn set_flags_rejects_an_invalid_mode() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&test_config(dir.path())).unwrap();
    let router = build_router(state);

    let request = Request::builder()
        .method("POST")
        .uri("/setFlags")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"incident_response_mode":"bogus"}"#))
        .unwrap();
    let response = router.oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn alerts_stats_starts_empty() {
    let dir = tempfile::tempdir().unwrap();
    let state = build_state(&test_config(dir.path())).unwrap();
    let router = build_router(state);

    let response = router
        .oneshot(Request::builder().uri("/alerts/stats").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["total"], 0);
}
