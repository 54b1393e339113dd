// crates/arre-engine/tests/dispatch_scenarios.rs
// ============================================================================
// Tests: End-to-end dispatcher scenarios exercising every response policy
//        and the dedup/timeout edge cases called out in spec.md §8.
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use arre_core::testing::InMemoryAlertStore;
use arre_core::testing::InMemoryFlagStore;
use arre_core::testing::InMemoryJobSubmitter;
use arre_core::testing::InMemoryTaskStore;
use arre_core::testing::StubLlmAdapter;
use arre_core::testing::StubVectorSearch;
use arre_core::AlertExecutionStatus;
use arre_core::AlertSource;
use arre_core::AlertStore;
use arre_core::Deadline;
use arre_core::IncidentResponseMode;
use arre_core::SelectionMode;
use arre_core::Task;
use arre_core::TaskId;
use arre_core::TriggerRule;
use arre_core::VectorCandidate;
use arre_engine::Dispatcher;
use arre_engine::EngineConfig;

fn grafana_payload(alert_name: &str) -> Vec<u8> {
    serde_json::json!({
        "alerts": [
            {
                "status": "firing",
                "labels": {"alertname": alert_name},
                "annotations": {"summary": "cpu spiked", "description": "Server CPU at 95%"}
            }
        ]
    })
    .to_string()
    .into_bytes()
}

fn task_with_rule(id: &str, source: &str, alert_name: &str, dedup_interval: Duration) -> Task {
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
            dedup_interval,
        }],
        is_tooltask: false,
    }
}

fn tooltask(id: &str, title: &str) -> Task {
    Task {
        id: TaskId::new(id),
        title: title.to_string(),
        description: "Investigates CPU spikes".to_string(),
        tags: Vec::new(),
        script_type: "shell".to_string(),
        script: String::new(),
        trigger_on_alerts: Vec::new(),
        is_tooltask: true,
    }
}

#[test]
fn scenario_a_deterministic_match_dispatches_the_matched_task() {
    let task_store = Arc::new(InMemoryTaskStore::seeded(vec![task_with_rule(
        "t1",
        "Grafana",
        "HighCPUUsage",
        Duration::from_secs(300),
    )]));
    let flags = Arc::new(InMemoryFlagStore::new());
    let vector_search = Arc::new(StubVectorSearch::empty());
    let llm = Arc::new(StubLlmAdapter::declining());
    let job_submitter = Arc::new(InMemoryJobSubmitter::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let dispatcher = Dispatcher::new(
        flags,
        task_store,
        vector_search,
        llm,
        job_submitter.clone(),
        alert_store.clone(),
        EngineConfig::default(),
    );

    let outcome = dispatcher
        .process_payload(&grafana_payload("HighCPUUsage"), None, "prod", chrono::Utc::now(), Deadline::after(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(outcome.tasks_executed, 1);
    assert_eq!(outcome.records[0].selection_mode, SelectionMode::Deterministic);
    assert_eq!(job_submitter.call_count(), 1);
    assert_eq!(alert_store.stats().unwrap().deterministic, 1);
}

#[test]
fn scenario_b_deterministic_miss_under_deterministic_mode_dispatches_nothing() {
    let task_store = Arc::new(InMemoryTaskStore::new());
    let flags = Arc::new(InMemoryFlagStore::with_mode(IncidentResponseMode::Deterministic));
    let vector_search = Arc::new(StubVectorSearch::empty());
    let llm = Arc::new(StubLlmAdapter::declining());
    let job_submitter = Arc::new(InMemoryJobSubmitter::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let dispatcher = Dispatcher::new(
        flags,
        task_store,
        vector_search,
        llm,
        job_submitter.clone(),
        alert_store,
        EngineConfig::default(),
    );

    let outcome = dispatcher
        .process_payload(&grafana_payload("UnknownAlert"), None, "prod", chrono::Utc::now(), Deadline::after(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(outcome.tasks_executed, 0);
    assert_eq!(outcome.records[0].selection_mode, SelectionMode::None);
    assert_eq!(outcome.records[0].execution_status, AlertExecutionStatus::Success);
    assert_eq!(job_submitter.call_count(), 0);
}

#[test]
fn scenario_c_ai_selected_mode_dispatches_the_chosen_tooltask() {
    let tool_task = tooltask("tt1", "CPU performance investigation");
    let task_store = Arc::new(InMemoryTaskStore::seeded(vec![tool_task.clone()]));
    let flags = Arc::new(InMemoryFlagStore::with_mode(IncidentResponseMode::AiSelected));
    let vector_search = Arc::new(StubVectorSearch::new(vec![VectorCandidate {
        task_id: tool_task.id.clone(),
        similarity: 0.9,
    }]));
    let llm = Arc::new(StubLlmAdapter::selecting(tool_task.id.clone(), 0.85, "matches CPU symptoms"));
    let job_submitter = Arc::new(InMemoryJobSubmitter::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let dispatcher = Dispatcher::new(
        flags,
        task_store,
        vector_search,
        llm,
        job_submitter.clone(),
        alert_store.clone(),
        EngineConfig::default(),
    );

    let outcome = dispatcher
        .process_payload(&grafana_payload("CPUSpike"), None, "prod", chrono::Utc::now(), Deadline::after(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(outcome.tasks_executed, 1);
    assert_eq!(outcome.records[0].selection_mode, SelectionMode::AiSelected);
    assert!((outcome.records[0].ai_confidence - 0.85).abs() < f64::EPSILON);
    assert_eq!(job_submitter.call_count(), 1);
    assert_eq!(alert_store.stats().unwrap().ai_selected, 1);
}

#[test]
fn scenario_d_ai_selected_mode_with_no_candidate_persists_a_clean_no_match() {
    let task_store = Arc::new(InMemoryTaskStore::new());
    let flags = Arc::new(InMemoryFlagStore::with_mode(IncidentResponseMode::AiSelected));
    let vector_search = Arc::new(StubVectorSearch::empty());
    let llm = Arc::new(StubLlmAdapter::declining());
    let job_submitter = Arc::new(InMemoryJobSubmitter::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let dispatcher = Dispatcher::new(
        flags,
        task_store,
        vector_search,
        llm,
        job_submitter.clone(),
        alert_store,
        EngineConfig::default(),
    );

    let outcome = dispatcher
        .process_payload(&grafana_payload("CPUSpike"), None, "prod", chrono::Utc::now(), Deadline::after(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(outcome.tasks_executed, 0);
    assert_eq!(outcome.records[0].selection_mode, SelectionMode::None);
    assert!(outcome.records[0].ai_attempted);
    assert_eq!(job_submitter.call_count(), 0);
}

#[test]
fn scenario_e_autonomous_mode_always_launches_an_investigation() {
    let task_store = Arc::new(InMemoryTaskStore::new());
    let flags = Arc::new(InMemoryFlagStore::with_mode(IncidentResponseMode::Autonomous));
    let vector_search = Arc::new(StubVectorSearch::empty());
    let llm = Arc::new(StubLlmAdapter::selecting(TaskId::new("unused"), 1.0, "n/a"));
    let job_submitter = Arc::new(InMemoryJobSubmitter::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let dispatcher = Dispatcher::new(
        flags,
        task_store.clone(),
        vector_search,
        llm,
        job_submitter.clone(),
        alert_store.clone(),
        EngineConfig::default(),
    );

    let outcome = dispatcher
        .process_payload(&grafana_payload("UnknownCatastrophe"), None, "prod", chrono::Utc::now(), Deadline::after(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(outcome.tasks_executed, 1);
    let record = &outcome.records[0];
    assert_eq!(record.selection_mode, SelectionMode::Autonomous);
    assert!(record.runbook_task_id.is_some());
    assert!(record.child_task_id.is_some());
    assert_eq!(job_submitter.call_count(), 1);

    assert!(task_store.get_task(record.runbook_task_id.as_ref().unwrap()).unwrap().is_some());
    assert!(task_store.get_task(record.child_task_id.as_ref().unwrap()).unwrap().is_some());
}

#[test]
fn scenario_f_repeated_deterministic_match_within_interval_is_suppressed() {
    let task_store = Arc::new(InMemoryTaskStore::seeded(vec![task_with_rule(
        "t1",
        "Grafana",
        "HighCPUUsage",
        Duration::from_secs(300),
    )]));
    let flags = Arc::new(InMemoryFlagStore::new());
    let vector_search = Arc::new(StubVectorSearch::empty());
    let llm = Arc::new(StubLlmAdapter::declining());
    let job_submitter = Arc::new(InMemoryJobSubmitter::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let dispatcher = Dispatcher::new(
        flags,
        task_store,
        vector_search,
        llm,
        job_submitter.clone(),
        alert_store,
        EngineConfig::default(),
    );

    let payload = grafana_payload("HighCPUUsage");
    let first = dispatcher
        .process_payload(&payload, None, "prod", chrono::Utc::now(), Deadline::after(Duration::from_secs(5)))
        .unwrap();
    let second = dispatcher
        .process_payload(&payload, None, "prod", chrono::Utc::now(), Deadline::after(Duration::from_secs(5)))
        .unwrap();

    assert_eq!(first.tasks_executed, 1);
    assert_eq!(second.tasks_executed, 0);
    assert_eq!(second.records[0].selection_mode, SelectionMode::Deterministic);
    assert!(second.records[0].executed_tasks.is_empty());
    assert_eq!(job_submitter.call_count(), 1);
}

#[test]
fn unparseable_payload_returns_an_error_without_persisting_a_record() {
    let task_store = Arc::new(InMemoryTaskStore::new());
    let flags = Arc::new(InMemoryFlagStore::new());
    let vector_search = Arc::new(StubVectorSearch::empty());
    let llm = Arc::new(StubLlmAdapter::declining());
    let job_submitter = Arc::new(InMemoryJobSubmitter::new());
    let alert_store = Arc::new(InMemoryAlertStore::new());

    let dispatcher = Dispatcher::new(
        flags,
        task_store,
        vector_search,
        llm,
        job_submitter,
        alert_store.clone(),
        EngineConfig::default(),
    );

    let err = dispatcher
        .process_payload(b"not json", None, "prod", chrono::Utc::now(), Deadline::after(Duration::from_secs(5)))
        .unwrap_err();
    assert!(matches!(err, arre_engine::DispatchError::Unparseable(_)));
    assert_eq!(alert_store.stats().unwrap().total, 0);
}
