// crates/arre-providers/src/task_store.rs
// ============================================================================
// Module: HTTP Task Store Adapter
// Description: Implements arre_core::TaskStore over a JSON/HTTP task service.
// Purpose: Let ARRE consume the narrow get/list/create/delete surface it
//          needs (spec.md §6.2) without owning task storage itself.
// Dependencies: arre-core, reqwest, serde_json
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use arre_core::Task;
use arre_core::TaskDraft;
use arre_core::TaskId;
use arre_core::TaskStore;
use arre_core::TaskStoreError;
use reqwest::blocking::Client;
use reqwest::StatusCode;

use crate::config::HttpProviderConfig;

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// `TaskStore` implementation backed by an HTTP task service.
///
/// Endpoints consumed:
/// - `GET {base}/tasks/{id}`
/// - `GET {base}/tasks?trigger_candidates=true`
/// - `GET {base}/tasks?tooltasks=true`
/// - `POST {base}/tasks`
/// - `DELETE {base}/tasks/{id}`
pub struct HttpTaskStore {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpTaskStore {
    /// Builds the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TaskStoreError::Permanent`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: HttpProviderConfig) -> Result<Self, TaskStoreError> {
        let client = config
            .build_client()
            .map_err(|err| TaskStoreError::Permanent(format!("failed to build http client: {err}")))?;
        Ok(Self { config, client })
    }

    fn request_error(err: &reqwest::Error) -> TaskStoreError {
        if err.is_timeout() || err.is_connect() {
            TaskStoreError::Transient(err.to_string())
        } else {
            TaskStoreError::Permanent(err.to_string())
        }
    }
}

impl TaskStore for HttpTaskStore {
    fn get_task(&self, id: &TaskId) -> Result<Option<Task>, TaskStoreError> {
        let mut request = self.client.get(self.config.url(&format!("/tasks/{}", id.as_str())));
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request.send().map_err(|err| Self::request_error(&err))?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|err| Self::request_error(&err))?;
        let task: Task = response
            .json()
            .map_err(|err| TaskStoreError::Permanent(format!("malformed task response: {err}")))?;
        Ok(Some(task))
    }

    fn list_trigger_candidates(&self) -> Result<Vec<Task>, TaskStoreError> {
        self.list_with_query("trigger_candidates=true")
    }

    fn list_tooltasks(&self) -> Result<Vec<Task>, TaskStoreError> {
        self.list_with_query("tooltasks=true")
    }

    fn create_task(&self, draft: TaskDraft) -> Result<Task, TaskStoreError> {
        let mut request = self.client.post(self.config.url("/tasks")).json(&draft);
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|err| Self::request_error(&err))?
            .error_for_status()
            .map_err(|err| Self::request_error(&err))?;
        response
            .json()
            .map_err(|err| TaskStoreError::Permanent(format!("malformed task response: {err}")))
    }

    fn delete_task(&self, id: &TaskId) -> Result<(), TaskStoreError> {
        let mut request = self.client.delete(self.config.url(&format!("/tasks/{}", id.as_str())));
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        request
            .send()
            .map_err(|err| Self::request_error(&err))?
            .error_for_status()
            .map_err(|err| Self::request_error(&err))?;
        Ok(())
    }
}

impl HttpTaskStore {
    fn list_with_query(&self, query: &str) -> Result<Vec<Task>, TaskStoreError> {
        let mut request = self.client.get(self.config.url(&format!("/tasks?{query}")));
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .map_err(|err| Self::request_error(&err))?
            .error_for_status()
            .map_err(|err| Self::request_error(&err))?;
        response
            .json()
            .map_err(|err| TaskStoreError::Permanent(format!("malformed task list response: {err}")))
    }
}
