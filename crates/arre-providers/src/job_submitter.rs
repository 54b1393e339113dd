// crates/arre-providers/src/job_submitter.rs
// ============================================================================
// Module: HTTP Job Submitter Adapter
// Description: Implements arre_core::JobSubmitter over a JSON/HTTP job
//              runtime endpoint.
// Purpose: Start task executions without ARRE owning the execution model
//          (spec.md §4.8, §6.2).
// Dependencies: arre-core, reqwest, serde
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use arre_core::AlertContext;
use arre_core::Deadline;
use arre_core::JobId;
use arre_core::JobSubmitError;
use arre_core::JobSubmitter;
use arre_core::NormalizedAlert;
use arre_core::TaskId;
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::Deserialize;
use serde::Serialize;

use crate::config::call_timeout;
use crate::config::HttpProviderConfig;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct SubmitRequest<'a> {
    task_id: &'a TaskId,
    alert: &'a NormalizedAlert,
    routing_hint: &'a Option<String>,
    workspace: &'a str,
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    job_id: JobId,
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// `JobSubmitter` implementation backed by `POST {base}/jobs`.
pub struct HttpJobSubmitter {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpJobSubmitter {
    /// Builds the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`JobSubmitError::Transient`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: HttpProviderConfig) -> Result<Self, JobSubmitError> {
        let client = config
            .build_client()
            .map_err(|err| JobSubmitError::Transient(format!("failed to build http client: {err}")))?;
        Ok(Self { config, client })
    }
}

impl JobSubmitter for HttpJobSubmitter {
    fn submit(
        &self,
        task_id: &TaskId,
        context: &AlertContext,
        workspace: &str,
        deadline: Deadline,
    ) -> Result<JobId, JobSubmitError> {
        if deadline.is_expired() {
            return Err(JobSubmitError::Transient("deadline already expired".to_string()));
        }

        let timeout = call_timeout(Duration::from_millis(self.config.timeout_ms), deadline);
        let mut request = self
            .client
            .post(self.config.url("/jobs"))
            .timeout(timeout)
            .json(&SubmitRequest {
                task_id,
                alert: &context.alert,
                routing_hint: &context.routing_hint,
                workspace,
            });
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|err| {
            if err.is_timeout() || err.is_connect() {
                JobSubmitError::Transient(err.to_string())
            } else {
                JobSubmitError::Permanent(err.to_string())
            }
        })?;

        match response.status() {
            StatusCode::NOT_FOUND => Err(JobSubmitError::NotFound(task_id.clone())),
            StatusCode::FORBIDDEN | StatusCode::UNAUTHORIZED => {
                Err(JobSubmitError::PermissionDenied(task_id.clone()))
            }
            status if status.is_server_error() => Err(JobSubmitError::Transient(format!("job runtime returned {status}"))),
            status if !status.is_success() => Err(JobSubmitError::Permanent(format!("job runtime returned {status}"))),
            _ => {
                let decoded: SubmitResponse = response
                    .json()
                    .map_err(|err| JobSubmitError::Permanent(format!("malformed submit response: {err}")))?;
                Ok(decoded.job_id)
            }
        }
    }
}
