// crates/arre-providers/src/llm.rs
// ============================================================================
// Module: HTTP LLM Adapter
// Description: Implements arre_core::LlmAdapter over a JSON/HTTP LLM gateway.
// Purpose: Give the AI selector and autonomous launcher a narrow select/plan
//          surface without coupling ARRE to any specific model provider.
// Dependencies: arre-core, reqwest, serde
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use arre_core::CandidateTaskSummary;
use arre_core::Deadline;
use arre_core::LlmAdapter;
use arre_core::LlmError;
use arre_core::PlanPrompt;
use arre_core::RunbookPlan;
use arre_core::SelectionDecision;
use arre_core::SelectionPrompt;
use arre_core::TaskId;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;

use crate::config::call_timeout;
use crate::config::HttpProviderConfig;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct SelectRequest<'a> {
    alert_summary: &'a str,
    candidates: &'a [CandidateTaskSummary],
}

#[derive(Debug, Deserialize)]
struct SelectResponse {
    selected_task_id: Option<TaskId>,
    confidence: f64,
    reasoning: String,
}

#[derive(Debug, Serialize)]
struct PlanRequest<'a> {
    alert_summary: &'a str,
    alert_detail: &'a str,
}

#[derive(Debug, Deserialize)]
struct PlanResponse {
    title: String,
    description: String,
    script_type: String,
    script: String,
    child_title: String,
    child_description: String,
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// `LlmAdapter` implementation backed by an HTTP gateway:
/// `POST {base}/select` and `POST {base}/plan`.
pub struct HttpLlmAdapter {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpLlmAdapter {
    /// Builds the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Adapter`] when the HTTP client cannot be
    /// constructed.
    pub fn new(config: HttpProviderConfig) -> Result<Self, LlmError> {
        let client = config
            .build_client()
            .map_err(|err| LlmError::Adapter(format!("failed to build http client: {err}")))?;
        Ok(Self { config, client })
    }

    fn timeout(&self, deadline: Deadline) -> Duration {
        call_timeout(Duration::from_millis(self.config.timeout_ms), deadline)
    }
}

impl LlmAdapter for HttpLlmAdapter {
    fn select(&self, prompt: &SelectionPrompt, deadline: Deadline) -> Result<SelectionDecision, LlmError> {
        if deadline.is_expired() {
            return Err(LlmError::Timeout);
        }

        let mut request = self
            .client
            .post(self.config.url("/select"))
            .timeout(self.timeout(deadline))
            .json(&SelectRequest {
                alert_summary: &prompt.alert_summary,
                candidates: &prompt.candidates,
            });
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|err| {
            if err.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Adapter(err.to_string())
            }
        })?;
        let response = response.error_for_status().map_err(|err| LlmError::Adapter(err.to_string()))?;
        let decoded: SelectResponse = response
            .json()
            .map_err(|err| LlmError::Adapter(format!("malformed selection response: {err}")))?;

        Ok(SelectionDecision {
            selected_task_id: decoded.selected_task_id,
            confidence: decoded.confidence,
            reasoning: decoded.reasoning,
        })
    }

    fn plan(&self, prompt: &PlanPrompt, deadline: Deadline) -> Result<RunbookPlan, LlmError> {
        if deadline.is_expired() {
            return Err(LlmError::Timeout);
        }

        let mut request = self
            .client
            .post(self.config.url("/plan"))
            .timeout(self.timeout(deadline))
            .json(&PlanRequest {
                alert_summary: &prompt.alert_summary,
                alert_detail: &prompt.alert_detail,
            });
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request.send().map_err(|err| {
            if err.is_timeout() {
                LlmError::Timeout
            } else {
                LlmError::Adapter(err.to_string())
            }
        })?;
        let response = response.error_for_status().map_err(|err| LlmError::Adapter(err.to_string()))?;
        let decoded: PlanResponse = response
            .json()
            .map_err(|err| LlmError::Adapter(format!("malformed plan response: {err}")))?;

        Ok(RunbookPlan {
            title: decoded.title,
            description: decoded.description,
            script_type: decoded.script_type,
            script: decoded.script,
            child_title: decoded.child_title,
            child_description: decoded.child_description,
        })
    }
}
