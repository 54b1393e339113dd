// crates/arre-providers/src/vector_search.rs
// ============================================================================
// Module: HTTP Vector Search Adapter
// Description: Implements arre_core::VectorSearch over a JSON/HTTP KNN
//              search endpoint.
// Purpose: Let the AI selector query tooltask similarity without owning the
//          embedding index (spec.md §6.2).
// Dependencies: arre-core, reqwest, serde
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use arre_core::Deadline;
use arre_core::TaskId;
use arre_core::VectorCandidate;
use arre_core::VectorSearch;
use arre_core::VectorSearchError;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde::Serialize;

use crate::config::call_timeout;
use crate::config::HttpProviderConfig;

// ============================================================================
// SECTION: Wire Types
// ============================================================================

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    query_text: &'a str,
    candidate_pool: usize,
    similarity_floor: f64,
}

#[derive(Debug, Deserialize)]
struct SearchResultEntry {
    task_id: TaskId,
    similarity: f64,
}

// ============================================================================
// SECTION: Adapter
// ============================================================================

/// `VectorSearch` implementation backed by an HTTP KNN endpoint
/// (`POST {base}/search`).
pub struct HttpVectorSearch {
    config: HttpProviderConfig,
    client: Client,
}

impl HttpVectorSearch {
    /// Builds the adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`VectorSearchError::Transient`] when the HTTP client cannot
    /// be constructed.
    pub fn new(config: HttpProviderConfig) -> Result<Self, VectorSearchError> {
        let client = config
            .build_client()
            .map_err(|err| VectorSearchError::Transient(format!("failed to build http client: {err}")))?;
        Ok(Self { config, client })
    }
}

impl VectorSearch for HttpVectorSearch {
    fn search_tooltasks(
        &self,
        query_text: &str,
        candidate_pool: usize,
        similarity_floor: f64,
        deadline: Deadline,
    ) -> Result<Vec<VectorCandidate>, VectorSearchError> {
        if deadline.is_expired() {
            return Err(VectorSearchError::Transient("deadline already expired".to_string()));
        }

        let timeout = call_timeout(Duration::from_millis(self.config.timeout_ms), deadline);
        let mut request = self
            .client
            .post(self.config.url("/search"))
            .timeout(timeout)
            .json(&SearchRequest {
                query_text,
                candidate_pool,
                similarity_floor,
            });
        if let Some(token) = &self.config.bearer_token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .map_err(|err| VectorSearchError::Transient(err.to_string()))?
            .error_for_status()
            .map_err(|err| VectorSearchError::Transient(err.to_string()))?;

        let entries: Vec<SearchResultEntry> = response
            .json()
            .map_err(|err| VectorSearchError::Transient(format!("malformed search response: {err}")))?;

        let mut candidates: Vec<VectorCandidate> = entries
            .into_iter()
            .map(|entry| VectorCandidate {
                task_id: entry.task_id,
                similarity: entry.similarity,
            })
            .collect();

        candidates.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.task_id.cmp(&b.task_id))
        });

        Ok(candidates)
    }
}
