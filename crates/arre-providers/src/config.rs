// crates/arre-providers/src/config.rs
// ============================================================================
// Module: HTTP Provider Configuration
// Description: Shared client configuration for every blocking HTTP adapter.
// Purpose: Give each outbound collaborator a consistent base-url/timeout/
//          auth shape, configured once per deployment.
// Dependencies: reqwest, serde, std::time
// ============================================================================

//! ## Overview
//! Every adapter in this crate is a thin `reqwest::blocking::Client` wrapper
//! around a narrow JSON contract; the wire protocol itself is the external
//! collaborator's concern (`spec.md` §6.2), so this module only fixes the
//! transport-level policy: timeouts, base URL, and bearer auth.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use arre_core::Deadline;
use reqwest::blocking::Client;
use reqwest::blocking::ClientBuilder;
use serde::Deserialize;

// ============================================================================
// SECTION: Configuration
// ============================================================================

/// Configuration shared by every HTTP adapter in this crate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HttpProviderConfig {
    /// Base URL of the downstream service, no trailing slash.
    pub base_url: String,
    /// Bearer token attached to every outbound request, if configured.
    pub bearer_token: Option<String>,
    /// Upper bound on a single request's duration.
    pub timeout_ms: u64,
    /// User agent string for outbound requests.
    pub user_agent: String,
}

impl HttpProviderConfig {
    /// Builds a [`Client`] honoring this configuration's timeout.
    ///
    /// # Errors
    ///
    /// Returns a [`reqwest::Error`] when the client cannot be constructed.
    pub fn build_client(&self) -> Result<Client, reqwest::Error> {
        ClientBuilder::new()
            .timeout(Duration::from_millis(self.timeout_ms))
            .user_agent(self.user_agent.clone())
            .build()
    }

    /// Joins `path` onto `base_url`.
    #[must_use]
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Computes the timeout to use for one outbound call: the smaller of the
/// configured client timeout and the time remaining on `deadline`.
#[must_use]
pub fn call_timeout(configured: Duration, deadline: Deadline) -> Duration {
    configured.min(deadline.remaining())
}
