// crates/arre-server/src/config.rs
// ============================================================================
// Module: Server Configuration
// Description: TOML-loadable configuration for the HTTP server, mirroring
//              the donor's CONFIG_ENV_VAR fail-closed loading pattern.
// Purpose: Hold bind address, the SQLite store location, auth mode, outbound
//          adapter base URLs, AI-selector tunables, and request deadlines in
//          one place `arre-cli` can load before wiring the server.
// Dependencies: arre-engine, arre-providers, arre-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file, defaulting to `arre.toml` in
//! the current directory, overridable via the `ARRE_CONFIG` environment
//! variable. Loading is fail-closed (`spec.md` §10.3 **[AMBIENT]**): a
//! missing or malformed file refuses to start the server rather than
//! silently substituting defaults.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;

use arre_engine::AiSelectorConfig;
use arre_engine::DeadlineConfig;
use arre_engine::EngineConfig;
use arre_providers::HttpProviderConfig;
use arre_store_sqlite::SqliteStoreConfig;
use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming the config file path, mirroring the donor's
/// `CONFIG_ENV_VAR` convention.
pub const CONFIG_ENV_VAR: &str = "ARRE_CONFIG";
/// Default config file path when `ARRE_CONFIG` is unset.
pub const DEFAULT_CONFIG_PATH: &str = "arre.toml";

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure to load or parse the server configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("could not read config file {path}: {source}")]
    Read {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },
    /// The configuration file was not valid TOML for this shape.
    #[error("invalid config file {path}: {source}")]
    Parse {
        /// Path that was attempted.
        path: PathBuf,
        /// Underlying parse failure.
        #[source]
        source: Box<toml::de::Error>,
    },
}

// ============================================================================
// SECTION: Auth Configuration
// ============================================================================

/// A single accepted bearer token and the principal it resolves to.
#[derive(Debug, Clone, Deserialize)]
pub struct BearerTokenEntry {
    /// The token value callers must present.
    pub token: String,
    /// Stable principal id attributed to this token.
    pub principal_id: String,
    /// Whether this token grants the admin capability.
    #[serde(default)]
    pub is_admin: bool,
}

/// `spec.md` §9 Design Notes: the means of resolving a principal is
/// externalized to this enum, selected once at boot. Components never see
/// which variant produced the principal they received.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AuthConfig {
    /// Authenticate via an `Authorization: Bearer <token>` header matched
    /// against a configured allowlist.
    BearerToken {
        /// Accepted tokens.
        tokens: Vec<BearerTokenEntry>,
    },
    /// Trust a header set by an upstream gateway naming the principal
    /// directly, without re-validating a credential.
    TrustedPrincipalHeader {
        /// Header carrying the principal id.
        header_name: String,
        /// Principal ids in this set resolve with the admin capability.
        #[serde(default)]
        admin_principal_ids: Vec<String>,
    },
    /// No authentication; every caller resolves as a trusted local admin.
    /// Intended only for local development and the in-memory demo.
    None,
}

// ============================================================================
// SECTION: Engine Tunables (TOML Shapes)
// ============================================================================

/// TOML-loadable mirror of [`AiSelectorConfig`]; `Duration` fields are
/// expressed in seconds rather than relying on `serde`'s verbose
/// `{secs, nanos}` struct form.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct AiSelectorConfigToml {
    /// See [`AiSelectorConfig::top_k`].
    pub top_k: usize,
    /// See [`AiSelectorConfig::candidate_pool`].
    pub candidate_pool: usize,
    /// See [`AiSelectorConfig::similarity_floor`].
    pub similarity_floor: f64,
    /// See [`AiSelectorConfig::min_confidence`].
    pub min_confidence: f64,
    /// See [`AiSelectorConfig::llm_timeout`], in seconds.
    pub llm_timeout_secs: u64,
    /// See [`AiSelectorConfig::dedup_interval`], in seconds.
    pub dedup_interval_secs: u64,
}

impl Default for AiSelectorConfigToml {
    fn default() -> Self {
        let defaults = AiSelectorConfig::default();
        Self {
            top_k: defaults.top_k,
            candidate_pool: defaults.candidate_pool,
            similarity_floor: defaults.similarity_floor,
            min_confidence: defaults.min_confidence,
            llm_timeout_secs: defaults.llm_timeout.as_secs(),
            dedup_interval_secs: defaults.dedup_interval.as_secs(),
        }
    }
}

impl From<AiSelectorConfigToml> for AiSelectorConfig {
    fn from(toml: AiSelectorConfigToml) -> Self {
        Self {
            top_k: toml.top_k,
            candidate_pool: toml.candidate_pool,
            similarity_floor: toml.similarity_floor,
            min_confidence: toml.min_confidence,
            llm_timeout: Duration::from_secs(toml.llm_timeout_secs),
            dedup_interval: Duration::from_secs(toml.dedup_interval_secs),
        }
    }
}

/// TOML-loadable mirror of [`DeadlineConfig`], §5.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct DeadlineConfigToml {
    /// See [`DeadlineConfig::default_deadline`], in seconds.
    pub default_deadline_secs: u64,
    /// See [`DeadlineConfig::autonomous_deadline`], in seconds.
    pub autonomous_deadline_secs: u64,
}

impl Default for DeadlineConfigToml {
    fn default() -> Self {
        let defaults = DeadlineConfig::default();
        Self {
            default_deadline_secs: defaults.default_deadline.as_secs(),
            autonomous_deadline_secs: defaults.autonomous_deadline.as_secs(),
        }
    }
}

impl From<DeadlineConfigToml> for DeadlineConfig {
    fn from(toml: DeadlineConfigToml) -> Self {
        Self {
            default_deadline: Duration::from_secs(toml.default_deadline_secs),
            autonomous_deadline: Duration::from_secs(toml.autonomous_deadline_secs),
        }
    }
}

// ============================================================================
// SECTION: Server Configuration
// ============================================================================

/// Top-level configuration for `arre-server`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    /// Address the HTTP listener binds to, e.g. `0.0.0.0:8080`.
    pub bind_addr: String,
    /// Deployment-routing workspace identifier forwarded to the job
    /// runtime and outbound adapters.
    pub workspace: String,
    /// Authentication mode.
    pub auth: AuthConfig,
    /// SQLite alert/flag store configuration.
    pub sqlite: SqliteStoreConfig,
    /// Outbound task store adapter configuration.
    pub task_store: HttpProviderConfig,
    /// Outbound vector search adapter configuration.
    pub vector_search: HttpProviderConfig,
    /// Outbound LLM adapter configuration.
    pub llm: HttpProviderConfig,
    /// Outbound job submission adapter configuration.
    pub job_submitter: HttpProviderConfig,
    /// AI selector tunables.
    #[serde(default)]
    pub ai_selector: AiSelectorConfigToml,
    /// Request deadline budget.
    #[serde(default)]
    pub deadlines: DeadlineConfigToml,
}

impl ServerConfig {
    /// Loads configuration from `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the file cannot be read or does not
    /// parse as a valid `ServerConfig`.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source: Box::new(source),
        })
    }

    /// Loads configuration from the path named by `ARRE_CONFIG`, or
    /// [`DEFAULT_CONFIG_PATH`] if unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] under the same conditions as
    /// [`ServerConfig::load_from`].
    pub fn load() -> Result<Self, ConfigError> {
        let path = env::var(CONFIG_ENV_VAR).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::load_from(Path::new(&path))
    }

    /// Builds the [`EngineConfig`] this server configuration implies.
    #[must_use]
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            ai_selector: self.ai_selector.into(),
            deadlines: self.deadlines.into(),
        }
    }
}
