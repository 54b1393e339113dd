// crates/arre-core/src/flags.rs
// ============================================================================
// Module: ARRE Flag Store Types
// Description: Administrative mode flags and the principal model that gates
//              mutation of them.
// Purpose: Parameterize dispatcher behavior without process-global state.
// Dependencies: serde, thiserror
// ============================================================================

//! ## Overview
//! `incident_response_mode` is the single configuration value that selects
//! which of the three response policies (`spec.md` §4.5 S3) the dispatcher
//! takes when no deterministic trigger rule matches. It is held behind an
//! explicit [`FlagStore`] handle (see `crate::interfaces`) rather than
//! process-global mutable state, per `spec.md` §9 Design Notes.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Incident Response Mode
// ============================================================================

/// The three response policies ARRE can be configured to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentResponseMode {
    /// Only deterministic trigger-rule matches dispatch tasks.
    Deterministic,
    /// When no deterministic match exists, an AI selector may choose a
    /// tooltask.
    AiSelected,
    /// When no deterministic match exists, an AI-driven investigation is
    /// launched autonomously.
    Autonomous,
}

impl IncidentResponseMode {
    /// The mode ARRE starts in at first boot.
    pub const DEFAULT: Self = Self::Deterministic;

    /// Returns the wire/config string form of the mode.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Deterministic => "deterministic",
            Self::AiSelected => "ai_selected",
            Self::Autonomous => "autonomous",
        }
    }
}

impl Default for IncidentResponseMode {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for IncidentResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string does not name a valid response mode.
#[derive(Debug, Clone, Error)]
#[error("invalid incident_response_mode: {0}")]
pub struct InvalidModeError(pub String);

impl FromStr for IncidentResponseMode {
    type Err = InvalidModeError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "deterministic" => Ok(Self::Deterministic),
            "ai_selected" => Ok(Self::AiSelected),
            "autonomous" => Ok(Self::Autonomous),
            other => Err(InvalidModeError(other.to_string())),
        }
    }
}

// ============================================================================
// SECTION: Flag Snapshot & Update
// ============================================================================

/// Current administrative flag state, returned by `get_flags`.
///
/// # Invariants
/// - Safe to clone and hand to concurrent readers without further locking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlagSnapshot {
    /// Active response mode.
    pub incident_response_mode: IncidentResponseMode,
}

impl Default for FlagSnapshot {
    fn default() -> Self {
        Self {
            incident_response_mode: IncidentResponseMode::DEFAULT,
        }
    }
}

/// Partial update applied by `set_flags`.
///
/// # Invariants
/// - A string value that does not parse as an [`IncidentResponseMode`] is
///   rejected with [`FlagError::InvalidValue`] and the update is not applied.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FlagUpdate {
    /// New response mode, as a raw string so invalid input can be rejected
    /// with a descriptive error rather than failing deserialization.
    pub incident_response_mode: Option<String>,
}

// ============================================================================
// SECTION: Principal & Errors
// ============================================================================

/// The authenticated caller of an ARRE request, resolved by the HTTP layer
/// per the `AuthMode` design in `spec.md` §9 Design Notes. Components never
/// see how the principal was obtained, only the resolved value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    /// Stable identifier of the caller (subject or trusted header value).
    pub id: String,
    /// Whether the caller holds the admin capability required by
    /// `set_flags`.
    pub is_admin: bool,
}

impl Principal {
    /// Builds an admin principal, useful for trusted internal callers and
    /// tests.
    #[must_use]
    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: true,
        }
    }

    /// Builds a non-admin principal.
    #[must_use]
    pub fn non_admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_admin: false,
        }
    }
}

/// Errors returned by [`crate::interfaces::FlagStore::set_flags`].
#[derive(Debug, Error)]
pub enum FlagError {
    /// The submitted value is outside the enumerated set of valid modes.
    #[error("invalid flag value: {0}")]
    InvalidValue(String),
    /// The caller lacks the admin capability required to mutate flags.
    #[error("permission denied")]
    PermissionDenied,
}
