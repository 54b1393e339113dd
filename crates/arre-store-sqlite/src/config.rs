// crates/arre-store-sqlite/src/config.rs
// ============================================================================
// Module: SQLite Store Configuration
// Description: Path and durability knobs for the alert/flag SQLite store.
// Purpose: Keep connection-opening defaults in one place, serde-loadable
//          from the server's TOML configuration.
// Dependencies: serde
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::PathBuf;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Journal / Sync Modes
// ============================================================================

/// `SQLite` journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// Write-ahead log; default, allows concurrent readers during a write.
    Wal,
    /// Classic rollback journal.
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `PRAGMA journal_mode` value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
        }
    }
}

impl Default for SqliteJournalMode {
    fn default() -> Self {
        Self::Wal
    }
}

/// `SQLite` synchronous mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Fsync on every commit.
    Full,
    /// Fsync at checkpoint boundaries only; safe under WAL.
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `PRAGMA synchronous` value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "FULL",
            Self::Normal => "NORMAL",
        }
    }
}

impl Default for SqliteSyncMode {
    fn default() -> Self {
        Self::Normal
    }
}

// ============================================================================
// SECTION: Store Configuration
// ============================================================================

/// Opens and tunes the backing `SQLite` file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the database file. Created on first use.
    pub path: PathBuf,
    /// `PRAGMA busy_timeout` in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// Journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// Synchronous mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

const fn default_busy_timeout_ms() -> u64 {
    5_000
}

impl SqliteStoreConfig {
    /// Builds a config pointed at `path` with default durability settings.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}
