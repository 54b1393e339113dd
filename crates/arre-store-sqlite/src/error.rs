// crates/arre-store-sqlite/src/error.rs
// ============================================================================
// Module: SQLite Store Errors
// Description: Failure modes for opening and operating the backing database.
// Purpose: Translate `rusqlite` and path-validation failures into ARRE's
//          store-level error types.
// Dependencies: arre-core, rusqlite, thiserror
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use arre_core::StoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Failure modes for the `SQLite`-backed stores.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// The store path is unsafe or malformed.
    #[error("invalid store path: {0}")]
    Invalid(String),
    /// A filesystem operation failed.
    #[error("store io error: {0}")]
    Io(String),
    /// The underlying database rejected an operation.
    #[error("store db error: {0}")]
    Db(String),
    /// The on-disk schema version does not match what this build expects.
    #[error("store schema mismatch: found version {found}, expected {expected}")]
    SchemaMismatch {
        /// Version found in `store_meta`.
        found: i64,
        /// Version this build expects.
        expected: i64,
    },
}

impl From<SqliteStoreError> for StoreError {
    fn from(err: SqliteStoreError) -> Self {
        Self::Store(err.to_string())
    }
}

impl From<rusqlite::Error> for SqliteStoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Db(err.to_string())
    }
}
