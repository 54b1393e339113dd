// crates/arre-store-sqlite/src/connection.rs
// ============================================================================
// Module: SQLite Connection Setup
// Description: Path validation, pragma application, and schema
//              initialization shared by the alert and flag stores.
// Purpose: Keep the one mutable connection both stores share correctly
//          configured for concurrent readers and durable writes.
// Dependencies: rusqlite
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;

use rusqlite::params;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;

use crate::config::SqliteStoreConfig;
use crate::error::SqliteStoreError;

/// Schema version written to `store_meta` on first initialization.
const SCHEMA_VERSION: i64 = 1;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

// ============================================================================
// SECTION: Path Validation
// ============================================================================

/// Validates store paths for safety limits.
pub(crate) fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    if path.as_os_str().is_empty() {
        return Err(SqliteStoreError::Invalid("store path must not be empty".to_string()));
    }
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid("store path contains an overlong component".to_string()));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid("store path must be a file, not a directory".to_string()));
    }
    Ok(())
}

/// Creates the parent directory of `path` if it does not already exist.
pub(crate) fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

// ============================================================================
// SECTION: Connection Opening
// ============================================================================

/// Opens a connection with secure defaults and applies durability pragmas.
pub(crate) fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    validate_store_path(&config.path)?;
    ensure_parent_dir(&config.path)?;
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability and concurrency.
fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection.execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection.execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    connection.busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))?;
    Ok(())
}

// ============================================================================
// SECTION: Schema Initialization
// ============================================================================

/// Creates the schema on first use, or validates the existing version.
pub(crate) fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction()?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx.query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0)).optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS alert_records (
                    id TEXT PRIMARY KEY,
                    source TEXT NOT NULL,
                    alert_name TEXT NOT NULL,
                    selection_mode TEXT NOT NULL,
                    severity TEXT NOT NULL,
                    status TEXT NOT NULL,
                    annotation_text TEXT NOT NULL,
                    received_at_ms INTEGER NOT NULL,
                    record_json BLOB NOT NULL
                );
                CREATE INDEX IF NOT EXISTS idx_alert_records_received_at ON alert_records (received_at_ms DESC);
                CREATE INDEX IF NOT EXISTS idx_alert_records_selection_mode ON alert_records (selection_mode);

                CREATE TABLE IF NOT EXISTS flags (
                    id INTEGER PRIMARY KEY CHECK (id = 0),
                    incident_response_mode TEXT NOT NULL
                );",
            )?;
            tx.execute(
                "INSERT INTO flags (id, incident_response_mode) VALUES (0, ?1)",
                params![arre_core::IncidentResponseMode::DEFAULT.as_str()],
            )?;
        }
        Some(found) if found != SCHEMA_VERSION => {
            return Err(SqliteStoreError::SchemaMismatch {
                found,
                expected: SCHEMA_VERSION,
            });
        }
        Some(_) => {}
    }
    tx.commit()?;
    Ok(())
}
