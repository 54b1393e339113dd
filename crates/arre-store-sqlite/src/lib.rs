// crates/arre-store-sqlite/src/lib.rs
// ============================================================================
// Module: ARRE SQLite Store
// Description: Durable AlertStore and FlagStore sharing one SQLite file.
// Purpose: Public entry point wiring connection setup, schema
//          initialization, and the two store implementations together.
// Dependencies: arre-core, rusqlite
// ============================================================================

//! ## Overview
//! [`ArreSqliteStore::open`] validates the configured path, opens the
//! connection with the durability pragmas `spec.md` §5's shared-resource
//! policy calls for, and initializes the schema on first use. The alert
//! store and flag store share the single connection behind a `Mutex`,
//! mirroring the donor's one-connection-per-file `decision-gate-store-sqlite`
//! pattern rather than pooling — `SQLite`'s own locking plus `busy_timeout`
//! absorbs the concurrency `arre-server` needs.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod alert_store;
mod config;
mod connection;
mod error;
mod flag_store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use alert_store::SqliteAlertStore;
pub use config::SqliteJournalMode;
pub use config::SqliteStoreConfig;
pub use config::SqliteSyncMode;
pub use error::SqliteStoreError;
pub use flag_store::SqliteFlagStore;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use rusqlite::Connection;

// ============================================================================
// SECTION: Store Handle
// ============================================================================

/// Opens and owns the shared `SQLite` connection backing both stores.
pub struct ArreSqliteStore {
    connection: Arc<Mutex<Connection>>,
}

impl ArreSqliteStore {
    /// Opens (creating if absent) the database at `config.path`, applies
    /// durability pragmas, and initializes or validates the schema.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the path is unsafe, the file
    /// cannot be opened, or an existing schema version does not match what
    /// this build expects.
    pub fn open(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        let mut connection = connection::open_connection(&config)?;
        connection::initialize_schema(&mut connection)?;
        Ok(Self {
            connection: Arc::new(Mutex::new(connection)),
        })
    }

    /// Returns the `AlertStore` view over this database.
    #[must_use]
    pub fn alert_store(&self) -> Arc<SqliteAlertStore> {
        Arc::new(SqliteAlertStore::new(Arc::clone(&self.connection)))
    }

    /// Returns the `FlagStore` view over this database.
    #[must_use]
    pub fn flag_store(&self) -> Arc<SqliteFlagStore> {
        Arc::new(SqliteFlagStore::new(Arc::clone(&self.connection)))
    }
}
