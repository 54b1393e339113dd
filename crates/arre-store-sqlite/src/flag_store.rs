// crates/arre-store-sqlite/src/flag_store.rs
// ============================================================================
// Module: SQLite Flag Store
// Description: Durable backing for the single administrative flags
//              document, §4.1.
// Purpose: Back `arre_core::interfaces::FlagStore` with the same SQLite
//          file the alert store uses, so `incident_response_mode` survives
//          a server restart.
// Dependencies: arre-core, rusqlite
// ============================================================================

//! ## Overview
//! The `flags` table holds exactly one row (`id = 0`, enforced by a CHECK
//! constraint). `get_flags` is a plain read under the shared connection
//! mutex; `set_flags` validates the caller's admin capability before
//! touching the row, matching `spec.md` §4.1.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;

use arre_core::FlagError;
use arre_core::FlagSnapshot;
use arre_core::FlagStore;
use arre_core::FlagUpdate;
use arre_core::IncidentResponseMode;
use arre_core::Principal;
use rusqlite::params;
use rusqlite::Connection;

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed [`FlagStore`].
pub struct SqliteFlagStore {
    connection: Arc<Mutex<Connection>>,
}

impl SqliteFlagStore {
    /// Wraps an already-initialized connection.
    pub(crate) fn new(connection: Arc<Mutex<Connection>>) -> Self {
        Self { connection }
    }
}

impl FlagStore for SqliteFlagStore {
    fn get_flags(&self) -> FlagSnapshot {
        let connection = self.connection.lock().unwrap_or_else(|poison| poison.into_inner());
        let mode: String = connection
            .query_row("SELECT incident_response_mode FROM flags WHERE id = 0", params![], |row| row.get(0))
            .unwrap_or_else(|_| IncidentResponseMode::DEFAULT.as_str().to_string());
        FlagSnapshot {
            incident_response_mode: mode.parse().unwrap_or(IncidentResponseMode::DEFAULT),
        }
    }

    fn set_flags(&self, principal: &Principal, update: FlagUpdate) -> Result<FlagSnapshot, FlagError> {
        if !principal.is_admin {
            return Err(FlagError::PermissionDenied);
        }
        let Some(raw) = update.incident_response_mode else {
            return Ok(self.get_flags());
        };
        let mode: IncidentResponseMode = raw.parse().map_err(|_| FlagError::InvalidValue(raw.clone()))?;

        let connection = self.connection.lock().unwrap_or_else(|poison| poison.into_inner());
        connection
            .execute(
                "UPDATE flags SET incident_response_mode = ?1 WHERE id = 0",
                params![mode.as_str()],
            )
            .map_err(|err| FlagError::InvalidValue(err.to_string()))?;
        Ok(FlagSnapshot {
            incident_response_mode: mode,
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;
    use crate::ArreSqliteStore;
    use crate::SqliteStoreConfig;

    #[test]
    fn defaults_to_deterministic_on_first_boot() {
        let dir = tempdir().unwrap();
        let store = ArreSqliteStore::open(SqliteStoreConfig::new(dir.path().join("arre.db"))).unwrap();
        let flags = store.flag_store().get_flags();
        assert_eq!(flags.incident_response_mode, IncidentResponseMode::Deterministic);
    }

    #[test]
    fn set_flags_rejects_non_admin_and_invalid_values() {
        let dir = tempdir().unwrap();
        let store = ArreSqliteStore::open(SqliteStoreConfig::new(dir.path().join("arre.db"))).unwrap();
        let flag_store = store.flag_store();

        let denied = flag_store.set_flags(
            &Principal::non_admin("u1"),
            FlagUpdate {
                incident_response_mode: Some("autonomous".to_string()),
            },
        );
        assert!(matches!(denied, Err(FlagError::PermissionDenied)));

        let invalid = flag_store.set_flags(
            &Principal::admin("root"),
            FlagUpdate {
                incident_response_mode: Some("bogus".to_string()),
            },
        );
        assert!(matches!(invalid, Err(FlagError::InvalidValue(_))));

        let applied = flag_store
            .set_flags(
                &Principal::admin("root"),
                FlagUpdate {
                    incident_response_mode: Some("autonomous".to_string()),
                },
            )
            .unwrap();
        assert_eq!(applied.incident_response_mode, IncidentResponseMode::Autonomous);
        assert_eq!(flag_store.get_flags().incident_response_mode, IncidentResponseMode::Autonomous);
    }
}
