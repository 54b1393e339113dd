// crates/arre-server/src/state.rs
// ============================================================================
// Module: Application State
// Description: The shared, cloneable handle every axum route extracts.
// Purpose: Give handlers access to the dispatcher and the stores it was
//          built from, plus the deployment's auth and deadline policy.
// Dependencies: arre-core, arre-engine
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arre_core::AlertStore;
use arre_core::FlagStore;
use arre_engine::DeadlineConfig;
use arre_engine::Dispatcher;

use crate::config::AuthConfig;

/// Shared state cloned into every request handler.
///
/// Cloning is cheap: every field is an `Arc` or a small value type, matching
/// axum's requirement that `State<T>` implement `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// The routing engine.
    pub dispatcher: Arc<Dispatcher>,
    /// Direct flag access for `/setFlags` and `/getAdminSettingsFlags`,
    /// which do not go through the dispatcher.
    pub flag_store: Arc<dyn FlagStore>,
    /// Direct alert store access for the operator query/stats routes.
    pub alert_store: Arc<dyn AlertStore>,
    /// Authentication mode.
    pub auth: Arc<AuthConfig>,
    /// Deadline budget applied per [`arre_core::IncidentResponseMode`].
    pub deadlines: DeadlineConfig,
    /// Deployment-routing workspace identifier forwarded to collaborators.
    pub workspace: Arc<str>,
}
