// crates/arre-server/src/lib.rs
// ============================================================================
// Module: ARRE HTTP Server
// Description: Wires arre-core, arre-engine, arre-providers, and
//              arre-store-sqlite into the §6.1 HTTP surface.
// Purpose: The only crate that knows about HTTP, SQLite, and the live
//          outbound adapters at the same time.
// Dependencies: arre-core, arre-engine, arre-providers, arre-store-sqlite,
//               axum, tokio, tracing
// ============================================================================

//! ## Overview
//! [`run`] loads configuration, opens the `SQLite` store, builds the HTTP
//! provider adapters, constructs the [`arre_engine::Dispatcher`], and serves
//! the router returned by [`routes::build_router`] until `Ctrl-C` or the
//! host's shutdown signal arrives.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod auth;
pub mod config;
pub mod error;
pub mod response;
pub mod routes;
pub mod state;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::ConfigError;
pub use config::ServerConfig;
pub use error::ApiError;
pub use state::AppState;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use arre_engine::Dispatcher;
use arre_providers::HttpJobSubmitter;
use arre_providers::HttpLlmAdapter;
use arre_providers::HttpTaskStore;
use arre_providers::HttpVectorSearch;
use arre_store_sqlite::ArreSqliteStore;
use tokio::net::TcpListener;

// ============================================================================
// SECTION: Server Startup
// ============================================================================

/// Builds every collaborator named in `config` and returns the
/// fully-wired [`AppState`], without binding a listener.
///
/// Useful on its own for integration tests that drive the router with
/// `tower::ServiceExt::oneshot` rather than a live socket.
///
/// # Errors
///
/// Returns an error when the `SQLite` store cannot be opened or an HTTP
/// provider's client cannot be constructed.
pub fn build_state(config: &ServerConfig) -> anyhow::Result<AppState> {
    let store = ArreSqliteStore::open(config.sqlite.clone())?;
    let flag_store = store.flag_store();
    let alert_store = store.alert_store();

    let task_store = Arc::new(HttpTaskStore::new(config.task_store.clone())?);
    let vector_search = Arc::new(HttpVectorSearch::new(config.vector_search.clone())?);
    let llm = Arc::new(HttpLlmAdapter::new(config.llm.clone())?);
    let job_submitter = Arc::new(HttpJobSubmitter::new(config.job_submitter.clone())?);

    let dispatcher = Arc::new(Dispatcher::new(
        flag_store.clone() as Arc<dyn arre_core::FlagStore>,
        task_store,
        vector_search,
        llm,
        job_submitter,
        alert_store.clone() as Arc<dyn arre_core::AlertStore>,
        config.engine_config(),
    ));

    Ok(AppState {
        dispatcher,
        flag_store,
        alert_store,
        auth: Arc::new(config.auth.clone()),
        deadlines: config.engine_config().deadlines,
        workspace: Arc::from(config.workspace.as_str()),
    })
}

/// Builds the server from `config` and serves it until shutdown.
///
/// # Errors
///
/// Returns an error when collaborator construction fails, the configured
/// address cannot be bound, or the server exits abnormally.
pub async fn run(config: ServerConfig) -> anyhow::Result<()> {
    let bind_addr = config.bind_addr.clone();
    let state = build_state(&config)?;
    let router = routes::build_router(state);

    tracing::info!(%bind_addr, "arre-server listening");
    let listener = TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, router).with_graceful_shutdown(shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(err) => tracing::error!(%err, "failed to install ctrl-c handler"),
    }
}
