// crates/arre-providers/src/lib.rs
// ============================================================================
// Module: ARRE HTTP Providers
// Description: Blocking reqwest-based adapters for every outbound
//              collaborator trait in arre-core::interfaces.
// Purpose: Production implementations of TaskStore, VectorSearch,
//          LlmAdapter, and JobSubmitter over plain JSON/HTTP.
// Dependencies: arre-core, reqwest, serde, serde_json, thiserror, tracing
// ============================================================================

//! ## Overview
//! Every adapter here is synchronous, matching the trait surfaces in
//! `arre_core::interfaces`: they block the calling thread for the duration
//! of the outbound call, bounded by the caller's [`arre_core::Deadline`].
//! The HTTP server crate is expected to run the dispatcher on a blocking
//! thread pool rather than the async reactor thread (see
//! `arre-server`'s request handling).

pub mod config;
pub mod job_submitter;
pub mod llm;
pub mod task_store;
pub mod vector_search;

pub use config::HttpProviderConfig;
pub use job_submitter::HttpJobSubmitter;
pub use llm::HttpLlmAdapter;
pub use task_store::HttpTaskStore;
pub use vector_search::HttpVectorSearch;
