use std::sync::Arc;

use lexiport_events::ProgressBus;
use lexiport_pipeline::ChunkExecutor;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc` or is already `Clone`).
#[derive(Clone)]
pub struct AppState {
    /// Queue/ledger database connection pool.
    pub pool: lexiport_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Per-run progress broadcaster feeding the SSE streams.
    pub bus: Arc<ProgressBus>,
    /// Chunk executor shared by the worker loop and the manual chunk
    /// endpoint.
    pub executor: Arc<ChunkExecutor>,
}
