use std::sync::Arc;

use jacport_events::JobRegistry;
use jacport_pipeline::Pipeline;
use tokio_util::task::TaskTracker;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or is already a handle.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ServerConfig>,
    /// Job registry, owned for the lifetime of the process.
    pub registry: Arc<JobRegistry>,
    pub pipeline: Arc<Pipeline>,
    /// Tracks spawned pipeline runs so shutdown can wait for them.
    pub tasks: TaskTracker,
}
