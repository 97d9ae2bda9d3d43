use std::sync::Arc;

use postframe_pipeline::TriggerDispatcher;

use crate::config::ServerConfig;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything is behind `Arc` or already `Clone`.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: postframe_db::DbPool,
    /// Server configuration.
    pub config: Arc<ServerConfig>,
    /// Runs or queues the mapping work for an entity save.
    pub dispatcher: Arc<TriggerDispatcher>,
    /// Event bus for platform events.
    pub event_bus: Arc<postframe_events::EventBus>,
}
