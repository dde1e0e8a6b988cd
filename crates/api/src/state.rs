use std::sync::Arc;

use crate::config::ServerConfig;
use crate::coordinator::LockCoordinator;
use crate::partitions::PartitionRegistry;
use crate::ws::WsManager;

/// Shared application state available to all Axum handlers via `State<AppState>`.
///
/// This is cheaply cloneable (inner data is behind `Arc`).
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub pool: filehub_db::DbPool,
    /// Server configuration (accessed by middleware and handlers).
    pub config: Arc<ServerConfig>,
    /// WebSocket connection manager (sessions and file rooms).
    pub ws_manager: Arc<WsManager>,
    /// In-memory partition topology.
    pub partitions: Arc<PartitionRegistry>,
    /// Centralized event bus for publishing lock/file events.
    pub event_bus: Arc<filehub_events::EventBus>,
    /// The lock coordinator, shared by the WebSocket and REST transports.
    pub coordinator: Arc<LockCoordinator>,
}
