//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] is the central publish/subscribe hub for [`HubEvent`]s.
//! The audit sink and the WebSocket broadcast router subscribe
//! independently; it is designed to be shared via `Arc<EventBus>`.

use filehub_core::locking::LockOwner;
use filehub_core::types::Timestamp;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// HubEvent
// ---------------------------------------------------------------------------

/// Something that happened to the shared lock/file/partition state.
///
/// Constructed via [`HubEvent::new`] and enriched with the builder methods.
/// Event names come from `filehub_core::audit::events`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubEvent {
    /// Dot-separated event name, e.g. `"lock.acquired"`.
    pub event_type: String,

    /// The file the event concerns, if any.
    pub file_id: Option<String>,

    /// Display name of that file.
    pub filename: Option<String>,

    /// The verified identity that triggered the event.
    pub actor: Option<LockOwner>,

    /// The connection the event originated from. Used by the broadcast
    /// router to exclude the sender where the protocol requires it.
    pub origin_connection: Option<String>,

    /// Free-form JSON payload carrying event-specific data.
    pub payload: serde_json::Value,

    /// When the event was created (UTC).
    pub timestamp: Timestamp,
}

impl HubEvent {
    /// Create a new event with only the required `event_type`.
    pub fn new(event_type: impl Into<String>) -> Self {
        Self {
            event_type: event_type.into(),
            file_id: None,
            filename: None,
            actor: None,
            origin_connection: None,
            payload: serde_json::Value::Object(Default::default()),
            timestamp: chrono::Utc::now(),
        }
    }

    /// Attach the file the event concerns.
    pub fn with_file(mut self, file_id: impl Into<String>, filename: impl Into<String>) -> Self {
        self.file_id = Some(file_id.into());
        self.filename = Some(filename.into());
        self
    }

    /// Attach the acting identity.
    pub fn with_actor(mut self, actor: LockOwner) -> Self {
        self.actor = Some(actor);
        self
    }

    /// Attach the originating connection.
    pub fn with_origin(mut self, connection_id: impl Into<String>) -> Self {
        self.origin_connection = Some(connection_id.into());
        self
    }

    /// Set the JSON payload.
    pub fn with_payload(mut self, payload: serde_json::Value) -> Self {
        self.payload = payload;
        self
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// Wraps a [`broadcast::Sender`] so that any number of subscribers can
/// independently receive every published [`HubEvent`].
pub struct EventBus {
    sender: broadcast::Sender<HubEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest un-consumed messages are dropped
    /// and slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With zero subscribers the event is silently dropped.
    pub fn publish(&self, event: HubEvent) {
        // SendError only means there are no receivers.
        let _ = self.sender.send(event);
    }

    /// Subscribe to all events published on this bus.
    pub fn subscribe(&self) -> broadcast::Receiver<HubEvent> {
        self.sender.subscribe()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
