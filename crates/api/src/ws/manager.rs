use std::collections::{HashMap, HashSet};

use axum::body::Bytes;
use axum::extract::ws::Message;
use tokio::sync::{mpsc, RwLock};

use filehub_core::locking::LockOwner;
use filehub_core::types::{DbId, Timestamp};

/// Channel sender half for pushing messages to a WebSocket connection.
pub type WsSender = mpsc::UnboundedSender<Message>;

/// Metadata for a single WebSocket connection.
pub struct WsConnection {
    /// The authenticated identity behind the connection.
    pub user: LockOwner,
    /// Channel sender for outbound messages to this connection.
    pub sender: WsSender,
    /// When this connection was established.
    pub connected_at: Timestamp,
}

/// Manages all active WebSocket connections and their file rooms.
///
/// A room groups the connections currently collaborating on one file;
/// content updates are delivered room-scoped, excluding the sender.
/// Thread-safe via interior `RwLock`; designed to be wrapped in `Arc` and
/// shared across the application.
pub struct WsManager {
    connections: RwLock<HashMap<String, WsConnection>>,
    /// file_id -> member connection ids.
    rooms: RwLock<HashMap<String, HashSet<String>>>,
}

impl WsManager {
    /// Create a new, empty connection manager.
    pub fn new() -> Self {
        Self {
            connections: RwLock::new(HashMap::new()),
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Register a new connection.
    ///
    /// Returns the receiver half of the message channel so the caller can
    /// forward messages to the WebSocket sink.
    pub async fn add(&self, conn_id: String, user: LockOwner) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let conn = WsConnection {
            user,
            sender: tx,
            connected_at: chrono::Utc::now(),
        };
        self.connections.write().await.insert(conn_id, conn);
        rx
    }

    /// Remove a connection and evict it from every room it joined.
    pub async fn remove(&self, conn_id: &str) {
        self.connections.write().await.remove(conn_id);
        let mut rooms = self.rooms.write().await;
        rooms.retain(|_, members| {
            members.remove(conn_id);
            !members.is_empty()
        });
    }

    /// Add a connection to a file's room.
    pub async fn join_room(&self, file_id: &str, conn_id: &str) {
        self.rooms
            .write()
            .await
            .entry(file_id.to_string())
            .or_default()
            .insert(conn_id.to_string());
    }

    /// Remove a connection from a file's room. Empty rooms are dropped.
    pub async fn leave_room(&self, file_id: &str, conn_id: &str) {
        let mut rooms = self.rooms.write().await;
        if let Some(members) = rooms.get_mut(file_id) {
            members.remove(conn_id);
            if members.is_empty() {
                rooms.remove(file_id);
            }
        }
    }

    /// Current members of a file's room.
    pub async fn room_members(&self, file_id: &str) -> Vec<String> {
        self.rooms
            .read()
            .await
            .get(file_id)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Broadcast a message to all connected clients.
    ///
    /// Connections whose send channels are closed are silently skipped
    /// (they will be cleaned up on their next receive loop iteration).
    pub async fn broadcast(&self, message: Message) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(message.clone());
        }
    }

    /// Send a message to every member of a file's room, optionally
    /// excluding one connection (typically the sender of a content change).
    ///
    /// Returns the number of connections the message was sent to.
    pub async fn broadcast_to_room(
        &self,
        file_id: &str,
        message: Message,
        exclude: Option<&str>,
    ) -> usize {
        let members = self.room_members(file_id).await;
        let conns = self.connections.read().await;
        let mut count = 0;
        for member in &members {
            if exclude == Some(member.as_str()) {
                continue;
            }
            if let Some(conn) = conns.get(member) {
                let _ = conn.sender.send(message.clone());
                count += 1;
            }
        }
        count
    }

    /// Send a message to one connection. Returns `false` if the connection
    /// is unknown or its channel is closed.
    pub async fn send_to_connection(&self, conn_id: &str, message: Message) -> bool {
        let conns = self.connections.read().await;
        match conns.get(conn_id) {
            Some(conn) => conn.sender.send(message).is_ok(),
            None => false,
        }
    }

    /// Return the current number of active connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Return the number of distinct authenticated users currently
    /// connected (a user may hold several connections).
    pub async fn user_count(&self) -> usize {
        let conns = self.connections.read().await;
        let users: HashSet<DbId> = conns.values().map(|c| c.user.id).collect();
        users.len()
    }

    /// Send a Close frame to every connection, then clear the map.
    ///
    /// Used during graceful shutdown to notify all clients before the
    /// server stops accepting new connections.
    pub async fn shutdown_all(&self) {
        let mut conns = self.connections.write().await;
        let count = conns.len();
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Close(None));
        }
        conns.clear();
        self.rooms.write().await.clear();
        tracing::info!(count, "Closed all WebSocket connections");
    }

    /// Send a Ping frame to every connected client.
    ///
    /// Used by the heartbeat task to keep connections alive and detect
    /// stale ones.
    pub async fn ping_all(&self) {
        let conns = self.connections.read().await;
        for conn in conns.values() {
            let _ = conn.sender.send(Message::Ping(Bytes::new()));
        }
    }
}

impl Default for WsManager {
    fn default() -> Self {
        Self::new()
    }
}
