//! WebSocket upgrade handler and per-connection message loop.
//!
//! Clients authenticate with a `?token=` query parameter (browsers cannot
//! set headers on WebSocket upgrades). After the upgrade the connection is
//! registered with [`WsManager`], receives the current partition topology
//! and lock table, and then exchanges [`ClientMessage`]/[`ServerMessage`]
//! frames until it disconnects. Every lock the connection holds is vacated
//! on disconnect, however the connection ended.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use filehub_core::error::LockError;
use filehub_core::locking::LockOwner;
use filehub_core::protocol::{ClientMessage, ServerMessage};
use filehub_core::roles::ROLE_ADMIN;

use crate::auth::jwt::validate_token;
use crate::coordinator::LockCaller;
use crate::error::AppError;
use crate::state::AppState;
use crate::ws::manager::WsManager;

/// Query parameters accepted by the WebSocket upgrade endpoint.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: String,
}

/// HTTP handler that authenticates and upgrades the connection.
///
/// Rejects with 401 before the upgrade when the token is missing, invalid,
/// or expired.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
    State(state): State<AppState>,
) -> Result<impl IntoResponse, AppError> {
    let claims = validate_token(&query.token, &state.config.jwt)
        .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;

    let owner = LockOwner {
        id: claims.sub,
        email: claims.email,
        display_name: claims.name,
    };
    let admin = claims.role == ROLE_ADMIN;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, state, owner, admin)))
}

/// Manage a single WebSocket connection after upgrade.
///
/// Splits the socket into a sink (outbound) and stream (inbound), then:
///   1. Registers the connection with `WsManager`.
///   2. Sends the initial topology and lock-table snapshots.
///   3. Spawns a sender task that forwards messages from the manager channel.
///   4. Dispatches inbound messages on the current task.
///   5. Vacates the connection's locks and deregisters on disconnect.
async fn handle_socket(socket: WebSocket, state: AppState, owner: LockOwner, admin: bool) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    tracing::info!(conn_id = %conn_id, user_id = owner.id, "WebSocket connected");

    let mut rx = state.ws_manager.add(conn_id.clone(), owner.clone()).await;
    record_metrics(&state).await;

    let (mut sink, mut stream) = socket.split();

    // Sender task: forward channel messages to the WebSocket sink.
    let sender_conn_id = conn_id.clone();
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if sink.send(msg).await.is_err() {
                tracing::debug!(conn_id = %sender_conn_id, "WebSocket sink closed");
                break;
            }
        }
    });

    send_initial_snapshots(&state, &conn_id).await;

    let caller = LockCaller::new(owner.clone(), Some(conn_id.clone()), admin);

    // Receiver loop: dispatch inbound messages.
    while let Some(result) = stream.next().await {
        match result {
            Ok(Message::Close(_)) => break,
            Ok(Message::Pong(_)) => {
                tracing::trace!(conn_id = %conn_id, "Pong received");
            }
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(msg) => dispatch(&state, &caller, &conn_id, msg).await,
                Err(e) => {
                    tracing::debug!(conn_id = %conn_id, error = %e, "Unparseable client message");
                    send(
                        &state.ws_manager,
                        &conn_id,
                        &ServerMessage::Error {
                            code: "BAD_MESSAGE".to_string(),
                            message: format!("Could not parse message: {e}"),
                        },
                    )
                    .await;
                }
            },
            Ok(_) => {
                // Binary/Ping frames carry no protocol meaning.
            }
            Err(e) => {
                tracing::debug!(conn_id = %conn_id, error = %e, "WebSocket receive error");
                break;
            }
        }
    }

    // Disconnect cleanup: vacate locks first so the resulting broadcast
    // does not target the departed connection.
    if let Err(e) = state.coordinator.release_all_for_connection(&conn_id).await {
        tracing::error!(conn_id = %conn_id, error = %e, "Disconnect lock cleanup failed");
    }
    state.ws_manager.remove(&conn_id).await;
    record_metrics(&state).await;
    send_task.abort();
    tracing::info!(conn_id = %conn_id, user_id = owner.id, "WebSocket disconnected");
}

/// Snapshot metrics immediately so session changes show up without waiting
/// for the sampler's next tick.
async fn record_metrics(state: &AppState) {
    if let Err(e) =
        crate::background::metrics_sampler::sample_now(&state.pool, &state.ws_manager, &state.event_bus)
            .await
    {
        tracing::warn!(error = %e, "Metrics snapshot on session change failed");
    }
}

/// Deliver the partition topology and current lock table to a connection
/// that just joined.
async fn send_initial_snapshots(state: &AppState, conn_id: &str) {
    let partitions = state.partitions.list().await;
    send(
        &state.ws_manager,
        conn_id,
        &ServerMessage::PartitionTopology { partitions },
    )
    .await;

    match state.coordinator.list_locks().await {
        Ok(locks) => {
            send(&state.ws_manager, conn_id, &ServerMessage::LockState { locks }).await;
        }
        Err(e) => {
            tracing::error!(conn_id = %conn_id, error = %e, "Failed to load initial lock table");
        }
    }
}

/// Handle one parsed client message.
async fn dispatch(state: &AppState, caller: &LockCaller, conn_id: &str, msg: ClientMessage) {
    match msg {
        ClientMessage::JoinFile {
            file_id,
            filename,
            kind,
            server_id,
        } => {
            match state
                .coordinator
                .acquire(caller, &file_id, filename.as_deref(), kind, server_id.as_deref())
                .await
            {
                Ok(outcome) => {
                    state.ws_manager.join_room(&file_id, conn_id).await;
                    send(
                        &state.ws_manager,
                        conn_id,
                        &ServerMessage::FileJoined {
                            file_id,
                            kind: outcome.lock.kind(),
                        },
                    )
                    .await;
                }
                Err(AppError::Lock(LockError::HeldByOther { file_id, holder, kind })) => {
                    send(
                        &state.ws_manager,
                        conn_id,
                        &ServerMessage::LockDenied {
                            file_id,
                            holder,
                            kind,
                        },
                    )
                    .await;
                }
                Err(e) => send_error(&state.ws_manager, conn_id, &e).await,
            }
        }

        ClientMessage::LeaveFile { file_id } => {
            if let Err(e) = state.coordinator.release(caller, &file_id).await {
                send_error(&state.ws_manager, conn_id, &e).await;
            }
            state.ws_manager.leave_room(&file_id, conn_id).await;
        }

        ClientMessage::UpgradeLock { file_id } => {
            match state.coordinator.upgrade(caller, &file_id).await {
                Ok(_) => {
                    send(
                        &state.ws_manager,
                        conn_id,
                        &ServerMessage::LockUpgraded { file_id },
                    )
                    .await;
                }
                Err(e) => send_error(&state.ws_manager, conn_id, &e).await,
            }
        }

        ClientMessage::ContentChange { file_id, content } => {
            match state.coordinator.apply_edit(caller, &file_id).await {
                Ok(_) => {
                    let update = ServerMessage::ContentUpdated {
                        file_id: file_id.clone(),
                        content,
                        user: caller.owner.clone(),
                    };
                    if let Ok(json) = serde_json::to_string(&update) {
                        state
                            .ws_manager
                            .broadcast_to_room(&file_id, Message::Text(json.into()), Some(conn_id))
                            .await;
                    }
                }
                Err(AppError::Lock(LockError::EditDenied(file_id))) => {
                    send(
                        &state.ws_manager,
                        conn_id,
                        &ServerMessage::EditDenied { file_id },
                    )
                    .await;
                }
                Err(e) => send_error(&state.ws_manager, conn_id, &e).await,
            }
        }
    }
}

/// Serialize and push a server message to one connection.
async fn send(manager: &Arc<WsManager>, conn_id: &str, msg: &ServerMessage) {
    match serde_json::to_string(msg) {
        Ok(json) => {
            manager
                .send_to_connection(conn_id, Message::Text(json.into()))
                .await;
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to serialize server message");
        }
    }
}

/// Report a failure back to the originating connection only.
async fn send_error(manager: &Arc<WsManager>, conn_id: &str, error: &AppError) {
    send(
        manager,
        conn_id,
        &ServerMessage::Error {
            code: error.code().to_string(),
            message: error.to_string(),
        },
    )
    .await;
}
