// [apps/gateway/src/handlers/stream.rs]
//! GET /api/v1/stream — the dashboard WebSocket upgrade (§4.7.1).
//! Generalizes the teacher's three-task-per-socket shape
//! (`handlers/stream.rs`: an internal worker, a downstream sender racing
//! a keepalive ping against the event bus, and an upstream reader) to
//! room-filtered broadcast: a socket only receives `RoomEvent`s whose
//! room list intersects its own subscribed-room set, and every
//! subscribe/unsubscribe request is checked against the connecting
//! tenant before being honored.

use std::collections::HashSet;
use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::services::subscription_hub::{site_room, tenant_room, unit_room};
use crate::state::AppState;
use crate::tenant::TenantId;

const KEEPALIVE_INTERVAL_SECONDS: u64 = 25;
const COMMAND_BUFFER_CAPACITY: usize = 32;

#[derive(Debug, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ClientCommand {
    Subscribe { scope: RoomScope },
    Unsubscribe { scope: RoomScope },
}

#[derive(Debug, Deserialize)]
#[serde(tag = "level", rename_all = "snake_case")]
enum RoomScope {
    Site { site_id: String },
    Unit { unit_id: String },
}

#[instrument(skip(websocket_upgrade, state), fields(tenant_id = %tenant.0))]
pub async fn establish_stream(
    websocket_upgrade: WebSocketUpgrade,
    State(state): State<AppState>,
    tenant: TenantId,
) -> impl IntoResponse {
    websocket_upgrade.on_upgrade(move |socket| handle_socket(socket, state, tenant.0))
}

async fn handle_socket(socket: WebSocket, state: AppState, tenant_id: String) {
    let (mut socket_sender, mut socket_receiver) = socket.split();
    let mut hub_subscriber = state.hub.subscribe();

    let session_id = Uuid::new_v4().to_string();
    debug!(session_id = %session_id, tenant_id = %tenant_id, "stream socket opened");

    // Every socket is implicitly a member of its own tenant room; the
    // client layers in site/unit rooms on top via subscribe commands.
    let subscribed_rooms: Arc<RwLock<HashSet<String>>> = Arc::new(RwLock::new(HashSet::from([tenant_room(&tenant_id)])));

    let (command_sender, mut command_receiver) = mpsc::channel::<String>(COMMAND_BUFFER_CAPACITY);

    let worker_rooms = subscribed_rooms.clone();
    let worker_tenant_id = tenant_id.clone();
    let worker_session_id = session_id.clone();
    let mut worker_task = tokio::spawn(async move {
        while let Some(raw_command) = command_receiver.recv().await {
            match serde_json::from_str::<ClientCommand>(&raw_command) {
                Ok(ClientCommand::Subscribe { scope }) => {
                    let room = room_for_scope(&worker_tenant_id, &scope);
                    worker_rooms.write().await.insert(room);
                }
                Ok(ClientCommand::Unsubscribe { scope }) => {
                    let room = room_for_scope(&worker_tenant_id, &scope);
                    worker_rooms.write().await.remove(&room);
                }
                Err(error) => {
                    warn!(session_id = %worker_session_id, %error, "ignoring malformed stream command");
                }
            }
        }
    });

    let downstream_rooms = subscribed_rooms.clone();
    let downstream_session_id = session_id.clone();
    let mut downstream_task = tokio::spawn(async move {
        let mut keepalive = interval(Duration::from_secs(KEEPALIVE_INTERVAL_SECONDS));

        loop {
            tokio::select! {
                _ = keepalive.tick() => {
                    if socket_sender.send(Message::Ping(Vec::new())).await.is_err() {
                        break;
                    }
                }
                event = hub_subscriber.recv() => {
                    match event {
                        Ok(room_event) => {
                            let rooms = downstream_rooms.read().await;
                            if !room_event.rooms.iter().any(|room| rooms.contains(room)) {
                                continue;
                            }
                            drop(rooms);

                            let envelope = serde_json::json!({
                                "event": room_event.event,
                                "payload": room_event.payload,
                            });
                            if socket_sender.send(Message::Text(envelope.to_string())).await.is_err() {
                                warn!(session_id = %downstream_session_id, "stream send failed, closing socket");
                                break;
                            }
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Lagged(missed)) => {
                            warn!(session_id = %downstream_session_id, missed, "stream subscriber lagged, frames dropped");
                        }
                        Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                            warn!(session_id = %downstream_session_id, "subscription hub closed");
                            break;
                        }
                    }
                }
            }
        }
    });

    let upstream_session_id = session_id.clone();
    let mut upstream_task = tokio::spawn(async move {
        while let Some(message) = socket_receiver.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    if command_sender.send(text).await.is_err() {
                        break;
                    }
                }
                Ok(Message::Close(_)) => break,
                Err(error) => {
                    warn!(session_id = %upstream_session_id, %error, "stream socket read error");
                    break;
                }
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = &mut downstream_task => {
            upstream_task.abort();
            worker_task.abort();
        }
        _ = &mut upstream_task => {
            downstream_task.abort();
            worker_task.abort();
        }
        _ = &mut worker_task => {
            downstream_task.abort();
            upstream_task.abort();
        }
    }

    debug!(session_id = %session_id, "stream socket closed");
}

fn room_for_scope(tenant_id: &str, scope: &RoomScope) -> String {
    match scope {
        RoomScope::Site { site_id } => site_room(tenant_id, site_id),
        RoomScope::Unit { unit_id } => unit_room(tenant_id, unit_id),
    }
}
