//! WebSocket endpoint: connection lifecycle and client-message handling.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use bugle_core::ClientMessage;
use futures::{sink::SinkExt, stream::StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::state::AppState;

/// WebSocket upgrade handler.
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle one client connection from accept to teardown.
///
/// The connection id is fresh per transport session: a client that
/// reconnects gets a new id and must re-join its room explicitly.
async fn handle_socket(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4().to_string();
    let (tx, mut rx) = mpsc::unbounded_channel();
    state.registry.register(&connection_id, tx);
    info!(
        connection_id = %connection_id,
        connections = state.registry.len(),
        "client connected"
    );

    let (mut sender, mut receiver) = socket.split();

    // Forward dispatched events to this client.
    let send_task = {
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                let frame = match serde_json::to_string(&event) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(connection_id = %connection_id, error = %e, "failed to encode event frame");
                        continue;
                    }
                };
                if sender.send(Message::Text(frame.into())).await.is_err() {
                    debug!(connection_id = %connection_id, "send failed, client disconnected");
                    break;
                }
            }
        })
    };

    // Handle join/leave/authenticate frames from the client.
    let recv_task = {
        let registry = state.registry.clone();
        let connection_id = connection_id.clone();
        tokio::spawn(async move {
            while let Some(Ok(msg)) = receiver.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<ClientMessage>(&text) {
                        Ok(ClientMessage::JoinOrganization(org)) => {
                            registry.join(&connection_id, org.id());
                            info!(
                                connection_id = %connection_id,
                                organization = org.id(),
                                "joined organization room"
                            );
                        }
                        Ok(ClientMessage::LeaveOrganization(org)) => {
                            registry.leave(&connection_id, org.id());
                            info!(
                                connection_id = %connection_id,
                                organization = org.id(),
                                "left organization room"
                            );
                        }
                        Ok(ClientMessage::Authenticate { token }) => {
                            // Validation belongs to the auth service; room
                            // membership is the only gate enforced here.
                            debug!(
                                connection_id = %connection_id,
                                token_len = token.len(),
                                "credentials presented"
                            );
                        }
                        Err(e) => {
                            // Malformed frames are isolated to this
                            // connection and otherwise ignored.
                            warn!(connection_id = %connection_id, error = %e, "malformed client frame");
                        }
                    },
                    Message::Close(_) => {
                        debug!(connection_id = %connection_id, "client sent close frame");
                        break;
                    }
                    _ => {}
                }
            }
        })
    };

    // Either direction ending tears the connection down.
    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    state.registry.remove_connection(&connection_id);
    info!(
        connection_id = %connection_id,
        connections = state.registry.len(),
        "client disconnected"
    );
}
