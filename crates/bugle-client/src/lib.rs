//! Bugle Client
//!
//! Reconnecting WebSocket client for the fan-out gateway. One background
//! task owns the connection and its recovery. Because the gateway forgets
//! membership the moment a connection drops, every reconnect re-presents
//! credentials and re-joins the last organization room.

use std::sync::Arc;
use std::time::Duration;

use bugle_core::{Backoff, ClientMessage, Event, OrganizationRef};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Supplies the current credential before every connect, so a token rotated
/// between sessions is re-presented without the caller doing anything.
pub type TokenProvider = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Client-observed connection state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClientState {
    /// Closed on request; no further reconnects.
    Disconnected,
    /// Attempting to establish the transport.
    Connecting,
    /// Connected, not in any room.
    Idle,
    /// Connected and joined to an organization room.
    Joined(String),
    /// Retries exhausted; the UI should surface a hard offline state.
    PersistentDisconnect,
}

/// What the background task reports to the caller.
#[derive(Clone, Debug, PartialEq)]
pub enum ClientEvent {
    /// A state transition, including the terminal ones.
    State(ClientState),
    /// A fan-out event from the gateway.
    Event(Event),
}

/// Connection settings.
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// Gateway URL, e.g. `ws://127.0.0.1:5003/ws`.
    pub url: String,
    /// Consecutive failed connects before giving up.
    pub max_attempts: u32,
    /// First reconnect delay.
    pub backoff_initial: Duration,
    /// Reconnect delay ceiling.
    pub backoff_max: Duration,
}

impl ClientConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            max_attempts: 5,
            backoff_initial: Duration::from_secs(1),
            backoff_max: Duration::from_secs(5),
        }
    }
}

enum Command {
    Join(String),
    Leave(String),
    Close,
}

/// Handle to the connection task.
///
/// Constructed explicitly and passed to whatever needs it; dropping the
/// handle closes the connection.
pub struct RealtimeClient {
    commands: mpsc::UnboundedSender<Command>,
}

impl RealtimeClient {
    /// Spawn the connection task. State transitions and events arrive on the
    /// returned receiver.
    pub fn start(
        config: ClientConfig,
        tokens: TokenProvider,
    ) -> (Self, mpsc::UnboundedReceiver<ClientEvent>) {
        let (commands, cmd_rx) = mpsc::unbounded_channel();
        let (events, event_rx) = mpsc::unbounded_channel();
        tokio::spawn(connection_task(config, tokens, cmd_rx, events));
        (Self { commands }, event_rx)
    }

    /// Join an organization room. Remembered across reconnects.
    pub fn join(&self, organization_id: &str) {
        let _ = self.commands.send(Command::Join(organization_id.to_string()));
    }

    /// Leave an organization room.
    pub fn leave(&self, organization_id: &str) {
        let _ = self.commands.send(Command::Leave(organization_id.to_string()));
    }

    /// Close the connection and stop reconnecting.
    pub fn close(&self) {
        let _ = self.commands.send(Command::Close);
    }
}

fn emit_state(events: &mpsc::UnboundedSender<ClientEvent>, state: ClientState) {
    let _ = events.send(ClientEvent::State(state));
}

enum SessionEnd {
    /// Caller asked to close; do not reconnect.
    Closed,
    /// Transport dropped; reconnect.
    Dropped,
}

async fn connection_task(
    config: ClientConfig,
    tokens: TokenProvider,
    mut cmd_rx: mpsc::UnboundedReceiver<Command>,
    events: mpsc::UnboundedSender<ClientEvent>,
) {
    let mut last_room: Option<String> = None;
    let mut backoff = Backoff::new(config.backoff_initial, config.backoff_max);
    let mut failures = 0u32;

    loop {
        emit_state(&events, ClientState::Connecting);
        let ws = match connect_async(&config.url).await {
            Ok((ws, _)) => ws,
            Err(e) => {
                failures += 1;
                warn!(error = %e, attempt = failures, "gateway connect failed");
                if failures >= config.max_attempts {
                    emit_state(&events, ClientState::PersistentDisconnect);
                    return;
                }
                // Sleep out the backoff, but keep absorbing commands so a
                // close is honored promptly and room intent is not lost.
                let sleep = tokio::time::sleep(backoff.next_delay());
                tokio::pin!(sleep);
                loop {
                    tokio::select! {
                        _ = &mut sleep => break,
                        cmd = cmd_rx.recv() => match cmd {
                            Some(Command::Join(org)) => last_room = Some(org),
                            Some(Command::Leave(org)) => {
                                if last_room.as_deref() == Some(org.as_str()) {
                                    last_room = None;
                                }
                            }
                            Some(Command::Close) | None => {
                                emit_state(&events, ClientState::Disconnected);
                                return;
                            }
                        },
                    }
                }
                continue;
            }
        };

        failures = 0;
        backoff.reset();
        info!(url = %config.url, "connected to gateway");

        match run_session(ws, &tokens, &mut last_room, &mut cmd_rx, &events).await {
            SessionEnd::Closed => {
                emit_state(&events, ClientState::Disconnected);
                return;
            }
            SessionEnd::Dropped => {
                warn!("gateway connection dropped, reconnecting");
            }
        }
    }
}

async fn run_session(
    mut ws: WsStream,
    tokens: &TokenProvider,
    last_room: &mut Option<String>,
    cmd_rx: &mut mpsc::UnboundedReceiver<Command>,
    events: &mpsc::UnboundedSender<ClientEvent>,
) -> SessionEnd {
    // Re-present credentials on every connect: fetched fresh, so a rotation
    // since the last session is picked up here, not by the server.
    if let Some(token) = tokens.as_ref()() {
        if send_frame(&mut ws, &ClientMessage::Authenticate { token })
            .await
            .is_err()
        {
            return SessionEnd::Dropped;
        }
    }

    // The gateway forgot us on disconnect; re-join the last room explicitly.
    if let Some(room) = last_room.clone() {
        let frame = ClientMessage::JoinOrganization(OrganizationRef::object(&room));
        if send_frame(&mut ws, &frame).await.is_err() {
            return SessionEnd::Dropped;
        }
        emit_state(events, ClientState::Joined(room));
    } else {
        emit_state(events, ClientState::Idle);
    }

    loop {
        tokio::select! {
            frame = ws.next() => match frame {
                Some(Ok(WsMessage::Text(text))) => match serde_json::from_str::<Event>(&text) {
                    Ok(event) => {
                        let _ = events.send(ClientEvent::Event(event));
                    }
                    Err(e) => debug!(error = %e, "undecodable frame from gateway, ignoring"),
                },
                Some(Ok(WsMessage::Close(_))) | None => return SessionEnd::Dropped,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(error = %e, "gateway stream error");
                    return SessionEnd::Dropped;
                }
            },
            cmd = cmd_rx.recv() => match cmd {
                Some(Command::Join(org)) => {
                    *last_room = Some(org.clone());
                    let frame = ClientMessage::JoinOrganization(OrganizationRef::object(&org));
                    if send_frame(&mut ws, &frame).await.is_err() {
                        return SessionEnd::Dropped;
                    }
                    emit_state(events, ClientState::Joined(org));
                }
                Some(Command::Leave(org)) => {
                    if last_room.as_deref() == Some(org.as_str()) {
                        *last_room = None;
                    }
                    let frame = ClientMessage::LeaveOrganization(OrganizationRef::object(&org));
                    if send_frame(&mut ws, &frame).await.is_err() {
                        return SessionEnd::Dropped;
                    }
                    if last_room.is_none() {
                        emit_state(events, ClientState::Idle);
                    }
                }
                Some(Command::Close) | None => {
                    let _ = ws.close(None).await;
                    return SessionEnd::Closed;
                }
            },
        }
    }
}

async fn send_frame(
    ws: &mut WsStream,
    msg: &ClientMessage,
) -> Result<(), tokio_tungstenite::tungstenite::Error> {
    let text = match serde_json::to_string(msg) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "failed to encode control frame, skipping");
            return Ok(());
        }
    };
    ws.send(WsMessage::Text(text)).await
}
