//! WebSocket handler — one `Session` per connected client.
//!
//! DESIGN
//! ======
//! On upgrade the session registers its outbound queue with the client
//! registry, writes `init` straight to the socket, then announces presence
//! through the hub. After that a single `select!` loop either reads the next
//! inbound frame and hands it to the message router, or writes the next
//! event the hub queued for this client. All writes to the socket happen
//! in this loop, so they are serialized per client.
//!
//! LIFECYCLE
//! =========
//! `Connecting → Open → Closing → Closed`
//! 1. Connecting: registered, `init` not yet delivered
//! 2. Open: `init` delivered, presence announced, frames flowing
//! 3. Closing: read error, close frame, or failed write; unregister, then
//!    announce presence and `cursor_remove` if the session was Open
//! 4. Closed: socket dropped. A reconnect is a new session with a new id.

use std::sync::Arc;

use axum::extract::State;
use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::response::Response;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use crate::event::OutboundEvent;
use crate::pixel::ClientId;
use crate::services::hub::HubClosed;
use crate::services::router;
use crate::state::AppState;

// =============================================================================
// UPGRADE
// =============================================================================

pub async fn handle_ws(State(state): State<AppState>, ws: WebSocketUpgrade) -> Response {
    ws.on_upgrade(move |socket| run_ws(socket, state))
}

// =============================================================================
// SESSION
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Connecting,
    Open,
    Closing,
    Closed,
}

/// Registry and hub side of one connection. Owns no transport, so the
/// lifecycle can be driven without a socket.
pub(crate) struct Session {
    client_id: ClientId,
    state: AppState,
    phase: Phase,
}

impl Session {
    /// Register a new client and return its outbound queue.
    pub(crate) fn connect(state: AppState) -> (Self, mpsc::Receiver<Arc<OutboundEvent>>) {
        let client_id = Uuid::new_v4();
        let (tx, rx) = mpsc::channel(state.client_queue_capacity.max(1));
        let online = state.registry.register(client_id, tx);
        info!(%client_id, online, "ws: client registered");
        (Self { client_id, state, phase: Phase::Connecting }, rx)
    }

    pub(crate) fn client_id(&self) -> ClientId {
        self.client_id
    }

    #[cfg(test)]
    pub(crate) fn phase(&self) -> Phase {
        self.phase
    }

    pub(crate) fn init_event(&self) -> OutboundEvent {
        OutboundEvent::Init { id: self.client_id, size: self.state.canvas.grid_size() }
    }

    /// Mark the session open once `init` is delivered, and announce presence.
    pub(crate) async fn open(&mut self) -> Result<(), HubClosed> {
        self.phase = Phase::Open;
        let online_users = self.state.registry.count();
        self.state.hub.publish(OutboundEvent::Presence { online_users }).await
    }

    /// Hand one inbound text frame to the router.
    pub(crate) async fn receive(&self, raw: &str) -> Result<(), HubClosed> {
        router::route(&self.state, self.client_id, raw).await
    }

    /// Tear down. Safe to call more than once.
    pub(crate) async fn close(&mut self) {
        if matches!(self.phase, Phase::Closing | Phase::Closed) {
            return;
        }
        let was_open = self.phase == Phase::Open;
        self.phase = Phase::Closing;

        let online_users = self.state.registry.unregister(self.client_id);
        if was_open {
            let announced = async {
                self.state.hub.publish(OutboundEvent::Presence { online_users }).await?;
                self.state.hub.publish(OutboundEvent::CursorRemove { id: self.client_id }).await
            };
            if let Err(e) = announced.await {
                warn!(client_id = %self.client_id, error = %e, "ws: departure not announced");
            }
        }

        self.phase = Phase::Closed;
        info!(client_id = %self.client_id, online = online_users, "ws: client disconnected");
    }
}

// =============================================================================
// CONNECTION
// =============================================================================

async fn run_ws(mut socket: WebSocket, state: AppState) {
    let (mut session, mut client_rx) = Session::connect(state);

    if send_event(&mut socket, &session.init_event()).await.is_ok() && session.open().await.is_ok() {
        info!(client_id = %session.client_id(), "ws: client connected");
        loop {
            tokio::select! {
                msg = socket.recv() => {
                    let Some(Ok(msg)) = msg else { break };
                    let routed = match msg {
                        Message::Text(text) => session.receive(text.as_str()).await,
                        Message::Binary(bytes) => match std::str::from_utf8(&bytes) {
                            Ok(text) => session.receive(text).await,
                            Err(_) => Ok(()),
                        },
                        Message::Close(_) => break,
                        _ => Ok(()),
                    };
                    if routed.is_err() {
                        warn!(client_id = %session.client_id(), "ws: broadcast hub closed, dropping connection");
                        break;
                    }
                }
                Some(event) = client_rx.recv() => {
                    if send_event(&mut socket, &event).await.is_err() {
                        break;
                    }
                }
            }
        }
    }

    session.close().await;
}

// =============================================================================
// HELPERS
// =============================================================================

async fn send_event(socket: &mut WebSocket, event: &OutboundEvent) -> Result<(), ()> {
    let json = match serde_json::to_string(event) {
        Ok(j) => j,
        Err(e) => {
            warn!(error = %e, kind = event.kind(), "ws: failed to serialize event");
            return Err(());
        }
    };
    socket.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
#[path = "ws_test.rs"]
mod tests;
