//! SketchSync WebSocket Relay Server
//!
//! Routes text frames between the peers of a session. Frames are forwarded
//! verbatim and never stored; a peer joining late sees only what is drawn
//! after it arrives.
//!
//! ## Endpoints
//!
//! - `GET /` banner
//! - `GET /health` returns `ok`
//! - `GET /ws/{session}` WebSocket upgrade
//!
//! Besides relayed frames the server emits presence notices:
//! ```json
//! { "type": "joined", "session": "room-1", "peer_count": 2 }
//! { "type": "peer_joined", "peer_id": "..." }
//! { "type": "peer_left", "peer_id": "..." }
//! ```

use axum::{
    Router,
    extract::{
        Path, State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
    routing::get,
};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use sketchsync_core::WireMessage;
use std::{collections::HashSet, sync::Arc};
use tokio::{net::TcpListener, sync::broadcast};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{debug, info, warn};
use uuid::Uuid;

const CHANNEL_CAPACITY: usize = 256;

/// A text frame tagged with the peer that sent it.
#[derive(Debug, Clone)]
pub struct Frame {
    pub from: String,
    pub text: String,
}

struct Session {
    tx: broadcast::Sender<Frame>,
    peers: HashSet<String>,
}

impl Session {
    fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            peers: HashSet::new(),
        }
    }
}

/// Shared relay state: one broadcast channel per live session.
#[derive(Default)]
pub struct Relay {
    sessions: DashMap<String, Session>,
}

impl Relay {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add `peer_id` to `session`, creating it if needed.
    ///
    /// Returns the peer's feed and the session size including the new peer.
    pub fn join(&self, session: &str, peer_id: &str) -> (broadcast::Receiver<Frame>, usize) {
        let mut entry = self
            .sessions
            .entry(session.to_string())
            .or_insert_with(Session::new);
        entry.peers.insert(peer_id.to_string());
        (entry.tx.subscribe(), entry.peers.len())
    }

    /// Remove `peer_id` from `session`. Empty sessions are dropped.
    ///
    /// Returns the number of peers left.
    pub fn leave(&self, session: &str, peer_id: &str) -> usize {
        let remaining = match self.sessions.get_mut(session) {
            Some(mut entry) => {
                entry.peers.remove(peer_id);
                entry.peers.len()
            }
            None => return 0,
        };
        if remaining == 0 {
            self.sessions.remove_if(session, |_, s| s.peers.is_empty());
        }
        remaining
    }

    /// Queue `text` for every peer of `session`. Receivers skip their own frames.
    pub fn broadcast(&self, session: &str, from: &str, text: String) {
        if let Some(entry) = self.sessions.get(session) {
            let _ = entry.tx.send(Frame {
                from: from.to_string(),
                text,
            });
        }
    }

    pub fn peer_count(&self, session: &str) -> usize {
        self.sessions.get(session).map_or(0, |s| s.peers.len())
    }

    /// Number of sessions with at least one peer.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }
}

/// Build the HTTP router.
pub fn router(relay: Arc<Relay>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/ws/{session}", get(ws_handler))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

/// Serve the relay on an already bound listener.
pub async fn serve(listener: TcpListener, relay: Arc<Relay>) -> std::io::Result<()> {
    axum::serve(listener, router(relay)).await
}

async fn index() -> &'static str {
    "SketchSync Relay Server - Connect via WebSocket at /ws/{session}"
}

async fn health() -> &'static str {
    "ok"
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(session): Path<String>,
    State(relay): State<Arc<Relay>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, session, relay))
}

async fn handle_socket(socket: WebSocket, session: String, relay: Arc<Relay>) {
    let peer_id = Uuid::new_v4().to_string();
    let (mut sender, mut receiver) = socket.split();

    let (mut rx, peer_count) = relay.join(&session, &peer_id);
    info!("Peer {} joined session {} ({} peers)", peer_id, session, peer_count);

    let joined = WireMessage::Joined {
        session: session.clone(),
        peer_count,
    };
    match joined.encode() {
        Ok(text) => {
            if sender.send(Message::Text(text.into())).await.is_err() {
                leave(&relay, &session, &peer_id);
                return;
            }
        }
        Err(e) => warn!("Failed to encode joined notice: {}", e),
    }
    notify(&relay, &session, &peer_id, WireMessage::PeerJoined {
        peer_id: peer_id.clone(),
    });

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        debug!("Relaying {} bytes from {} in {}", text.as_str().len(), peer_id, session);
                        relay.broadcast(&session, &peer_id, text.as_str().to_owned());
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!("Ignoring binary frame from {}", peer_id);
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {} // Ignore ping/pong
                    Some(Err(e)) => {
                        warn!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                }
            }

            frame = rx.recv() => {
                match frame {
                    Ok(frame) => {
                        // Don't echo back to sender
                        if frame.from != peer_id
                            && sender.send(Message::Text(frame.text.into())).await.is_err()
                        {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!("Peer {} lagged, skipped {} frames", peer_id, skipped);
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        }
    }

    leave(&relay, &session, &peer_id);
}

fn leave(relay: &Relay, session: &str, peer_id: &str) {
    let remaining = relay.leave(session, peer_id);
    if remaining > 0 {
        notify(relay, session, peer_id, WireMessage::PeerLeft {
            peer_id: peer_id.to_string(),
        });
    }
    info!("Peer {} left session {} ({} peers)", peer_id, session, remaining);
}

fn notify(relay: &Relay, session: &str, from: &str, notice: WireMessage) {
    match notice.encode() {
        Ok(text) => relay.broadcast(session, from, text),
        Err(e) => warn!("Failed to encode presence notice: {}", e),
    }
}
