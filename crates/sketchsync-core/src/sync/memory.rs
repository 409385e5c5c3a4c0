//! In-process channel for tests and offline demos.
//!
//! A [`MemoryHub`] behaves like the relay server: peers of one session see
//! each other's frames (never their own) plus the same presence notices.

use super::{ChannelError, ChannelEvent, ConnectionState, SyncChannel, next_state};
use crate::protocol::WireMessage;
use crate::session::SessionId;
use std::collections::HashMap;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};

struct Peer {
    id: String,
    tx: Sender<ChannelEvent>,
}

#[derive(Default)]
struct HubInner {
    next_peer: u64,
    sessions: HashMap<String, Vec<Peer>>,
}

impl HubInner {
    /// Deliver `text` to every peer of `session` except `from`.
    fn broadcast(&self, session: &str, from: &str, text: &str) {
        if let Some(peers) = self.sessions.get(session) {
            for peer in peers.iter().filter(|p| p.id != from) {
                let _ = peer.tx.send(ChannelEvent::Message(text.to_string()));
            }
        }
    }
}

/// Shared in-memory relay.
#[derive(Clone, Default)]
pub struct MemoryHub {
    inner: Arc<Mutex<HubInner>>,
}

impl MemoryHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Join `session` and return the peer's channel.
    pub fn connect(&self, session: &SessionId) -> Result<MemoryChannel, ChannelError> {
        let mut inner = self
            .inner
            .lock()
            .map_err(|e| ChannelError::Connect(format!("Lock error: {}", e)))?;

        inner.next_peer += 1;
        let peer_id = format!("mem-{}", inner.next_peer);
        let (tx, rx) = channel();

        let joined_notice = WireMessage::PeerJoined {
            peer_id: peer_id.clone(),
        }
        .encode()
        .map_err(|e| ChannelError::Connect(e.to_string()))?;
        inner.broadcast(session.as_str(), &peer_id, &joined_notice);

        let peers = inner.sessions.entry(session.as_str().to_string()).or_default();
        peers.push(Peer {
            id: peer_id.clone(),
            tx: tx.clone(),
        });

        let welcome = WireMessage::Joined {
            session: session.as_str().to_string(),
            peer_count: peers.len(),
        }
        .encode()
        .map_err(|e| ChannelError::Connect(e.to_string()))?;
        let _ = tx.send(ChannelEvent::Opened);
        let _ = tx.send(ChannelEvent::Message(welcome));

        Ok(MemoryChannel {
            hub: self.clone(),
            session: session.as_str().to_string(),
            peer_id,
            rx,
            state: ConnectionState::Connecting,
            closed: false,
        })
    }

    /// Number of peers currently in `session`.
    pub fn peer_count(&self, session: &SessionId) -> usize {
        self.inner
            .lock()
            .map(|inner| inner.sessions.get(session.as_str()).map_or(0, Vec::len))
            .unwrap_or(0)
    }

    /// Drop every peer of `session` as if the transport went away.
    pub fn shutdown(&self, session: &SessionId) {
        if let Ok(mut inner) = self.inner.lock() {
            if let Some(peers) = inner.sessions.remove(session.as_str()) {
                for peer in peers {
                    let _ = peer.tx.send(ChannelEvent::Closed);
                }
            }
        }
    }

    fn leave(&self, session: &str, peer_id: &str) {
        let Ok(mut inner) = self.inner.lock() else {
            return;
        };

        let Some(peers) = inner.sessions.get_mut(session) else {
            return;
        };
        let before = peers.len();
        peers.retain(|p| p.id != peer_id);
        if peers.len() == before {
            return;
        }
        if peers.is_empty() {
            inner.sessions.remove(session);
            return;
        }

        if let Ok(notice) = (WireMessage::PeerLeft {
            peer_id: peer_id.to_string(),
        })
        .encode()
        {
            inner.broadcast(session, peer_id, &notice);
        }
    }
}

/// One peer's end of a [`MemoryHub`] session.
pub struct MemoryChannel {
    hub: MemoryHub,
    session: String,
    peer_id: String,
    rx: Receiver<ChannelEvent>,
    state: ConnectionState,
    closed: bool,
}

impl SyncChannel for MemoryChannel {
    fn send(&self, text: &str) -> Result<(), ChannelError> {
        if self.state != ConnectionState::Connected {
            return Err(ChannelError::Unavailable);
        }

        let inner = self
            .hub
            .inner
            .lock()
            .map_err(|e| ChannelError::Send(format!("Lock error: {}", e)))?;

        let present = inner
            .sessions
            .get(&self.session)
            .is_some_and(|peers| peers.iter().any(|p| p.id == self.peer_id));
        if !present {
            return Err(ChannelError::Unavailable);
        }

        inner.broadcast(&self.session, &self.peer_id, text);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<ChannelEvent> {
        if self.closed {
            // Closed locally; anything still queued is stale.
            while self.rx.try_recv().is_ok() {}
            return Vec::new();
        }

        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            self.state = next_state(self.state, &event);
            events.push(event);
        }
        events
    }

    fn close(&mut self) {
        self.hub.leave(&self.session, &self.peer_id);
        self.state = ConnectionState::Disconnected;
        self.closed = true;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Drop for MemoryChannel {
    fn drop(&mut self) {
        self.hub.leave(&self.session, &self.peer_id);
    }
}
