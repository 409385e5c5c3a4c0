//! Per-session stroke synchronization.
//!
//! The controller owns one client's view of a session: the sealed stroke
//! history, the stroke being drawn, the channel to peers, and the render
//! engine. Local gestures are echoed immediately and published as full-path
//! snapshots; remote snapshots are drawn as an ephemeral overlay on top of
//! the local history.

use crate::config::CanvasStyle;
use crate::history::StrokeHistory;
use crate::input::{CanvasBounds, PointerEvent};
use crate::protocol::{ProtocolError, WireMessage, encode_draw};
use crate::render::{RenderEngine, redraw};
use crate::session::SessionId;
use crate::stroke::{StrokeBuffer, StrokePoint};
use crate::sync::{ChannelError, ChannelEvent, ConnectionState, SyncChannel};
use kurbo::Point;

/// What the controller did with inbound traffic.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    /// Channel handshake finished.
    Connected,
    /// Channel closed or failed; input is inert from here on.
    Disconnected { reason: Option<String> },
    /// The relay confirmed the join.
    Joined { peer_count: usize },
    PeerJoined { peer_id: String },
    PeerLeft { peer_id: String },
    /// A remote path was drawn over the history.
    RemoteDraw { points: usize },
}

/// Path drawn on top of history in the current frame.
#[derive(Debug, Clone, Default)]
enum Overlay {
    #[default]
    None,
    /// The local stroke in progress.
    Active,
    /// The latest path received from a peer.
    Remote(Vec<StrokePoint>),
}

/// Synchronizes one client's strokes with a session.
pub struct SyncController<C: SyncChannel, R: RenderEngine> {
    session: SessionId,
    /// `None` once the channel closed.
    channel: Option<C>,
    engine: R,
    style: CanvasStyle,
    bounds: CanvasBounds,
    history: StrokeHistory,
    active: Option<StrokeBuffer>,
    overlay: Overlay,
    peer_count: usize,
}

impl<C: SyncChannel, R: RenderEngine> SyncController<C, R> {
    /// Create a controller for `session` talking over `channel`.
    ///
    /// The canvas is assumed to sit at the client origin until
    /// [`set_canvas_bounds`](Self::set_canvas_bounds) says otherwise.
    pub fn new(session: SessionId, channel: C, engine: R, style: CanvasStyle) -> Self {
        let bounds = CanvasBounds::at_origin(kurbo::Size::new(
            f64::from(style.width),
            f64::from(style.height),
        ));
        let mut controller = Self {
            session,
            channel: Some(channel),
            engine,
            style,
            bounds,
            history: StrokeHistory::new(),
            active: None,
            overlay: Overlay::None,
            peer_count: 0,
        };
        controller.repaint();
        controller
    }

    pub fn session(&self) -> &SessionId {
        &self.session
    }

    /// Sealed local strokes in draw order.
    pub fn history(&self) -> &StrokeHistory {
        &self.history
    }

    /// The stroke currently being drawn, if the pen is down.
    pub fn active_stroke(&self) -> Option<&StrokeBuffer> {
        self.active.as_ref()
    }

    /// Path drawn over the history in the current frame.
    pub fn overlay(&self) -> Option<&[StrokePoint]> {
        match &self.overlay {
            Overlay::None => None,
            Overlay::Active => self.active.as_ref().map(StrokeBuffer::points),
            Overlay::Remote(path) => Some(path.as_slice()),
        }
    }

    pub fn engine(&self) -> &R {
        &self.engine
    }

    /// Update where the canvas sits in client coordinates.
    pub fn set_canvas_bounds(&mut self, bounds: CanvasBounds) {
        self.bounds = bounds;
    }

    /// Whether a channel is still attached. Without one, input is inert.
    pub fn is_attached(&self) -> bool {
        self.channel.is_some()
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel
            .as_ref()
            .map_or(ConnectionState::Disconnected, |c| c.state())
    }

    /// Peers in the session as last reported by the relay, including us.
    pub fn peer_count(&self) -> usize {
        self.peer_count
    }

    // --- Local input ---

    /// Dispatch a pointer event.
    pub fn handle_pointer_event(&mut self, event: PointerEvent) {
        match event {
            PointerEvent::Down { position } => self.pointer_down(position),
            PointerEvent::Move { position } => self.pointer_move(position),
            PointerEvent::Up { .. } => self.pointer_up(),
        }
    }

    /// Pen down at client position `client`: start a stroke, publish it, and
    /// draw it.
    pub fn pointer_down(&mut self, client: Point) {
        if self.channel.is_none() {
            log::debug!("Pointer down ignored: session {} not connected", self.session);
            return;
        }

        // A lost pointer-up leaves a stroke open; finish it before starting over.
        if let Some(previous) = self.active.take() {
            log::debug!("Sealing unfinished stroke of {} points", previous.len());
            self.history.commit(previous);
        }

        let mut stroke = StrokeBuffer::begin();
        if let Err(e) = stroke.append(self.bounds.to_local(client)) {
            log::error!("Fresh stroke rejected a point: {}", e);
            return;
        }
        self.active = Some(stroke);
        self.overlay = Overlay::Active;

        self.publish_active();
        self.repaint();
    }

    /// Pen moved to client position `client`. Ignored unless a stroke is active.
    pub fn pointer_move(&mut self, client: Point) {
        if self.channel.is_none() {
            return;
        }

        let position = self.bounds.to_local(client);
        let Some(stroke) = self.active.as_mut() else {
            return;
        };
        if let Err(e) = stroke.append(position) {
            log::error!("Active stroke rejected a point: {}", e);
            return;
        }
        self.overlay = Overlay::Active;

        self.publish_active();
        self.repaint();
    }

    /// Pen up: seal the active stroke into history. Nothing is sent; the last
    /// update already carried the stroke's final shape.
    pub fn pointer_up(&mut self) {
        let Some(stroke) = self.active.take() else {
            return;
        };

        log::debug!("Stroke finished with {} points", stroke.len());
        self.history.commit(stroke);
        if matches!(self.overlay, Overlay::Active) {
            self.overlay = Overlay::None;
        }
    }

    /// Send the whole active stroke as a draw message.
    fn publish_active(&self) {
        let (Some(channel), Some(stroke)) = (&self.channel, &self.active) else {
            return;
        };

        let text = match encode_draw(stroke.points()) {
            Ok(text) => text,
            Err(e) => {
                log::error!("Failed to encode draw message: {}", e);
                return;
            }
        };

        match channel.send(&text) {
            Ok(()) => {}
            Err(ChannelError::Unavailable) => {
                log::debug!("Channel unavailable, dropping draw update");
            }
            Err(e) => log::warn!("Failed to send draw update: {}", e),
        }
    }

    // --- Inbound ---

    /// Drain the channel and apply everything received, in delivery order.
    pub fn pump(&mut self) -> Vec<SessionEvent> {
        let Some(channel) = self.channel.as_mut() else {
            return Vec::new();
        };

        let mut events = Vec::new();
        for event in channel.poll_events() {
            match event {
                ChannelEvent::Opened => {
                    log::info!("Connected to session {}", self.session);
                    events.push(SessionEvent::Connected);
                }
                ChannelEvent::Message(text) => {
                    if let Some(event) = self.handle_message(&text) {
                        events.push(event);
                    }
                }
                ChannelEvent::Closed => {
                    log::info!("Session {} closed", self.session);
                    self.detach();
                    events.push(SessionEvent::Disconnected { reason: None });
                    break;
                }
                ChannelEvent::Error { message } => {
                    log::warn!("Session {} channel failed: {}", self.session, message);
                    self.detach();
                    events.push(SessionEvent::Disconnected {
                        reason: Some(message),
                    });
                    break;
                }
            }
        }
        events
    }

    /// Apply one inbound text frame. Malformed and unknown messages are
    /// ignored.
    pub fn handle_message(&mut self, text: &str) -> Option<SessionEvent> {
        if self.channel.is_none() {
            return None;
        }

        match WireMessage::decode(text) {
            Ok(WireMessage::Draw { path }) => {
                let points = path.len();
                self.overlay = Overlay::Remote(path);
                self.repaint();
                Some(SessionEvent::RemoteDraw { points })
            }
            Ok(WireMessage::Joined {
                session,
                peer_count,
            }) => {
                log::info!("Joined session {} with {} peer(s)", session, peer_count);
                self.peer_count = peer_count;
                Some(SessionEvent::Joined { peer_count })
            }
            Ok(WireMessage::PeerJoined { peer_id }) => {
                log::info!("Peer {} joined session {}", peer_id, self.session);
                self.peer_count += 1;
                Some(SessionEvent::PeerJoined { peer_id })
            }
            Ok(WireMessage::PeerLeft { peer_id }) => {
                log::info!("Peer {} left session {}", peer_id, self.session);
                self.peer_count = self.peer_count.saturating_sub(1);
                Some(SessionEvent::PeerLeft { peer_id })
            }
            Err(ProtocolError::UnsupportedType(kind)) => {
                log::debug!("Ignoring message of type {}", kind);
                None
            }
            Err(e) => {
                log::warn!("Ignoring malformed message: {}", e);
                None
            }
        }
    }

    // --- Rendering ---

    /// Repaint the current frame: history plus the current overlay.
    pub fn refresh(&mut self) {
        self.repaint();
    }

    fn repaint(&mut self) {
        let overlay = match &self.overlay {
            Overlay::None => None,
            Overlay::Active => self.active.as_ref().map(StrokeBuffer::points),
            Overlay::Remote(path) => Some(path.as_slice()),
        };
        redraw(&mut self.engine, &self.style, &self.history, overlay);
    }

    // --- Lifecycle ---

    fn detach(&mut self) {
        if let Some(mut channel) = self.channel.take() {
            channel.close();
        }
    }

    /// Leave the session. Strokes are discarded; the render engine is handed
    /// back with the last frame still on it.
    pub fn close(mut self) -> R {
        self.detach();
        self.engine
    }
}
