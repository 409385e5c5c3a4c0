//! Session channel abstraction.
//!
//! The controller talks to peers through a [`SyncChannel`]: a bidirectional
//! text conduit scoped to one session. Backends queue what they receive and
//! hand it over through non-blocking [`SyncChannel::poll_events`] calls, so
//! the controller stays single-threaded.

mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod native;

#[cfg(target_arch = "wasm32")]
mod wasm;

pub use memory::{MemoryChannel, MemoryHub};

#[cfg(not(target_arch = "wasm32"))]
pub use native::NativeChannel;

#[cfg(target_arch = "wasm32")]
pub use wasm::WasmChannel;

use thiserror::Error;

/// Channel errors.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("Channel unavailable")]
    Unavailable,
    #[error("Already connected")]
    AlreadyConnected,
    #[error("Invalid channel URL: {0}")]
    InvalidUrl(String),
    #[error("Connection failed: {0}")]
    Connect(String),
    #[error("Send failed: {0}")]
    Send(String),
}

/// Connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// Events surfaced by a channel backend.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// The channel finished its handshake.
    Opened,
    /// A text frame from a peer.
    Message(String),
    /// The channel was closed, locally or by the peer.
    Closed,
    /// Transport failure. The channel should be considered closed.
    Error { message: String },
}

/// A session-scoped message conduit.
pub trait SyncChannel {
    /// Queue a text frame for delivery. Fire-and-forget: no acknowledgment.
    fn send(&self, text: &str) -> Result<(), ChannelError>;

    /// Drain everything received since the last poll, in delivery order.
    fn poll_events(&mut self) -> Vec<ChannelEvent>;

    /// Close the channel. Closing twice is harmless.
    fn close(&mut self);

    /// Current connection state.
    fn state(&self) -> ConnectionState;

    fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }
}

/// Fold a drained event into a connection state.
pub(crate) fn next_state(current: ConnectionState, event: &ChannelEvent) -> ConnectionState {
    match event {
        ChannelEvent::Opened => ConnectionState::Connected,
        ChannelEvent::Closed => ConnectionState::Disconnected,
        ChannelEvent::Error { .. } => ConnectionState::Error,
        ChannelEvent::Message(_) => current,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_state() {
        use ConnectionState::*;
        assert_eq!(next_state(Connecting, &ChannelEvent::Opened), Connected);
        assert_eq!(next_state(Connected, &ChannelEvent::Message("x".into())), Connected);
        assert_eq!(next_state(Connected, &ChannelEvent::Closed), Disconnected);
        assert_eq!(
            next_state(Connected, &ChannelEvent::Error { message: "boom".into() }),
            Error
        );
    }
}
