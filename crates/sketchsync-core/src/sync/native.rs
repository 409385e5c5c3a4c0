//! Native WebSocket channel.
//!
//! The socket lives on a background thread; frames cross over `mpsc` queues
//! so the owning controller never blocks on the network.

use super::{ChannelError, ChannelEvent, ConnectionState, SyncChannel, next_state};
use crate::config::ClientConfig;
use std::sync::mpsc::{Receiver, Sender, TryRecvError, channel};
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tungstenite::{Message, connect};
use url::Url;

/// Commands sent to the socket thread.
enum WsCommand {
    Send(String),
    Close,
}

/// WebSocket channel for native platforms.
pub struct NativeChannel {
    state: ConnectionState,
    /// Commands to the socket thread.
    cmd_tx: Option<Sender<WsCommand>>,
    /// Events from the socket thread.
    event_rx: Option<Receiver<ChannelEvent>>,
    _thread: Option<JoinHandle<()>>,
}

impl NativeChannel {
    /// Create a new disconnected channel.
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            cmd_tx: None,
            event_rx: None,
            _thread: None,
        }
    }

    /// Connect to the session described by `config`.
    pub fn open(config: &ClientConfig) -> Result<Self, ChannelError> {
        let url = config
            .channel_url()
            .map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
        let mut channel = Self::new();
        channel.connect(url.as_str())?;
        Ok(channel)
    }

    /// Start connecting to `url`. Completion is reported as
    /// [`ChannelEvent::Opened`] through [`SyncChannel::poll_events`].
    pub fn connect(&mut self, url: &str) -> Result<(), ChannelError> {
        if self.cmd_tx.is_some() {
            return Err(ChannelError::AlreadyConnected);
        }

        let parsed = Url::parse(url).map_err(|e| ChannelError::InvalidUrl(e.to_string()))?;
        if parsed.scheme() != "ws" && parsed.scheme() != "wss" {
            return Err(ChannelError::InvalidUrl(format!(
                "unsupported scheme {}",
                parsed.scheme()
            )));
        }

        self.state = ConnectionState::Connecting;

        let (cmd_tx, cmd_rx) = channel::<WsCommand>();
        let (event_tx, event_rx) = channel::<ChannelEvent>();
        let url = url.to_string();

        let handle = thread::spawn(move || run_socket(&url, cmd_rx, event_tx));

        self.cmd_tx = Some(cmd_tx);
        self.event_rx = Some(event_rx);
        self._thread = Some(handle);

        Ok(())
    }
}

/// Socket thread body: pump commands out and frames in until either side closes.
fn run_socket(url: &str, cmd_rx: Receiver<WsCommand>, event_tx: Sender<ChannelEvent>) {
    log::info!("Channel thread: connecting to {}", url);

    let mut socket = match connect(url) {
        Ok((socket, response)) => {
            log::info!("Channel connected, status: {}", response.status());
            socket
        }
        Err(e) => {
            log::error!("Channel connection failed: {}", e);
            let _ = event_tx.send(ChannelEvent::Error {
                message: format!("Connection failed: {}", e),
            });
            return;
        }
    };
    let _ = event_tx.send(ChannelEvent::Opened);

    // Short read timeout so outbound commands are not starved by a quiet peer.
    if let tungstenite::stream::MaybeTlsStream::Plain(tcp) = socket.get_mut() {
        let _ = tcp.set_read_timeout(Some(Duration::from_millis(20)));
        let _ = tcp.set_write_timeout(Some(Duration::from_secs(5)));
    }

    loop {
        match cmd_rx.try_recv() {
            Ok(WsCommand::Send(msg)) => {
                log::debug!("Channel sending: {}", preview(&msg));
                if let Err(e) = socket.send(Message::Text(msg)) {
                    log::error!("Channel send error: {}", e);
                    let _ = event_tx.send(ChannelEvent::Error {
                        message: format!("Send failed: {}", e),
                    });
                    break;
                }
                continue;
            }
            Ok(WsCommand::Close) => {
                log::info!("Channel close requested");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Disconnected) => {
                log::info!("Channel command queue dropped");
                let _ = socket.close(None);
                break;
            }
            Err(TryRecvError::Empty) => {}
        }

        match socket.read() {
            Ok(Message::Text(txt)) => {
                log::debug!("Channel received: {}", preview(&txt));
                if event_tx.send(ChannelEvent::Message(txt)).is_err() {
                    break;
                }
            }
            Ok(Message::Ping(data)) => {
                let _ = socket.send(Message::Pong(data));
            }
            Ok(Message::Close(_)) => {
                log::info!("Channel received close frame");
                break;
            }
            Ok(_) => {}
            Err(tungstenite::Error::Io(ref e))
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut => {}
            Err(e) => {
                log::error!("Channel read error: {}", e);
                let _ = event_tx.send(ChannelEvent::Error {
                    message: e.to_string(),
                });
                break;
            }
        }
    }

    log::info!("Channel thread exiting");
    let _ = event_tx.send(ChannelEvent::Closed);
}

/// First 100 characters of `text`, for logging.
fn preview(text: &str) -> &str {
    text.char_indices().nth(100).map_or(text, |(i, _)| &text[..i])
}

impl Default for NativeChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncChannel for NativeChannel {
    fn send(&self, text: &str) -> Result<(), ChannelError> {
        if self.state != ConnectionState::Connected {
            return Err(ChannelError::Unavailable);
        }
        match self.cmd_tx {
            Some(ref tx) => tx
                .send(WsCommand::Send(text.to_string()))
                .map_err(|e| ChannelError::Send(e.to_string())),
            None => Err(ChannelError::Unavailable),
        }
    }

    fn poll_events(&mut self) -> Vec<ChannelEvent> {
        let mut events = Vec::new();
        if let Some(ref rx) = self.event_rx {
            while let Ok(event) = rx.try_recv() {
                self.state = next_state(self.state, &event);
                events.push(event);
            }
        }
        events
    }

    fn close(&mut self) {
        if let Some(tx) = self.cmd_tx.take() {
            let _ = tx.send(WsCommand::Close);
        }
        self.event_rx = None;
        self._thread = None;
        self.state = ConnectionState::Disconnected;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Drop for NativeChannel {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_before_connect_is_unavailable() {
        let channel = NativeChannel::new();
        assert!(matches!(channel.send("{}"), Err(ChannelError::Unavailable)));
    }

    #[test]
    fn test_connect_rejects_non_websocket_url() {
        let mut channel = NativeChannel::new();
        assert!(matches!(
            channel.connect("http://localhost:8000/ws/a"),
            Err(ChannelError::InvalidUrl(_))
        ));
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }

    #[test]
    fn test_preview_respects_char_boundaries() {
        assert_eq!(preview("short"), "short");
        let long = "é".repeat(150);
        assert_eq!(preview(&long).chars().count(), 100);
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut channel = NativeChannel::new();
        channel.close();
        channel.close();
        assert!(channel.poll_events().is_empty());
        assert_eq!(channel.state(), ConnectionState::Disconnected);
    }
}
