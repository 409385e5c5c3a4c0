//! Browser WebSocket channel.

use super::{ChannelError, ChannelEvent, ConnectionState, SyncChannel, next_state};
use crate::config::ClientConfig;
use std::cell::RefCell;
use std::rc::Rc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{CloseEvent, ErrorEvent, MessageEvent, WebSocket};

/// WebSocket channel for WASM.
///
/// Callbacks push into a shared queue that `poll_events()` drains.
pub struct WasmChannel {
    ws: Option<WebSocket>,
    state: ConnectionState,
    events: Rc<RefCell<Vec<ChannelEvent>>>,
    // Closures must outlive the socket callbacks that reference them.
    _on_open: Option<Closure<dyn Fn()>>,
    _on_message: Option<Closure<dyn Fn(MessageEvent)>>,
    _on_close: Option<Closure<dyn Fn(CloseEvent)>>,
    _on_error: Option<Closure<dyn Fn(ErrorEvent)>>,
}

impl WasmChannel {
    /// Create a new disconnected channel.
    pub fn new() -> Self {
        Self {
            ws: None,
            state: ConnectionState::Disconnected,
            events: Rc::new(RefCell::new(Vec::new())),
            _on_open: None,
            _on_message: None,
            _on_close: None,
            _on_error: None,
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

    /// Start connecting to `url`.
    pub fn connect(&mut self, url: &str) -> Result<(), ChannelError> {
        if self.ws.is_some() {
            return Err(ChannelError::AlreadyConnected);
        }

        let ws = WebSocket::new(url).map_err(|e| ChannelError::Connect(format!("{:?}", e)))?;
        self.state = ConnectionState::Connecting;

        let events_open = self.events.clone();
        let on_open = Closure::wrap(Box::new(move || {
            events_open.borrow_mut().push(ChannelEvent::Opened);
        }) as Box<dyn Fn()>);
        ws.set_onopen(Some(on_open.as_ref().unchecked_ref()));

        let events_msg = self.events.clone();
        let on_message = Closure::wrap(Box::new(move |e: MessageEvent| {
            if let Ok(txt) = e.data().dyn_into::<js_sys::JsString>() {
                events_msg.borrow_mut().push(ChannelEvent::Message(txt.into()));
            }
        }) as Box<dyn Fn(MessageEvent)>);
        ws.set_onmessage(Some(on_message.as_ref().unchecked_ref()));

        let events_close = self.events.clone();
        let on_close = Closure::wrap(Box::new(move |_e: CloseEvent| {
            events_close.borrow_mut().push(ChannelEvent::Closed);
        }) as Box<dyn Fn(CloseEvent)>);
        ws.set_onclose(Some(on_close.as_ref().unchecked_ref()));

        let events_err = self.events.clone();
        let on_error = Closure::wrap(Box::new(move |_e: ErrorEvent| {
            events_err.borrow_mut().push(ChannelEvent::Error {
                message: "WebSocket error".to_string(),
            });
        }) as Box<dyn Fn(ErrorEvent)>);
        ws.set_onerror(Some(on_error.as_ref().unchecked_ref()));

        self.ws = Some(ws);
        self._on_open = Some(on_open);
        self._on_message = Some(on_message);
        self._on_close = Some(on_close);
        self._on_error = Some(on_error);

        Ok(())
    }
}

fn detach_handlers(ws: &WebSocket) {
    ws.set_onopen(None);
    ws.set_onmessage(None);
    ws.set_onclose(None);
    ws.set_onerror(None);
}

impl Default for WasmChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncChannel for WasmChannel {
    fn send(&self, text: &str) -> Result<(), ChannelError> {
        match self.ws {
            Some(ref ws) if self.state == ConnectionState::Connected => ws
                .send_with_str(text)
                .map_err(|e| ChannelError::Send(format!("{:?}", e))),
            _ => Err(ChannelError::Unavailable),
        }
    }

    fn poll_events(&mut self) -> Vec<ChannelEvent> {
        let events = std::mem::take(&mut *self.events.borrow_mut());
        for event in &events {
            self.state = next_state(self.state, event);
        }
        events
    }

    fn close(&mut self) {
        if let Some(ws) = self.ws.take() {
            // The browser still fires onclose after close(); detach before
            // the closures below are dropped.
            detach_handlers(&ws);
            let _ = ws.close();
        }
        self.state = ConnectionState::Disconnected;
        self._on_open = None;
        self._on_message = None;
        self._on_close = None;
        self._on_error = None;
    }

    fn state(&self) -> ConnectionState {
        self.state
    }
}

impl Drop for WasmChannel {
    fn drop(&mut self) {
        self.close();
    }
}
