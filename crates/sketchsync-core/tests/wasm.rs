//! Browser channel tests. Run with `wasm-pack test --headless --firefox crates/sketchsync-core`.

#![cfg(target_arch = "wasm32")]

use sketchsync_core::sync::WasmChannel;
use sketchsync_core::{ChannelEvent, ConnectionState, SyncChannel};
use wasm_bindgen_futures::JsFuture;
use wasm_bindgen_test::*;

wasm_bindgen_test_configure!(run_in_browser);

async fn sleep_ms(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    JsFuture::from(promise).await.unwrap();
}

#[wasm_bindgen_test]
async fn test_close_before_browser_close_event() {
    let mut channel = WasmChannel::new();
    channel.connect("ws://127.0.0.1:9/ws/board").unwrap();
    assert_eq!(channel.state(), ConnectionState::Connecting);

    channel.close();
    // Give the browser time to fire onclose/onerror for the dead socket.
    sleep_ms(200).await;

    assert!(channel.poll_events().is_empty());
    assert_eq!(channel.state(), ConnectionState::Disconnected);
}

#[wasm_bindgen_test]
async fn test_failed_connection_is_reported() {
    let mut channel = WasmChannel::new();
    channel.connect("ws://127.0.0.1:9/ws/board").unwrap();
    sleep_ms(1000).await;

    let events = channel.poll_events();
    assert!(
        events
            .iter()
            .any(|e| matches!(e, ChannelEvent::Error { .. } | ChannelEvent::Closed))
    );
    assert_ne!(channel.state(), ConnectionState::Connected);
}
