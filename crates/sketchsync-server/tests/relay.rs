//! Relay integration tests: start a real server and talk to it over WebSockets.

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use sketchsync_server::{Relay, serve};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};

type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

const DRAW_A: &str = r#"{"type":"draw","path":[{"x":10,"y":10,"isDrawing":false}]}"#;
const DRAW_B: &str =
    r#"{"type":"draw","path":[{"x":1,"y":2,"isDrawing":false},{"x":3,"y":4,"isDrawing":true}]}"#;

async fn start_relay() -> (SocketAddr, Arc<Relay>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let relay = Arc::new(Relay::new());
    let server_relay = relay.clone();
    tokio::spawn(async move {
        let _ = serve(listener, server_relay).await;
    });
    (addr, relay)
}

async fn connect(addr: SocketAddr, session: &str) -> Client {
    let (ws, _) = connect_async(format!("ws://{addr}/ws/{session}"))
        .await
        .unwrap();
    ws
}

async fn next_text(ws: &mut Client) -> String {
    loop {
        let msg = timeout(Duration::from_secs(5), ws.next())
            .await
            .expect("timed out waiting for a frame")
            .expect("stream ended")
            .expect("websocket error");
        if let Message::Text(text) = msg {
            return text.as_str().to_string();
        }
    }
}

async fn next_of_type(ws: &mut Client, kind: &str) -> Value {
    loop {
        let value: Value = serde_json::from_str(&next_text(ws).await).unwrap();
        if value["type"] == kind {
            return value;
        }
    }
}

#[tokio::test]
async fn test_health() {
    let (addr, _) = start_relay().await;

    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream
        .write_all(b"GET /health HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let mut response = String::new();
    stream.read_to_string(&mut response).await.unwrap();

    assert!(response.starts_with("HTTP/1.1 200"));
    assert!(response.ends_with("ok"));
}

#[tokio::test]
async fn test_frames_relayed_verbatim_without_echo() {
    let (addr, relay) = start_relay().await;

    let mut a = connect(addr, "room-1").await;
    let joined = next_of_type(&mut a, "joined").await;
    assert_eq!(joined["session"], "room-1");
    assert_eq!(joined["peer_count"], 1);

    let mut b = connect(addr, "room-1").await;
    let joined = next_of_type(&mut b, "joined").await;
    assert_eq!(joined["peer_count"], 2);
    next_of_type(&mut a, "peer_joined").await;
    assert_eq!(relay.peer_count("room-1"), 2);

    a.send(Message::text(DRAW_A)).await.unwrap();
    assert_eq!(next_text(&mut b).await, DRAW_A);

    // A's own frame was queued first; the next thing A sees must be B's.
    b.send(Message::text(DRAW_B)).await.unwrap();
    assert_eq!(next_text(&mut a).await, DRAW_B);
}

#[tokio::test]
async fn test_binary_frames_ignored() {
    let (addr, _) = start_relay().await;

    let mut a = connect(addr, "bin").await;
    next_of_type(&mut a, "joined").await;
    let mut b = connect(addr, "bin").await;
    next_of_type(&mut b, "joined").await;
    next_of_type(&mut a, "peer_joined").await;

    a.send(Message::binary(vec![1u8, 2, 3])).await.unwrap();
    a.send(Message::text(DRAW_A)).await.unwrap();

    let msg = timeout(Duration::from_secs(5), b.next())
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!(msg, Message::text(DRAW_A));
}

#[tokio::test]
async fn test_sessions_are_isolated() {
    let (addr, _) = start_relay().await;

    let mut a = connect(addr, "left").await;
    next_of_type(&mut a, "joined").await;
    let mut other = connect(addr, "right").await;
    next_of_type(&mut other, "joined").await;

    a.send(Message::text(DRAW_A)).await.unwrap();

    assert!(
        timeout(Duration::from_millis(300), other.next())
            .await
            .is_err()
    );
}

#[tokio::test]
async fn test_peer_left_notice_and_cleanup() {
    let (addr, relay) = start_relay().await;

    let mut a = connect(addr, "bye").await;
    next_of_type(&mut a, "joined").await;
    let mut b = connect(addr, "bye").await;
    next_of_type(&mut b, "joined").await;
    let joined = next_of_type(&mut a, "peer_joined").await;

    b.close(None).await.unwrap();
    let left = next_of_type(&mut a, "peer_left").await;
    assert_eq!(left["peer_id"], joined["peer_id"]);

    a.close(None).await.unwrap();
    for _ in 0..50 {
        if relay.session_count() == 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(relay.session_count(), 0);
}
