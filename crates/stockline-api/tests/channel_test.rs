// Integration tests for the realtime channel against a local
// tokio-tungstenite server.

use std::time::Duration;

use futures_util::SinkExt;
use serde_json::json;
use tokio::net::TcpListener;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use url::Url;

use stockline_api::{ChannelHandle, ChannelMessage, Change, CollectionKind, ReconnectConfig};

fn test_reconnect() -> ReconnectConfig {
    ReconnectConfig {
        delay: Duration::from_millis(10),
        max_attempts: 1,
    }
}

async fn recv(
    rx: &mut tokio::sync::broadcast::Receiver<std::sync::Arc<ChannelMessage>>,
) -> std::sync::Arc<ChannelMessage> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for channel message")
        .expect("channel closed")
}

#[tokio::test]
async fn streams_parsed_frames_then_reports_exhaustion() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
        ws.send(Message::text(
            json!({
                "event": "vendors_insert",
                "data": { "_id": "v1", "name": "Acme", "contact": "a@b.c", "phone": "1" }
            })
            .to_string(),
        ))
        .await
        .expect("send insert");
        ws.send(Message::text(
            json!({
                "event": "connection_status",
                "data": { "status": "connected" }
            })
            .to_string(),
        ))
        .await
        .expect("send status");
        ws.close(None).await.ok();
        // Listener drops here, so the reconnect attempt fails.
    });

    let url = Url::parse(&format!("ws://{addr}/realtime?token=t")).expect("url");
    let cancel = CancellationToken::new();
    let handle = ChannelHandle::connect(url, test_reconnect(), cancel.clone());
    let mut rx = handle.subscribe();

    let first = recv(&mut rx).await;
    let ChannelMessage::Record(ref ev) = *first else {
        panic!("expected record, got {first:?}");
    };
    assert_eq!(ev.collection, CollectionKind::Vendors);
    assert!(matches!(ev.change, Change::Insert(_)));

    let second = recv(&mut rx).await;
    let ChannelMessage::Status { ref status, .. } = *second else {
        panic!("expected status, got {second:?}");
    };
    assert_eq!(status, "connected");

    // Clean close -> one reconnect attempt against a dead listener ->
    // bounded retry gives up.
    let third = recv(&mut rx).await;
    assert!(matches!(*third, ChannelMessage::RetriesExhausted));

    server.await.expect("server task");
    handle.shutdown();
}

#[tokio::test]
async fn invalid_token_status_stops_without_reconnecting() {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await.expect("accept");
        let mut ws = tokio_tungstenite::accept_async(stream).await.expect("upgrade");
        ws.send(Message::text(
            json!({
                "event": "connection_status",
                "data": { "status": "error", "message": "Invalid token" }
            })
            .to_string(),
        ))
        .await
        .expect("send rejection");
        // Hold the socket open; the client must stop on its own.
        let more = listener.accept();
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(500)) => {}
            _ = more => panic!("client reconnected after auth rejection"),
        }
    });

    let url = Url::parse(&format!("ws://{addr}/realtime?token=bad")).expect("url");
    let cancel = CancellationToken::new();
    let handle = ChannelHandle::connect(url, test_reconnect(), cancel.clone());
    let mut rx = handle.subscribe();

    let msg = recv(&mut rx).await;
    assert!(matches!(*msg, ChannelMessage::AuthRejected { .. }));

    server.await.expect("server task");
    handle.shutdown();
}

#[tokio::test]
async fn shutdown_is_idempotent() {
    // No listener at all -- the loop just retries until cancelled.
    let url = Url::parse("ws://127.0.0.1:1/realtime?token=t").expect("url");
    let cancel = CancellationToken::new();
    let handle = ChannelHandle::connect(
        url,
        ReconnectConfig {
            delay: Duration::from_millis(10),
            max_attempts: 100,
        },
        cancel,
    );

    handle.shutdown();
    handle.shutdown();
}
