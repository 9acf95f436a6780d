//! Durable batches over the persistent channel: only a `position_ack` from
//! the server marks positions Synced.

use std::time::Duration;

use chrono::{TimeZone, Utc};
use futures::{SinkExt, StreamExt};
use ridetrack::connection::{
    ConnectionEvent, ConnectionHandle, ConnectionSupervisor, Frame, SupervisorConfig,
};
use ridetrack::store::LocalStore;
use ridetrack::sync::{SyncConfig, SyncEngine};
use ridetrack::transport::{FallbackTransport, HttpConfig, HttpTransport, SocketTransport};
use ridetrack::{GeoFix, RideId};
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

/// What the fake server does with position frames.
#[derive(Clone, Copy)]
enum Server {
    /// Read positions and acknowledge each complete batch.
    Ack,
    /// Accept the handshake, never read, drop the socket after a pause.
    DropWithoutReading,
    /// Read positions but never acknowledge them.
    Silent,
}

/// Serves one connection. Returns the URL and a feed of received frames.
async fn spawn_server(mode: Server) -> (String, mpsc::UnboundedReceiver<Frame>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let url = format!("ws://{}/ws", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::unbounded_channel();

    tokio::spawn(async move {
        let (stream, _) = listener.accept().await.unwrap();
        let mut ws = tokio_tungstenite::accept_async(stream).await.unwrap();

        if let Server::DropWithoutReading = mode {
            tokio::time::sleep(Duration::from_millis(200)).await;
            drop(ws);
            return;
        }

        let mut counts: Vec<(u64, usize)> = Vec::new();
        while let Some(Ok(message)) = ws.next().await {
            let Message::Text(text) = message else {
                continue;
            };
            let frame = Frame::parse(&text).unwrap();
            let batch_id = frame.data["batchId"].as_u64();
            let _ = tx.send(frame);

            let (Server::Ack, Some(batch_id)) = (mode, batch_id) else {
                continue;
            };
            match counts.iter_mut().find(|(id, _)| *id == batch_id) {
                Some((_, count)) => *count += 1,
                None => counts.push((batch_id, 1)),
            }
            // Batches in these tests hold three positions.
            if let Some((_, 3)) = counts.iter().find(|(id, _)| *id == batch_id) {
                let ack = json!({
                    "type": "position_ack",
                    "data": {"batchId": batch_id, "count": 3},
                    "timestamp": 0,
                });
                ws.send(Message::Text(ack.to_string())).await.unwrap();
            }
        }
    });

    (url, rx)
}

/// An HTTP fallback pointing at a port nothing listens on.
fn dead_http() -> HttpTransport {
    let addr = std::net::TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap();
    HttpTransport::new(HttpConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_secs(1),
    })
    .unwrap()
}

async fn connect(url: String) -> ConnectionHandle {
    let supervisor = ConnectionSupervisor::new(SupervisorConfig {
        url,
        reconnect_base: Duration::from_secs(60),
        max_attempts: 1,
        heartbeat_interval: Duration::from_secs(30),
        user_id: None,
    });
    let handle = supervisor.handle();
    let mut events = handle.subscribe();
    let _ = supervisor.start();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !matches!(events.recv().await, Ok(ConnectionEvent::Connected)) {}
    })
    .await
    .expect("never connected");
    handle
}

fn engine(
    handle: &ConnectionHandle,
    ack_timeout: Duration,
) -> SyncEngine<FallbackTransport<SocketTransport, HttpTransport>> {
    let store = LocalStore::in_memory().unwrap();
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    for i in 0..3 {
        let at = start + chrono::Duration::seconds(i);
        let fix = GeoFix::new(40.0 + i as f64 * 0.001, -74.0, 5.0, at);
        store.save_position(&fix.into_sample(RideId(42))).unwrap();
    }

    let socket = SocketTransport::new(handle.clone()).with_ack_timeout(ack_timeout);
    SyncEngine::new(
        store,
        FallbackTransport::new(socket, dead_http()),
        SyncConfig { batch_size: 3 },
    )
}

#[tokio::test]
async fn test_acknowledged_batch_is_marked_synced() {
    let (url, mut received) = spawn_server(Server::Ack).await;
    let handle = connect(url).await;
    let engine = engine(&handle, Duration::from_secs(5));

    let report = engine.flush().await.unwrap();

    assert_eq!(report.batches_sent, 1);
    assert_eq!(report.positions_synced, 3);
    assert!(engine.store().list_unsynced().unwrap().is_empty());

    let mut batch_ids = Vec::new();
    while let Ok(frame) = received.try_recv() {
        assert_eq!(frame.kind, "position");
        batch_ids.push(frame.data["batchId"].as_u64().unwrap());
    }
    assert_eq!(batch_ids.len(), 3);
    assert!(batch_ids.iter().all(|id| *id == batch_ids[0]));
    handle.disconnect();
}

#[tokio::test]
async fn test_connection_dropped_during_flush_keeps_batch_pending() {
    let (url, _received) = spawn_server(Server::DropWithoutReading).await;
    let handle = connect(url).await;
    let engine = engine(&handle, Duration::from_secs(10));

    let report = tokio::time::timeout(Duration::from_secs(5), engine.flush())
        .await
        .expect("flush waited for the full ack timeout")
        .unwrap();

    assert_eq!(report.batches_sent, 0);
    assert_eq!(report.batches_failed, 1);
    assert_eq!(report.positions_synced, 0);
    assert_eq!(engine.store().list_unsynced().unwrap().len(), 3);
    handle.disconnect();
}

#[tokio::test]
async fn test_missing_ack_keeps_batch_pending() {
    let (url, mut received) = spawn_server(Server::Silent).await;
    let handle = connect(url).await;
    let engine = engine(&handle, Duration::from_millis(300));

    let report = engine.flush().await.unwrap();

    assert_eq!(report.batches_failed, 1);
    assert_eq!(engine.store().list_unsynced().unwrap().len(), 3);
    // The frames did reach the server; without an ack they still count as undelivered.
    let mut frames = 0;
    while received.try_recv().is_ok() {
        frames += 1;
    }
    assert_eq!(frames, 3);
    handle.disconnect();
}
