//! End-to-end pipeline: replayed track, tracking session, SQLite store,
//! sync engine and HTTP delivery to a local axum server.

use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use ridetrack::connection::{ConnectionSupervisor, SupervisorConfig};
use ridetrack::geo::offset_north;
use ridetrack::sampler::ReplaySampler;
use ridetrack::store::LocalStore;
use ridetrack::sync::{SyncConfig, SyncEngine};
use ridetrack::tracking::{
    FinalFlush, TrackingConfig, TrackingCoordinator, TrackingEvent, TrackingState,
};
use ridetrack::transport::{FallbackTransport, HttpConfig, HttpTransport, SocketTransport};
use ridetrack::{GeoFix, RideId, SyncState};
use serde_json::{json, Value};
use tokio::sync::broadcast;

#[derive(Clone, Default)]
struct RideApi {
    bodies: Arc<Mutex<Vec<Value>>>,
    down: Arc<AtomicBool>,
}

impl RideApi {
    /// Positions delivered so far, in arrival order.
    fn delivered(&self) -> Vec<Value> {
        self.bodies
            .lock()
            .iter()
            .flat_map(|body| match body["action"].as_str() {
                Some("batch-positions") => body["positions"].as_array().cloned().unwrap_or_default(),
                Some("position") => vec![body.clone()],
                _ => Vec::new(),
            })
            .collect()
    }
}

async fn rides(State(api): State<RideApi>, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
    if api.down.load(Ordering::SeqCst) {
        return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"success": false})));
    }
    api.bodies.lock().push(body);
    (StatusCode::OK, Json(json!({"success": true})))
}

async fn serve_api() -> (RideApi, HttpConfig) {
    let api = RideApi::default();
    let app = Router::new()
        .route("/api/rides", post(rides))
        .with_state(api.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    let config = HttpConfig {
        base_url: format!("http://{addr}/api"),
        timeout: Duration::from_secs(5),
    };
    (api, config)
}

/// A straight drive north: one fix per second, 15 m apart.
fn write_track(path: &Path, fixes: usize) {
    let start = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
    let mut file = std::fs::File::create(path).unwrap();
    for i in 0..fixes {
        let (lat, lng) = offset_north((40.7128, -74.0060), 15.0 * i as f64);
        let fix = GeoFix::new(lat, lng, 4.0, start + chrono::Duration::seconds(i as i64))
            .with_velocity(0.0, 15.0);
        writeln!(file, "{}", serde_json::to_string(&fix).unwrap()).unwrap();
    }
}

type Transport = FallbackTransport<SocketTransport, HttpTransport>;

/// The channel is never started, so every call falls back to HTTP.
fn offline_first_transport(http: HttpConfig) -> Transport {
    let supervisor = ConnectionSupervisor::new(SupervisorConfig::default());
    FallbackTransport::new(
        SocketTransport::new(supervisor.handle()),
        HttpTransport::new(http).unwrap(),
    )
}

fn tracking_config() -> TrackingConfig {
    TrackingConfig {
        sync_interval: Duration::from_secs(3600),
        min_update_interval: Duration::from_secs(5),
        ..TrackingConfig::default()
    }
}

async fn wait_for_watch_end(events: &mut broadcast::Receiver<TrackingEvent>) {
    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            if let Ok(TrackingEvent::WatchEnded { .. }) = events.recv().await {
                return;
            }
        }
    })
    .await
    .expect("replay did not finish");
}

#[tokio::test]
async fn test_replayed_ride_is_delivered_over_http_fallback() {
    let dir = tempfile::TempDir::new().unwrap();
    let track = dir.path().join("ride.jsonl");
    write_track(&track, 20);

    let (api, http) = serve_api().await;
    let store = LocalStore::open(&dir.path().join("ride.db")).unwrap();
    let sync = Arc::new(SyncEngine::new(
        store.clone(),
        offline_first_transport(http),
        SyncConfig { batch_size: 8 },
    ));
    let sampler = ReplaySampler::from_file(&track).unwrap().with_speed(50.0);
    let coordinator =
        TrackingCoordinator::new(sampler, store.clone(), sync, None, tracking_config());
    let mut events = coordinator.subscribe();

    coordinator.start(RideId(42)).await.unwrap();
    wait_for_watch_end(&mut events).await;

    let stats = coordinator.trip_stats().unwrap();
    assert!((stats.total_distance_m - 285.0).abs() < 1.0);
    assert!((stats.max_speed_kmh - 54.0).abs() < 1e-6);
    assert_eq!(coordinator.history().len(), 20);

    let summary = coordinator.stop().await.unwrap();
    assert_eq!(coordinator.state(), TrackingState::Idle);
    assert_eq!(summary.accepted, 20);
    assert!(matches!(
        summary.flush,
        FinalFlush::Completed { batches_sent: 3, positions_synced: 20, clean: true }
    ));

    let delivered = api.delivered();
    assert_eq!(delivered.len(), 20);
    let timestamps: Vec<&str> = delivered
        .iter()
        .map(|p| p["timestamp"].as_str().unwrap())
        .collect();
    let mut sorted = timestamps.clone();
    sorted.sort();
    assert_eq!(timestamps, sorted);

    let stored = store.positions_for_ride(RideId(42)).unwrap();
    assert!(stored.iter().all(|p| p.sync_state == SyncState::Synced));
}

#[tokio::test]
async fn test_positions_survive_outage_and_restart() {
    let dir = tempfile::TempDir::new().unwrap();
    let db = dir.path().join("ride.db");
    let track = dir.path().join("ride.jsonl");
    write_track(&track, 6);

    let (api, http) = serve_api().await;
    api.down.store(true, Ordering::SeqCst);

    {
        let store = LocalStore::open(&db).unwrap();
        let sync = Arc::new(SyncEngine::new(
            store.clone(),
            offline_first_transport(http.clone()),
            SyncConfig::default(),
        ));
        let sampler = ReplaySampler::from_file(&track).unwrap().with_speed(50.0);
        let coordinator =
            TrackingCoordinator::new(sampler, store.clone(), sync, None, tracking_config());
        let mut events = coordinator.subscribe();

        coordinator.start(RideId(7)).await.unwrap();
        wait_for_watch_end(&mut events).await;
        let summary = coordinator.stop().await.unwrap();

        assert!(matches!(
            summary.flush,
            FinalFlush::Completed { positions_synced: 0, clean: false, .. }
        ));
        assert_eq!(store.list_unsynced().unwrap().len(), 6);
    }

    // A new process on the same database once the API is back.
    api.down.store(false, Ordering::SeqCst);
    let store = LocalStore::open(&db).unwrap();
    let sync = SyncEngine::new(
        store.clone(),
        offline_first_transport(http),
        SyncConfig::default(),
    );

    let report = sync.flush().await.unwrap();

    assert_eq!(report.positions_synced, 6);
    assert_eq!(api.delivered().len(), 6);
    assert!(store.list_unsynced().unwrap().is_empty());
}
