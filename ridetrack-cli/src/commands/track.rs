//! Track command - run a tracking session for one ride.
//!
//! Wires the full pipeline: location source, tracking coordinator, local
//! store, sync engine and the persistent channel with REST fallback. The
//! session runs until Ctrl-C, the end of a replayed track or `--duration`.

use std::future::pending;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use clap::Args;
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ridetrack::connection::ConnectionHandle;
use ridetrack::sampler::GeoSampler;
use ridetrack::store::LocalStore;
use ridetrack::sync::SyncEngine;
use ridetrack::tracking::{
    FinalFlush, SessionSummary, TrackingConfig, TrackingCoordinator, TrackingEvent,
};
use ridetrack::transport::Transport;
use ridetrack::RideId;

use crate::error::CliError;
use crate::runner::{CliRunner, SamplerChoice};

/// Arguments for the track command.
#[derive(Debug, Args)]
pub struct TrackArgs {
    /// Ride to track
    #[arg(long)]
    pub ride: RideId,

    /// Replay a recorded JSON-lines track instead of the configured source
    #[arg(long)]
    pub replay: Option<PathBuf>,

    /// Replay time scale (2.0 plays twice as fast)
    #[arg(long)]
    pub speed: Option<f64>,

    /// User id sent as auth on the live channel
    #[arg(long)]
    pub user: Option<String>,

    /// Stop after this many seconds
    #[arg(long)]
    pub duration: Option<u64>,

    /// Mirror log output to the terminal
    #[arg(long)]
    pub verbose: bool,
}

/// Everything a session needs besides the sampler.
struct Pipeline<T: Transport> {
    store: LocalStore,
    sync: Arc<SyncEngine<T>>,
    live: Option<ConnectionHandle>,
    config: TrackingConfig,
}

/// Run the track command.
pub async fn run(args: TrackArgs, debug: bool) -> Result<(), CliError> {
    let runner = CliRunner::with_debug(debug, args.verbose)?;
    runner.log_startup("track");
    let config = runner.config();

    let store = runner.open_store()?;
    let supervisor = runner.connection();
    let handle = supervisor.handle();
    if let Some(user) = &args.user {
        handle.authenticate(user.clone());
    }

    let sync = Arc::new(SyncEngine::new(
        store.clone(),
        runner.transport(&supervisor)?,
        config.sync_config(),
    ));

    let shutdown = CancellationToken::new();
    let connection_task = if config.connection.enabled {
        let trigger = sync.spawn_reconnect_trigger(handle.subscribe(), shutdown.clone());
        Some((supervisor.start(), trigger))
    } else {
        info!("Live channel disabled, delivering over HTTP only");
        None
    };

    let pipeline = Pipeline {
        store,
        sync,
        live: config.connection.enabled.then(|| handle.clone()),
        config: config.tracking_config(),
    };
    let duration = args.duration.map(Duration::from_secs);

    let result = match runner.sampler(args.replay, args.speed)? {
        SamplerChoice::Gpsd(sampler) => track(sampler, pipeline, args.ride, duration).await,
        SamplerChoice::Replay(sampler) => track(sampler, pipeline, args.ride, duration).await,
    };

    shutdown.cancel();
    handle.disconnect();
    if let Some((supervisor_task, trigger)) = connection_task {
        let _ = supervisor_task.await;
        let _ = trigger.await;
    }

    print_summary(&result?);
    Ok(())
}

async fn track<S: GeoSampler, T: Transport>(
    sampler: S,
    pipeline: Pipeline<T>,
    ride_id: RideId,
    duration: Option<Duration>,
) -> Result<SessionSummary, CliError> {
    let coordinator = TrackingCoordinator::new(
        sampler,
        pipeline.store,
        pipeline.sync,
        pipeline.live,
        pipeline.config,
    );
    let mut events = coordinator.subscribe();

    coordinator.start(ride_id).await?;
    println!("Tracking ride {} (Ctrl-C to stop)", ride_id);

    let deadline = async {
        match duration {
            Some(d) => tokio::time::sleep(d).await,
            None => pending().await,
        }
    };
    tokio::pin!(deadline);

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                println!();
                break;
            }
            _ = &mut deadline => break,
            event = events.recv() => match event {
                Ok(TrackingEvent::PositionAccepted(sample)) => {
                    let speed = sample
                        .speed_kmh()
                        .map(|kmh| format!("{:5.1} km/h", kmh))
                        .unwrap_or_else(|| "   -- km/h".to_string());
                    println!(
                        "  {}  {:>10.6}, {:>11.6}  ±{:<3.0}m  {}",
                        sample.captured_at.with_timezone(&Local).format("%H:%M:%S"),
                        sample.lat,
                        sample.lng,
                        sample.accuracy,
                        speed
                    );
                }
                Ok(TrackingEvent::SensorError(e)) => eprintln!("  Sensor: {}", e),
                Ok(TrackingEvent::StoreDegraded { reason }) => eprintln!("  Store: {}", reason),
                Ok(TrackingEvent::WatchEnded { .. }) => {
                    println!("Location source finished");
                    break;
                }
                Ok(_) => {}
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => break,
            },
        }
    }

    println!("Stopping...");
    coordinator
        .stop()
        .await
        .ok_or_else(|| CliError::InvalidArgument("session was not running".to_string()))
}

fn print_summary(summary: &SessionSummary) {
    println!();
    println!("Ride {} summary", summary.ride_id);
    println!(
        "  Samples:   {} accepted, {} filtered",
        summary.accepted, summary.rejected
    );
    if let Some(stats) = &summary.stats {
        println!("  Distance:  {:.2} km", stats.total_distance_km());
        println!("  Avg speed: {:.1} km/h", stats.average_speed_kmh);
        println!("  Max speed: {:.1} km/h", stats.max_speed_kmh);
    }
    match &summary.flush {
        FinalFlush::Completed {
            positions_synced,
            clean,
            ..
        } => {
            println!("  Delivered: {} positions on stop", positions_synced);
            if !clean {
                println!("  Some records stay pending; run 'ridetrack sync flush' later");
            }
        }
        FinalFlush::Failed { reason } => println!("  Final flush failed: {}", reason),
        FinalFlush::TimedOut => println!("  Final flush timed out; records stay pending"),
    }
}
