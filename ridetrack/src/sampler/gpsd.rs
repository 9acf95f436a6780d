//! gpsd location source.
//!
//! Connects to a `gpsd` daemon over TCP, enables JSON watch mode and turns
//! TPV (time-position-velocity) reports into [`GeoFix`]es.
//!
//! # Protocol
//!
//! ```text
//! client: ?WATCH={"enable":true,"json":true};
//! gpsd:   {"class":"VERSION",...}
//! gpsd:   {"class":"TPV","mode":3,"time":"...","lat":..,"lon":..,"track":..,"speed":..,"eph":..}
//! ```
//!
//! `mode` is 0/1 without a fix, 2 for a 2D fix and 3 for a 3D fix. High
//! accuracy profiles require mode 3.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::TcpStream;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use super::{
    publish, FixCache, GeoSampler, SamplerError, SamplerEvent, SamplingProfile, Watch, WatchFeed,
    EVENT_CAPACITY,
};
use crate::position::GeoFix;

/// Command that switches gpsd into JSON streaming mode.
const WATCH_COMMAND: &[u8] = b"?WATCH={\"enable\":true,\"json\":true};\n";

/// Upper bound on establishing the TCP connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Accuracy reported when gpsd gives no error estimate.
const UNKNOWN_ACCURACY_M: f64 = 100.0;

type ReportLines = Lines<BufReader<TcpStream>>;

/// A gpsd report. Only TPV fields are read; other classes parse with defaults.
#[derive(Debug, Deserialize)]
struct Report {
    class: String,
    #[serde(default)]
    mode: u8,
    time: Option<DateTime<Utc>>,
    lat: Option<f64>,
    lon: Option<f64>,
    track: Option<f64>,
    speed: Option<f64>,
    eph: Option<f64>,
    epx: Option<f64>,
    epy: Option<f64>,
}

/// What a TPV line says about the fix.
#[derive(Debug, PartialEq)]
enum TpvReading {
    Fix(GeoFix),
    NoFix { mode: u8 },
}

/// Parse one line. Returns `None` for anything that is not a TPV report.
fn parse_tpv(line: &str, high_accuracy: bool) -> Option<TpvReading> {
    let report: Report = serde_json::from_str(line).ok()?;
    if report.class != "TPV" {
        return None;
    }

    let required_mode = if high_accuracy { 3 } else { 2 };
    let (lat, lon) = match (report.lat, report.lon) {
        (Some(lat), Some(lon)) if report.mode >= required_mode => (lat, lon),
        _ => return Some(TpvReading::NoFix { mode: report.mode }),
    };

    let accuracy = report
        .eph
        .or_else(|| report.epx.zip(report.epy).map(|(x, y)| x.max(y)))
        .unwrap_or(UNKNOWN_ACCURACY_M);

    let mut fix = GeoFix::new(lat, lon, accuracy, report.time.unwrap_or_else(Utc::now));
    fix.heading = report.track;
    fix.speed = report.speed;
    Some(TpvReading::Fix(fix))
}

/// Why reading a fix stopped.
enum ReadError {
    /// The per-fix deadline passed; the stream is still usable.
    Expired(SamplerError),
    /// The stream failed or closed.
    Stream(SamplerError),
}

impl ReadError {
    fn into_inner(self) -> SamplerError {
        match self {
            Self::Expired(e) | Self::Stream(e) => e,
        }
    }
}

/// Location source backed by a gpsd daemon.
pub struct GpsdSampler {
    addr: String,
    events: broadcast::Sender<SamplerEvent>,
    cache: Arc<FixCache>,
}

impl GpsdSampler {
    /// Create a sampler for the daemon at `addr` (host:port).
    pub fn new(addr: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            addr: addr.into(),
            events,
            cache: Arc::new(FixCache::default()),
        }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }

    async fn connect(addr: &str) -> Result<TcpStream, SamplerError> {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(addr)).await {
            Ok(Ok(stream)) => Ok(stream),
            Ok(Err(e)) => Err(SamplerError::from_io(addr, &e)),
            Err(_) => Err(SamplerError::Unavailable(format!(
                "connecting to {} timed out",
                addr
            ))),
        }
    }

    /// Connect and enable JSON watch mode.
    async fn open(addr: &str) -> Result<ReportLines, SamplerError> {
        let mut stream = Self::connect(addr).await?;
        stream
            .write_all(WATCH_COMMAND)
            .await
            .map_err(|e| SamplerError::from_io(addr, &e))?;
        debug!(addr, "gpsd watch enabled");
        Ok(BufReader::new(stream).lines())
    }

    /// Read reports until a fix satisfying the profile arrives.
    async fn next_fix(
        addr: &str,
        lines: &mut ReportLines,
        profile: SamplingProfile,
    ) -> Result<GeoFix, ReadError> {
        let deadline = Instant::now() + profile.timeout;
        let mut last_no_fix_mode = None;

        loop {
            let line = match tokio::time::timeout_at(deadline, lines.next_line()).await {
                Err(_) => {
                    return Err(ReadError::Expired(match last_no_fix_mode {
                        Some(mode) => SamplerError::Unavailable(format!(
                            "device reports no usable fix (mode {})",
                            mode
                        )),
                        None => SamplerError::Timeout(profile.timeout),
                    }))
                }
                Ok(Err(e)) => return Err(ReadError::Stream(SamplerError::from_io(addr, &e))),
                Ok(Ok(None)) => {
                    return Err(ReadError::Stream(SamplerError::Unavailable(format!(
                        "gpsd at {} closed the connection",
                        addr
                    ))))
                }
                Ok(Ok(Some(line))) => line,
            };

            match parse_tpv(&line, profile.high_accuracy) {
                Some(TpvReading::Fix(fix)) => return Ok(fix),
                Some(TpvReading::NoFix { mode }) => {
                    trace!(mode, "TPV without usable fix");
                    last_no_fix_mode = Some(mode);
                }
                None => trace!(line = %line, "Ignoring gpsd report"),
            }
        }
    }

    async fn run_watch(
        addr: String,
        profile: SamplingProfile,
        feed: WatchFeed,
        events: broadcast::Sender<SamplerEvent>,
        cache: Arc<FixCache>,
    ) {
        publish(&events, SamplerEvent::Detecting);

        let mut lines = tokio::select! {
            _ = feed.stopped() => return,
            opened = Self::open(&addr) => match opened {
                Ok(lines) => lines,
                Err(e) => {
                    warn!(addr = %addr, error = %e, "gpsd watch could not start");
                    publish(&events, SamplerEvent::Error(e.kind()));
                    feed.send(Err(e)).await;
                    return;
                }
            },
        };
        info!(addr = %addr, "gpsd watch started");

        let mut fixes: u64 = 0;
        loop {
            let result = tokio::select! {
                _ = feed.stopped() => break,
                result = Self::next_fix(&addr, &mut lines, profile) => result,
            };

            match result {
                Ok(fix) => {
                    fixes += 1;
                    cache.store(&fix);
                    publish(&events, SamplerEvent::Found(fix.clone()));
                    if !feed.send(Ok(fix)).await {
                        break;
                    }
                }
                Err(ReadError::Expired(e)) => {
                    debug!(error = %e, "gpsd watch waiting for fix");
                    publish(&events, SamplerEvent::Error(e.kind()));
                    if !feed.send(Err(e)).await {
                        break;
                    }
                }
                Err(ReadError::Stream(e)) => {
                    warn!(error = %e, "gpsd watch ended");
                    publish(&events, SamplerEvent::Error(e.kind()));
                    feed.send(Err(e)).await;
                    break;
                }
            }
        }

        info!(addr = %addr, fixes, "gpsd watch stopped");
    }
}

impl GeoSampler for GpsdSampler {
    async fn check_permission(&self) -> Result<(), SamplerError> {
        Self::connect(&self.addr).await.map(|_| ())
    }

    async fn current_position(&self, profile: SamplingProfile) -> Result<GeoFix, SamplerError> {
        publish(&self.events, SamplerEvent::Detecting);

        if let Some(fix) = self.cache.fresh(profile.maximum_age) {
            publish(&self.events, SamplerEvent::Found(fix.clone()));
            return Ok(fix);
        }

        let result = match Self::open(&self.addr).await {
            Ok(mut lines) => Self::next_fix(&self.addr, &mut lines, profile)
                .await
                .map_err(ReadError::into_inner),
            Err(e) => Err(e),
        };

        match &result {
            Ok(fix) => {
                self.cache.store(fix);
                publish(&self.events, SamplerEvent::Found(fix.clone()));
            }
            Err(e) => publish(&self.events, SamplerEvent::Error(e.kind())),
        }
        result
    }

    fn watch(&self, profile: SamplingProfile) -> Watch {
        let (feed, watch) = Watch::channel();
        tokio::spawn(Self::run_watch(
            self.addr.clone(),
            profile,
            feed,
            self.events.clone(),
            Arc::clone(&self.cache),
        ));
        watch
    }

    fn subscribe(&self) -> broadcast::Receiver<SamplerEvent> {
        self.events.subscribe()
    }
}
