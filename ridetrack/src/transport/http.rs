//! REST delivery.
//!
//! Positions go to `POST <base_url>/rides`:
//!
//! ```text
//! {"action":"position","ride_id":42,"lat":..,"lng":..,"accuracy":..,"heading":..,"speed":..,"timestamp":"..."}
//! {"action":"batch-positions","ride_id":42,"positions":[{"lat":..,"lng":..,...}, ...]}
//! ```
//!
//! Queued actions map to:
//!
//! | kind | endpoint | action |
//! |------|----------|--------|
//! | Position | `/rides` | `position` |
//! | StatusChange | `/rides` | `update-status` |
//! | Message | `/messages` | `send` |
//!
//! The server answers `{"success": bool, "message"?: string}`. Only a 2xx
//! status with `success: true` is a delivery; anything else, including an
//! unparsable body or a missing `success` field, is a failure.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use super::{Transport, TransportError};
use crate::position::{PositionSample, RideId};
use crate::store::{ActionKind, QueueItem};

/// REST endpoint configuration.
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// API root without trailing slash, e.g. `https://rides.example.com/api`.
    pub base_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            base_url: crate::config::DEFAULT_API_BASE_URL.to_string(),
            timeout: Duration::from_secs(crate::config::DEFAULT_API_TIMEOUT_SECS),
        }
    }
}

/// One position inside a `batch-positions` request.
#[derive(Debug, Serialize)]
struct WirePosition {
    lat: f64,
    lng: f64,
    accuracy: f64,
    heading: Option<f64>,
    speed: Option<f64>,
    timestamp: String,
}

impl From<&PositionSample> for WirePosition {
    fn from(sample: &PositionSample) -> Self {
        Self {
            lat: sample.lat,
            lng: sample.lng,
            accuracy: sample.accuracy,
            heading: sample.heading,
            speed: sample.speed,
            timestamp: sample.captured_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    success: bool,
    #[serde(default)]
    message: Option<String>,
}

fn encode<T: Serialize>(value: T) -> Result<Value, TransportError> {
    serde_json::to_value(value).map_err(|e| TransportError::Payload(e.to_string()))
}

/// Request body for a batch of positions.
fn positions_body(ride_id: RideId, batch: &[PositionSample]) -> Result<Value, TransportError> {
    match batch {
        [single] => {
            let mut body = encode(WirePosition::from(single))?;
            if let Value::Object(map) = &mut body {
                map.insert("action".to_string(), json!("position"));
                map.insert("ride_id".to_string(), json!(ride_id));
            }
            Ok(body)
        }
        _ => {
            let positions: Vec<WirePosition> = batch.iter().map(WirePosition::from).collect();
            Ok(json!({
                "action": "batch-positions",
                "ride_id": ride_id,
                "positions": encode(positions)?,
            }))
        }
    }
}

/// Endpoint path and request body for a queued action.
fn action_request(item: &QueueItem) -> Result<(&'static str, Value), TransportError> {
    let (path, action) = match item.kind {
        ActionKind::Position => ("rides", "position"),
        ActionKind::StatusChange => ("rides", "update-status"),
        ActionKind::Message => ("messages", "send"),
    };

    let mut body = item.payload.clone();
    let Value::Object(map) = &mut body else {
        return Err(TransportError::Payload(format!(
            "queue item {} payload is not an object",
            item.id
        )));
    };
    map.insert("action".to_string(), json!(action));
    Ok((path, body))
}

/// Transport that posts to the REST API.
pub struct HttpTransport {
    config: HttpConfig,
    http: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TransportError::Http(e.to_string()))?;
        Ok(Self { config, http })
    }

    async fn post(&self, path: &str, body: &Value) -> Result<(), TransportError> {
        let url = format!("{}/{}", self.config.base_url, path);
        let response = self
            .http
            .post(&url)
            .json(body)
            .send()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|e| TransportError::Http(e.to_string()))?;
        let parsed: Option<ApiResponse> = serde_json::from_slice(&bytes).ok();

        debug!(url = %url, status = status.as_u16(), "API response");

        if !status.is_success() {
            let detail = parsed
                .and_then(|r| r.message)
                .unwrap_or_else(|| status.to_string());
            return Err(TransportError::Rejected(format!(
                "HTTP {}: {}",
                status.as_u16(),
                detail
            )));
        }

        match parsed {
            Some(ApiResponse { success: true, .. }) => Ok(()),
            Some(ApiResponse {
                success: false,
                message,
            }) => Err(TransportError::Rejected(
                message.unwrap_or_else(|| "request failed".to_string()),
            )),
            None => Err(TransportError::Rejected(format!(
                "HTTP {} without a success flag in the response body",
                status.as_u16()
            ))),
        }
    }
}

impl Transport for HttpTransport {
    fn name(&self) -> &'static str {
        "http"
    }

    fn is_available(&self) -> bool {
        true
    }

    async fn send_positions(
        &self,
        ride_id: RideId,
        batch: &[PositionSample],
    ) -> Result<(), TransportError> {
        if batch.is_empty() {
            return Ok(());
        }
        let body = positions_body(ride_id, batch)?;
        self.post("rides", &body).await
    }

    async fn send_action(&self, item: &QueueItem) -> Result<(), TransportError> {
        let (path, body) = action_request(item)?;
        self.post(path, &body).await
    }
}
