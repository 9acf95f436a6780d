//! WebSocket lifecycle supervision.
//!
//! The [`ConnectionSupervisor`] owns one persistent channel. It connects,
//! re-authenticates and re-joins the active ride room after every connect,
//! sends a `ping` frame on a fixed heartbeat, dispatches inbound frames and
//! reconnects with exponential backoff when the channel drops.
//!
//! # Usage
//!
//! ```ignore
//! let supervisor = ConnectionSupervisor::new(config.supervisor_config());
//! let handle = supervisor.handle();
//! let task = supervisor.start();
//!
//! handle.join_ride(RideId(42));
//! let mut events = handle.subscribe();
//! // ...
//! handle.disconnect();
//! task.await?;
//! ```
//!
//! # Design
//!
//! All mutable state sits in a shared struct behind `parking_lot` mutexes
//! that are never held across an await. Outbound frames reach the socket
//! through an unbounded channel that only exists while connected, so a send
//! on a dropped connection fails fast with [`ConnectionError::NotConnected`].
//! The resume frames are queued on that channel under the same lock that
//! gates [`ConnectionHandle::send`], so a room joined while the socket comes
//! up is either part of the resume or sent right after it.
//! Heartbeats carry no acknowledgement; liveness is left to the socket.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use tokio::net::TcpStream;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use super::backoff::{CloseDecision, ReconnectPolicy, ABNORMAL_CLOSURE, NORMAL_CLOSURE};
use super::error::ConnectionError;
use super::frame::{Frame, InboundMessage, OutboundMessage};
use super::state::ConnectionState;
use crate::position::RideId;

/// Upper bound on the WebSocket handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Capacity of the event channel.
const EVENT_CAPACITY: usize = 64;

type Socket = WebSocketStream<MaybeTlsStream<TcpStream>>;
type FrameHandler = Arc<dyn Fn(&Frame) + Send + Sync>;

/// Supervisor configuration.
#[derive(Debug, Clone)]
pub struct SupervisorConfig {
    /// WebSocket URL (ws:// or wss://).
    pub url: String,
    /// Delay before the first reconnect attempt.
    pub reconnect_base: Duration,
    /// Reconnect attempts before giving up.
    pub max_attempts: u32,
    /// Period of the `ping` frame while connected.
    pub heartbeat_interval: Duration,
    /// Identity sent as `auth` on every connect.
    pub user_id: Option<String>,
}

impl Default for SupervisorConfig {
    fn default() -> Self {
        Self {
            url: crate::config::DEFAULT_WS_URL.to_string(),
            reconnect_base: Duration::from_millis(crate::config::DEFAULT_RECONNECT_BASE_MS),
            max_attempts: crate::config::DEFAULT_RECONNECT_MAX_ATTEMPTS,
            heartbeat_interval: Duration::from_millis(crate::config::DEFAULT_HEARTBEAT_MS),
            user_id: None,
        }
    }
}

/// Lifecycle and inbound events of the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// A connection attempt started. Attempt 0 is the initial connect.
    Connecting { attempt: u32 },
    /// Handshake done and session resumed.
    Connected,
    /// The channel closed with this code (1006 for errors).
    Disconnected { code: u16 },
    ReconnectScheduled { attempt: u32, delay: Duration },
    /// Reconnection stopped; callers should rely on REST delivery.
    ReconnectAbandoned { attempts: u32 },
    Inbound(InboundMessage),
}

/// Registration id returned by [`ConnectionHandle::on`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HandlerId(u64);

struct Shared {
    state: Mutex<ConnectionState>,
    user_id: Mutex<Option<String>>,
    room: Mutex<Option<RideId>>,
    outbound: Mutex<Option<mpsc::UnboundedSender<Message>>>,
    handlers: Mutex<Vec<(HandlerId, String, FrameHandler)>>,
    next_handler: AtomicU64,
    events: broadcast::Sender<ConnectionEvent>,
    shutdown: CancellationToken,
}

impl Shared {
    fn set_state(&self, state: ConnectionState) {
        *self.state.lock() = state;
    }

    fn publish(&self, event: ConnectionEvent) {
        let _ = self.events.send(event);
    }

    fn dispatch(&self, text: &str) {
        let frame = match Frame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                debug!(error = %e, "Ignoring malformed frame");
                return;
            }
        };
        trace!(kind = %frame.kind, "Inbound frame");

        self.publish(ConnectionEvent::Inbound(InboundMessage::from_frame(&frame)));

        let handlers: Vec<FrameHandler> = self
            .handlers
            .lock()
            .iter()
            .filter(|(_, kind, _)| *kind == frame.kind)
            .map(|(_, _, handler)| Arc::clone(handler))
            .collect();
        for handler in handlers {
            handler(&frame);
        }
    }
}

/// Cheap, cloneable access to a running supervisor.
#[derive(Clone)]
pub struct ConnectionHandle {
    shared: Arc<Shared>,
}

impl ConnectionHandle {
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Send a message now. Fails unless connected.
    pub fn send(&self, message: OutboundMessage) -> Result<(), ConnectionError> {
        let frame = message.to_frame(Utc::now());
        let outbound = self.shared.outbound.lock();
        let tx = outbound.as_ref().ok_or(ConnectionError::NotConnected)?;
        tx.send(Message::Text(frame.to_json().into()))
            .map_err(|_| ConnectionError::NotConnected)
    }

    /// Join a ride room. Remembered and re-sent after every reconnect.
    pub fn join_ride(&self, ride_id: RideId) {
        *self.shared.room.lock() = Some(ride_id);
        if let Err(e) = self.send(OutboundMessage::JoinRide { ride_id }) {
            debug!(ride_id = %ride_id, error = %e, "Join deferred until connected");
        }
    }

    /// Leave the current room, if any.
    pub fn leave_ride(&self) {
        let Some(ride_id) = self.shared.room.lock().take() else {
            return;
        };
        if let Err(e) = self.send(OutboundMessage::LeaveRide { ride_id }) {
            debug!(ride_id = %ride_id, error = %e, "Leave not sent");
        }
    }

    /// Room re-joined on reconnect.
    pub fn current_room(&self) -> Option<RideId> {
        *self.shared.room.lock()
    }

    /// Set the identity sent as `auth`; sends it now when connected.
    pub fn authenticate(&self, user_id: impl Into<String>) {
        let user_id = user_id.into();
        *self.shared.user_id.lock() = Some(user_id.clone());
        if let Err(e) = self.send(OutboundMessage::Auth { user_id }) {
            debug!(error = %e, "Auth deferred until connected");
        }
    }

    /// Register a handler for frames of the given `type`.
    pub fn on<F>(&self, kind: impl Into<String>, handler: F) -> HandlerId
    where
        F: Fn(&Frame) + Send + Sync + 'static,
    {
        let id = HandlerId(self.shared.next_handler.fetch_add(1, Ordering::Relaxed));
        self.shared
            .handlers
            .lock()
            .push((id, kind.into(), Arc::new(handler)));
        id
    }

    /// Remove a handler. Returns false if it was not registered.
    pub fn off(&self, id: HandlerId) -> bool {
        let mut handlers = self.shared.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(hid, _, _)| *hid != id);
        handlers.len() != before
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.shared.events.subscribe()
    }

    /// Close intentionally. The supervisor will not reconnect.
    pub fn disconnect(&self) {
        self.shared.shutdown.cancel();
    }
}

/// Owns the WebSocket connection and its reconnect loop.
pub struct ConnectionSupervisor {
    config: SupervisorConfig,
    shared: Arc<Shared>,
}

impl ConnectionSupervisor {
    pub fn new(config: SupervisorConfig) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let shared = Arc::new(Shared {
            state: Mutex::new(ConnectionState::Disconnected),
            user_id: Mutex::new(config.user_id.clone()),
            room: Mutex::new(None),
            outbound: Mutex::new(None),
            handlers: Mutex::new(Vec::new()),
            next_handler: AtomicU64::new(1),
            events,
            shutdown: CancellationToken::new(),
        });
        Self { config, shared }
    }

    pub fn handle(&self) -> ConnectionHandle {
        ConnectionHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Spawn the supervisor task.
    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(self.run())
    }

    async fn run(self) {
        let shared = &self.shared;
        let mut policy = ReconnectPolicy::new(self.config.reconnect_base, self.config.max_attempts);
        let mut attempt = 0;
        info!(url = %self.config.url, "Connection supervisor started");

        loop {
            shared.set_state(ConnectionState::Connecting);
            shared.publish(ConnectionEvent::Connecting { attempt });

            let connected = tokio::select! {
                _ = shared.shutdown.cancelled() => break,
                result = tokio::time::timeout(CONNECT_TIMEOUT, connect_async(self.config.url.as_str())) => result,
            };

            let code = match connected {
                Ok(Ok((socket, _))) => {
                    policy.on_connected();
                    self.session(socket).await
                }
                Ok(Err(e)) => {
                    warn!(url = %self.config.url, error = %e, "WebSocket connect failed");
                    ABNORMAL_CLOSURE
                }
                Err(_) => {
                    warn!(url = %self.config.url, "WebSocket connect timed out");
                    ABNORMAL_CLOSURE
                }
            };

            shared.set_state(ConnectionState::Disconnected);
            shared.publish(ConnectionEvent::Disconnected { code });

            if shared.shutdown.is_cancelled() {
                break;
            }

            match policy.on_close(code) {
                CloseDecision::Stop => {
                    info!(code, "Channel closed normally");
                    break;
                }
                CloseDecision::Retry {
                    attempt: next,
                    delay,
                } => {
                    info!(code, attempt = next, delay_ms = delay.as_millis() as u64, "Reconnect scheduled");
                    shared.publish(ConnectionEvent::ReconnectScheduled {
                        attempt: next,
                        delay,
                    });
                    attempt = next;
                    tokio::select! {
                        _ = shared.shutdown.cancelled() => break,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
                CloseDecision::GiveUp { attempts } => {
                    warn!(attempts, "Reconnect abandoned");
                    shared.publish(ConnectionEvent::ReconnectAbandoned { attempts });
                    break;
                }
            }
        }

        shared.set_state(ConnectionState::Disconnected);
        info!("Connection supervisor stopped");
    }

    /// Resume the session on a fresh socket and pump it until it closes.
    ///
    /// Returns the close code.
    async fn session(&self, socket: Socket) -> u16 {
        let shared = &self.shared;
        let (mut write, mut read) = socket.split();
        let mut rx = self.open_outbound();
        shared.publish(ConnectionEvent::Connected);
        info!(url = %self.config.url, "Channel connected");

        let period = self.config.heartbeat_interval;
        let mut heartbeat = tokio::time::interval_at(Instant::now() + period, period);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let code = loop {
            tokio::select! {
                _ = shared.shutdown.cancelled() => {
                    *shared.outbound.lock() = None;
                    shared.set_state(ConnectionState::Closing);
                    let close = CloseFrame {
                        code: CloseCode::Normal,
                        reason: "client disconnect".into(),
                    };
                    let _ = write.send(Message::Close(Some(close))).await;
                    break NORMAL_CLOSURE;
                }
                Some(message) = rx.recv() => {
                    if let Err(e) = write.send(message).await {
                        debug!(error = %e, "Outbound send failed");
                        break ABNORMAL_CLOSURE;
                    }
                }
                _ = heartbeat.tick() => {
                    let ping = OutboundMessage::Ping.to_frame(Utc::now()).to_json();
                    if let Err(e) = write.send(Message::Text(ping.into())).await {
                        debug!(error = %e, "Heartbeat send failed");
                        break ABNORMAL_CLOSURE;
                    }
                    trace!("Heartbeat sent");
                }
                incoming = read.next() => match incoming {
                    Some(Ok(Message::Text(text))) => shared.dispatch(&text),
                    Some(Ok(Message::Close(frame))) => {
                        break frame.map(|f| u16::from(f.code)).unwrap_or(ABNORMAL_CLOSURE);
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        debug!(error = %e, "Channel read failed");
                        break ABNORMAL_CLOSURE;
                    }
                    None => break ABNORMAL_CLOSURE,
                },
            }
        };

        *shared.outbound.lock() = None;
        code
    }

    /// Queue the resume frames, then open the channel to senders and mark
    /// the state Connected, all under the outbound lock.
    fn open_outbound(&self) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut outbound = self.shared.outbound.lock();
        for message in self.resume_messages() {
            let text = message.to_frame(Utc::now()).to_json();
            // rx is still held here, so this cannot fail.
            let _ = tx.send(Message::Text(text.into()));
        }
        *outbound = Some(tx);
        self.shared.set_state(ConnectionState::Connected);
        rx
    }

    /// `auth` (when a user is set) followed by `join_ride` for the current room.
    fn resume_messages(&self) -> Vec<OutboundMessage> {
        let mut messages = Vec::new();
        if let Some(user_id) = self.shared.user_id.lock().clone() {
            messages.push(OutboundMessage::Auth { user_id });
        }
        if let Some(ride_id) = *self.shared.room.lock() {
            messages.push(OutboundMessage::JoinRide { ride_id });
        }
        messages
    }
}
