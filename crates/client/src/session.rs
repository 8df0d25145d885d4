//! Streaming session lifecycle.
//!
//! [`SessionController`] owns at most one live session. A session
//! captures frames from its source, samples them through a
//! [`RateControl`] strategy, ships them to the inference service, and
//! fans results out as [`SessionEvent`]s.
//!
//! The lifecycle is an explicit state machine observable through a
//! watch channel: idle -> connecting -> active, ending back in idle
//! (operator stop, benign server close, source exhausted) or in error
//! (media failure, abnormal transport loss without a reconnect
//! policy).

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{broadcast, watch, Mutex};
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use vigia_capture::{open_source, CaptureError, FrameSource, SourceConfig};
use vigia_core::{DetectionOptions, RateControl, RollingCounter};

use crate::events::{DisconnectReason, SessionEvent};
use crate::messages::{parse_inbound, ConfigPayload, ControlMessage, InboundMessage, OutboundMessage};
use crate::reconnect::{next_delay, ReconnectPolicy};

/// Broadcast channel capacity for session events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long `stop` waits for the stream task to wind down.
const STOP_TIMEOUT: Duration = Duration::from_secs(5);

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Observable session state.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionStatus {
    Idle,
    Connecting,
    Active,
    Error(String),
}

/// Everything needed to start a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Inference service WebSocket URL, e.g. `ws://host:8001/ws/inference`.
    pub ws_url: String,
    pub source: SourceConfig,
    pub options: DetectionOptions,
    /// Keepalive ping cadence.
    pub ping_interval: Duration,
    /// Bound on media acquisition before the session errors out.
    pub ready_timeout: Duration,
    pub reconnect: ReconnectPolicy,
}

impl SessionConfig {
    pub fn new(ws_url: impl Into<String>, source: SourceConfig) -> Self {
        Self {
            ws_url: ws_url.into(),
            source,
            options: DetectionOptions::default(),
            ping_interval: Duration::from_secs(5),
            ready_timeout: Duration::from_secs(5),
            reconnect: ReconnectPolicy::default(),
        }
    }
}

/// Errors surfaced by [`SessionController::start`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A session is already running; stop it first.
    #[error("A session is already active")]
    AlreadyActive,

    /// The capture source refused access.
    #[error("Media permission denied: {0}")]
    MediaPermissionDenied(String),

    /// The capture source does not exist.
    #[error("Media source not found: {0}")]
    MediaNotFound(String),

    /// The capture source did not become ready in time.
    #[error("Media source timed out becoming ready")]
    MediaTimeout,

    /// Any other capture failure.
    #[error("Media error: {0}")]
    Media(String),

    /// The initial WebSocket connection failed.
    #[error("Connection error: {0}")]
    Connection(String),
}

impl From<CaptureError> for SessionError {
    fn from(err: CaptureError) -> Self {
        match err {
            CaptureError::PermissionDenied(path) => Self::MediaPermissionDenied(path),
            CaptureError::NotFound(path) => Self::MediaNotFound(path),
            CaptureError::Timeout => Self::MediaTimeout,
            other => Self::Media(other.to_string()),
        }
    }
}

/// Internal bookkeeping for the running session.
struct ActiveSession {
    session_id: uuid::Uuid,
    /// Cancelled on stop; the stream loop closes the socket cleanly.
    cancel: CancellationToken,
    task_handle: tokio::task::JoinHandle<()>,
}

/// Owns the single streaming session and its observable state.
pub struct SessionController {
    status_tx: watch::Sender<SessionStatus>,
    event_tx: broadcast::Sender<SessionEvent>,
    active: Mutex<Option<ActiveSession>>,
}

impl Default for SessionController {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionController {
    pub fn new() -> Self {
        let (status_tx, _) = watch::channel(SessionStatus::Idle);
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            status_tx,
            event_tx,
            active: Mutex::new(None),
        }
    }

    /// Watch the session state machine.
    pub fn status(&self) -> watch::Receiver<SessionStatus> {
        self.status_tx.subscribe()
    }

    /// Subscribe to session events (results, disconnects, etc.).
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    /// Start a session: acquire media, connect, announce config, then
    /// hand off to the background stream loop.
    ///
    /// Media is acquired before any connection attempt, so a capture
    /// failure never touches the network. Fails with
    /// [`SessionError::AlreadyActive`] while a session is running.
    pub async fn start(
        &self,
        config: SessionConfig,
        rate: Box<dyn RateControl>,
    ) -> Result<(), SessionError> {
        let mut active = self.active.lock().await;
        if let Some(session) = active.as_ref() {
            if !session.task_handle.is_finished() {
                tracing::warn!(session_id = %session.session_id, "Start ignored, session already active");
                return Err(SessionError::AlreadyActive);
            }
            // Previous loop ended on its own; reap it.
            *active = None;
        }

        let session_id = uuid::Uuid::new_v4();
        self.set_status(SessionStatus::Connecting);

        let source = match self.acquire_media(&config).await {
            Ok(source) => source,
            Err(e) => {
                self.set_status(SessionStatus::Error(e.to_string()));
                return Err(e);
            }
        };

        let payload = ConfigPayload::from(&config.options);
        let (sink, stream) = match connect_and_send_config(&config.ws_url, &payload).await {
            Ok(split) => split,
            Err(e) => {
                self.set_status(SessionStatus::Error(e.to_string()));
                return Err(e);
            }
        };

        let _ = self.event_tx.send(SessionEvent::Connected);
        self.set_status(SessionStatus::Active);

        let cancel = CancellationToken::new();
        let mut stream_loop = StreamLoop {
            session_id,
            ws_url: config.ws_url.clone(),
            payload,
            reconnect: config.reconnect.clone(),
            ping_interval: config.ping_interval,
            source,
            rate,
            sink,
            stream,
            in_flight: None,
            sent_counter: RollingCounter::new(),
            result_counter: RollingCounter::new(),
            status_tx: self.status_tx.clone(),
            event_tx: self.event_tx.clone(),
            cancel: cancel.clone(),
        };

        let task_handle = tokio::spawn(async move {
            stream_loop.run().await;
            tracing::info!(session_id = %session_id, "Stream loop exited");
        });

        tracing::info!(session_id = %session_id, url = %config.ws_url, "Session started");
        *active = Some(ActiveSession {
            session_id,
            cancel,
            task_handle,
        });
        Ok(())
    }

    /// Stop the running session, closing the socket cleanly.
    ///
    /// A no-op when no session is active.
    pub async fn stop(&self) {
        let session = { self.active.lock().await.take() };
        let Some(session) = session else {
            return;
        };

        tracing::info!(session_id = %session.session_id, "Stopping session");
        session.cancel.cancel();
        if tokio::time::timeout(STOP_TIMEOUT, session.task_handle)
            .await
            .is_err()
        {
            tracing::warn!(session_id = %session.session_id, "Stream loop did not stop in time");
        }
        self.set_status(SessionStatus::Idle);
    }

    fn set_status(&self, status: SessionStatus) {
        // send_replace stores the value even with no receiver alive,
        // so late subscribers still observe the current state.
        self.status_tx.send_replace(status);
    }

    async fn acquire_media(
        &self,
        config: &SessionConfig,
    ) -> Result<Box<dyn FrameSource>, SessionError> {
        match tokio::time::timeout(config.ready_timeout, open_source(&config.source)).await {
            Ok(Ok(source)) => {
                tracing::info!(source = %source.describe(), "Media source ready");
                Ok(source)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(SessionError::MediaTimeout),
        }
    }

}

/// Connect and send the config announcement as the first message.
async fn connect_and_send_config(
    ws_url: &str,
    payload: &ConfigPayload,
) -> Result<(WsSink, WsSource), SessionError> {
    let (ws_stream, _response) = connect_async(ws_url)
        .await
        .map_err(|e| SessionError::Connection(format!("Failed to connect to {ws_url}: {e}")))?;

    let (mut sink, stream) = ws_stream.split();
    let config_json = OutboundMessage::Config {
        data: payload.clone(),
    }
    .to_json()
    .map_err(|e| SessionError::Connection(format!("Config serialization failed: {e}")))?;
    sink.send(Message::Text(config_json))
        .await
        .map_err(|e| SessionError::Connection(format!("Config send failed: {e}")))?;

    tracing::info!(url = ws_url, "Connected to inference service");
    Ok((sink, stream))
}

/// A close is benign when the server went away on purpose: normal
/// closure (1000), going away (1001), or no status (1005).
fn close_is_benign(code: Option<u16>) -> bool {
    matches!(code, None | Some(1000) | Some(1001) | Some(1005))
}

/// Why the stream loop finished.
enum LoopExit {
    Idle,
    Error(String),
}

struct StreamLoop {
    session_id: uuid::Uuid,
    ws_url: String,
    payload: ConfigPayload,
    reconnect: ReconnectPolicy,
    ping_interval: Duration,
    source: Box<dyn FrameSource>,
    rate: Box<dyn RateControl>,
    sink: WsSink,
    stream: WsSource,
    /// Set while one frame awaits its result; no new frame is sent
    /// until it clears.
    in_flight: Option<Instant>,
    sent_counter: RollingCounter,
    result_counter: RollingCounter,
    status_tx: watch::Sender<SessionStatus>,
    event_tx: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl StreamLoop {
    async fn run(&mut self) {
        let fps = self.source.nominal_fps().max(1);
        let mut frame_tick =
            tokio::time::interval(Duration::from_millis((1000 / fps as u64).max(1)));
        frame_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut ping_tick = tokio::time::interval(self.ping_interval);
        ping_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        // interval fires immediately; skip the initial ping.
        ping_tick.tick().await;

        let exit = loop {
            tokio::select! {
                _ = self.cancel.cancelled() => {
                    self.close_normally().await;
                    break LoopExit::Idle;
                }
                _ = ping_tick.tick() => {
                    if let Err(e) = self.send_json(&OutboundMessage::Ping).await {
                        if let Some(exit) = self.on_transport_lost(e.to_string()).await {
                            break exit;
                        }
                    }
                }
                _ = frame_tick.tick() => {
                    match self.on_frame_tick().await {
                        Ok(None) => {}
                        Ok(Some(exit)) => break exit,
                        Err(e) => {
                            if let Some(exit) = self.on_transport_lost(e.to_string()).await {
                                break exit;
                            }
                        }
                    }
                }
                incoming = self.stream.next() => {
                    if let Some(exit) = self.on_incoming(incoming).await {
                        break exit;
                    }
                }
            }
        };

        match exit {
            LoopExit::Idle => {
                self.status_tx.send_replace(SessionStatus::Idle);
            }
            LoopExit::Error(message) => {
                tracing::error!(session_id = %self.session_id, error = %message, "Session failed");
                self.status_tx.send_replace(SessionStatus::Error(message));
            }
        }
    }

    async fn close_normally(&mut self) {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "client stopping".into(),
        };
        let _ = self.sink.send(Message::Close(Some(frame))).await;
    }

    async fn send_json(
        &mut self,
        message: &OutboundMessage,
    ) -> Result<(), tokio_tungstenite::tungstenite::Error> {
        let json = match message.to_json() {
            Ok(json) => json,
            Err(e) => {
                tracing::error!(session_id = %self.session_id, error = %e, "Message serialization failed");
                return Ok(());
            }
        };
        self.sink.send(Message::Text(json)).await
    }

    /// Pull the next frame; ship it if the rate control samples this
    /// tick and no frame is in flight.
    async fn on_frame_tick(
        &mut self,
    ) -> Result<Option<LoopExit>, tokio_tungstenite::tungstenite::Error> {
        // Frames are consumed every tick to stay realtime; sampling
        // decides which of them go on the wire.
        let frame = match self.source.next_frame().await {
            Ok(frame) => frame,
            Err(CaptureError::EndOfStream) => {
                tracing::info!(session_id = %self.session_id, "Capture source ended");
                let _ = self.event_tx.send(SessionEvent::SourceEnded);
                self.close_normally().await;
                return Ok(Some(LoopExit::Idle));
            }
            Err(e) => {
                return Ok(Some(LoopExit::Error(format!("Capture failed: {e}"))));
            }
        };

        let Some(decision) = self.rate.on_tick() else {
            return Ok(None);
        };
        if self.in_flight.is_some() {
            tracing::trace!(session_id = %self.session_id, "Skipping sampled frame, one in flight");
            return Ok(None);
        }

        let jpeg = match vigia_capture::encode::encode_jpeg(&frame, decision.scale, decision.jpeg_quality)
        {
            Ok(jpeg) => jpeg,
            Err(e) => {
                tracing::warn!(session_id = %self.session_id, error = %e, "Frame encode failed");
                return Ok(None);
            }
        };

        use base64::Engine;
        let image = base64::engine::general_purpose::STANDARD.encode(&jpeg);
        self.send_json(&OutboundMessage::Frame {
            image,
            config: self.payload.clone(),
        })
        .await?;

        self.in_flight = Some(Instant::now());
        if let Some(rate) = self.sent_counter.record() {
            tracing::debug!(session_id = %self.session_id, sent_fps = rate, "Outgoing frame rate");
        }
        Ok(None)
    }

    /// Handle one inbound socket item. `Some(exit)` ends the loop.
    async fn on_incoming(
        &mut self,
        incoming: Option<Result<Message, tokio_tungstenite::tungstenite::Error>>,
    ) -> Option<LoopExit> {
        match incoming {
            Some(Ok(Message::Text(text))) => {
                self.on_text(&text);
                None
            }
            Some(Ok(Message::Ping(_) | Message::Pong(_))) => {
                // Handled automatically by tungstenite.
                None
            }
            Some(Ok(Message::Binary(_) | Message::Frame(_))) => None,
            Some(Ok(Message::Close(frame))) => {
                let code = frame.as_ref().map(|f| u16::from(f.code));
                if close_is_benign(code) {
                    tracing::info!(session_id = %self.session_id, ?code, "Server closed the session");
                    let _ = self
                        .event_tx
                        .send(SessionEvent::Disconnected(DisconnectReason::ServerClosed {
                            code,
                        }));
                    Some(LoopExit::Idle)
                } else {
                    let code = code.unwrap_or(1006);
                    let _ = self
                        .event_tx
                        .send(SessionEvent::Disconnected(DisconnectReason::AbnormalClose {
                            code,
                        }));
                    self.on_transport_lost(format!("Server closed with code {code}"))
                        .await
                }
            }
            Some(Err(e)) => {
                let _ = self
                    .event_tx
                    .send(SessionEvent::Disconnected(DisconnectReason::TransportLost(
                        e.to_string(),
                    )));
                self.on_transport_lost(e.to_string()).await
            }
            None => {
                let _ = self
                    .event_tx
                    .send(SessionEvent::Disconnected(DisconnectReason::TransportLost(
                        "stream ended".to_string(),
                    )));
                self.on_transport_lost("stream ended".to_string()).await
            }
        }
    }

    fn on_text(&mut self, text: &str) {
        match parse_inbound(text) {
            Ok(InboundMessage::Control(ControlMessage::Pong)) => {
                tracing::trace!(session_id = %self.session_id, "Pong");
            }
            Ok(InboundMessage::Control(ControlMessage::ConfigReceived { status })) => {
                tracing::info!(session_id = %self.session_id, status = %status, "Config acknowledged");
                let _ = self.event_tx.send(SessionEvent::ConfigAcknowledged);
            }
            Ok(InboundMessage::Result(result)) => {
                if let Some(sent_at) = self.in_flight.take() {
                    self.rate.on_round_trip(sent_at.elapsed());
                }
                if let Some(error) = &result.error {
                    tracing::warn!(session_id = %self.session_id, error = %error, "Server-side frame error");
                }
                if let Some(rate) = self.result_counter.record() {
                    tracing::debug!(session_id = %self.session_id, processing_fps = rate, "Result rate");
                }
                let _ = self.event_tx.send(SessionEvent::Results(Arc::new(result)));
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    error = %e,
                    raw_message = %text,
                    "Failed to parse inference message",
                );
                // An unparseable reply still ends the round trip.
                self.in_flight = None;
            }
        }
    }

    /// The transport dropped abnormally. Reconnect when the policy
    /// allows it, otherwise end in error.
    async fn on_transport_lost(&mut self, reason: String) -> Option<LoopExit> {
        let ReconnectPolicy::Backoff(config) = self.reconnect.clone() else {
            return Some(LoopExit::Error(reason));
        };

        self.status_tx.send_replace(SessionStatus::Connecting);
        let mut delay = config.initial_delay;
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            tracing::info!(
                session_id = %self.session_id,
                attempt,
                delay_ms = delay.as_millis() as u64,
                "Reconnecting to inference service",
            );

            tokio::select! {
                _ = self.cancel.cancelled() => return Some(LoopExit::Idle),
                _ = tokio::time::sleep(delay) => {}
            }

            tokio::select! {
                _ = self.cancel.cancelled() => return Some(LoopExit::Idle),
                result = connect_and_send_config(&self.ws_url, &self.payload) => {
                    match result {
                        Ok((sink, stream)) => {
                            tracing::info!(session_id = %self.session_id, attempt, "Reconnected");
                            self.sink = sink;
                            self.stream = stream;
                            self.in_flight = None;
                            self.rate.reset();
                            let _ = self.event_tx.send(SessionEvent::Connected);
                            self.status_tx.send_replace(SessionStatus::Active);
                            return None;
                        }
                        Err(e) => {
                            tracing::warn!(
                                session_id = %self.session_id,
                                error = %e,
                                "Reconnect attempt {attempt} failed",
                            );
                        }
                    }
                }
            }

            if config.max_attempts > 0 && attempt >= config.max_attempts {
                return Some(LoopExit::Error(format!(
                    "Reconnect gave up after {attempt} attempts: {reason}"
                )));
            }
            delay = next_delay(delay, &config);
        }
    }
}
