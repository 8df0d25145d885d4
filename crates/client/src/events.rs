//! Events emitted by a streaming session.

use std::sync::Arc;

use crate::messages::InferenceResult;

/// Why a session's transport went away.
#[derive(Debug, Clone, PartialEq)]
pub enum DisconnectReason {
    /// The server closed with a benign code (1000, 1001, or 1005).
    ServerClosed { code: Option<u16> },
    /// The server closed with any other code.
    AbnormalClose { code: u16 },
    /// The TCP stream dropped without a close handshake.
    TransportLost(String),
}

/// A high-level session event, fanned out to all subscribers.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// The WebSocket connection was established and config was sent.
    Connected,

    /// The server acknowledged the detection configuration.
    ConfigAcknowledged,

    /// One detection result arrived.
    Results(Arc<InferenceResult>),

    /// The transport went away; the session may be reconnecting or
    /// ending depending on policy.
    Disconnected(DisconnectReason),

    /// The capture source finished (file playback reached its end).
    SourceEnded,
}
