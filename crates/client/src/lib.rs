//! Realtime detection streaming client.
//!
//! Connects a local frame source to the inference service over
//! WebSocket: frames are sampled, downscaled, JPEG-encoded, and sent
//! as JSON; detection results come back on the same socket and are
//! fanned out to subscribers as [`SessionEvent`]s.
//!
//! At most one session runs at a time. The session owns its capture
//! source and socket; stopping (or a benign server close) returns the
//! controller to idle, while transport failures surface as an error
//! state. Reconnection is off unless a [`ReconnectPolicy`] enables it.

pub mod events;
pub mod messages;
pub mod reconnect;
pub mod session;

pub use events::{DisconnectReason, SessionEvent};
pub use messages::{
    parse_inbound, ConfigPayload, ControlMessage, InboundMessage, InferenceResult, OutboundMessage,
};
pub use reconnect::{next_delay, BackoffConfig, ReconnectPolicy};
pub use session::{SessionConfig, SessionController, SessionError, SessionStatus};
