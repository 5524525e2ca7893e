//! Realtime notification channel.
//!
//! A single WebSocket connection per client. Inbound messages go to the
//! handlers registered for their kind, then to wildcard handlers, then to the
//! built-in notifier. A dropped connection is retried on a fixed delay a
//! bounded number of times before the channel gives up for good.

mod channel;
mod handlers;
mod reconnect;

use serde::Serialize;
use thiserror::Error;

pub use channel::RealtimeChannel;
pub use handlers::{Handler, HandlerId, HandlerRegistry};
pub use reconnect::ReconnectPolicy;
pub use talent_ops_core::realtime::{Envelope, MessageKind, Topic};

#[derive(Debug, Error)]
pub enum RealtimeError {
    #[error("Realtime channel requires a Tokio runtime")]
    NoRuntime,
}

/// Connection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ChannelStatus {
    /// Never connected.
    Idle,
    /// First connection attempt in flight.
    Connecting,
    Open,
    /// Waiting before (or performing) reconnect attempt `attempt`.
    Reconnecting { attempt: u32 },
    /// Attempt budget exhausted. Only an explicit `connect` starts over.
    GaveUp,
    /// Stopped by `disconnect`.
    Closed,
}

impl ChannelStatus {
    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self, Self::Open)
    }
}

impl std::fmt::Display for ChannelStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
            Self::Reconnecting { attempt } => write!(f, "reconnecting (attempt {attempt})"),
            Self::GaveUp => write!(f, "gave up"),
            Self::Closed => write!(f, "closed"),
        }
    }
}
