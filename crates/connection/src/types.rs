//! Public types for the connection manager.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of the managed socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionState {
    /// No connection has been attempted yet.
    #[default]
    Idle,
    /// WebSocket handshake in progress.
    Connecting,
    /// Connected; sends go straight to the wire.
    Open,
    /// An explicit disconnect is closing the socket.
    Closing,
    /// Connection lost or closed.
    Closed,
}

impl ConnectionState {
    pub fn is_open(self) -> bool {
        self == Self::Open
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}

/// Events delivered to connection listeners.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The connection state changed. Also replayed to every new listener
    /// with the current state.
    StateChanged(ConnectionState),
    /// A reconnect was scheduled.
    Reconnecting { attempt: u32, delay: Duration },
    /// The reconnect budget is exhausted; only an explicit `connect()` or
    /// `enable()` starts a new cycle.
    GaveUp { attempts: u32 },
}

/// Result of handing a message to the manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendOutcome {
    /// Written to the open socket.
    Sent,
    /// Held in the outbound queue until the next successful connection.
    Queued,
    /// Not a sendable message (null, non-object, empty text, unserializable).
    Rejected,
}

/// Point-in-time snapshot of the connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionInfo {
    pub state: ConnectionState,
    pub connected: bool,
    pub reconnect_attempts: u32,
    pub queued_messages: usize,
    pub last_activity: DateTime<Utc>,
    /// Rounded mean round-trip latency over the sample window, if any samples
    /// were recorded.
    pub average_latency_ms: Option<u64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_display_matches_serde() {
        for state in [
            ConnectionState::Idle,
            ConnectionState::Connecting,
            ConnectionState::Open,
            ConnectionState::Closing,
            ConnectionState::Closed,
        ] {
            let json = serde_json::to_value(state).unwrap();
            assert_eq!(json, serde_json::Value::String(state.to_string()));
        }
    }

    #[test]
    fn only_open_is_open() {
        assert!(ConnectionState::Open.is_open());
        assert!(!ConnectionState::Connecting.is_open());
        assert!(!ConnectionState::Closing.is_open());
    }

    #[test]
    fn info_serializes_camel_case() {
        let info = ConnectionInfo {
            state: ConnectionState::Open,
            connected: true,
            reconnect_attempts: 0,
            queued_messages: 2,
            last_activity: DateTime::from_timestamp(0, 0).unwrap(),
            average_latency_ms: Some(12),
        };
        let json = serde_json::to_value(&info).unwrap();
        assert_eq!(json["state"], "open");
        assert_eq!(json["queuedMessages"], 2);
        assert_eq!(json["averageLatencyMs"], 12);
        assert_eq!(json["reconnectAttempts"], 0);
    }
}
