use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of one chat transport.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// The transport has been requested but is not ready.
    Connecting,

    /// The handshake has been sent; user turns may flow.
    Open,

    /// The transport is gone.  Only a fresh `open` leaves this state.
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Open => write!(f, "open"),
            ConnectionState::Closed => write!(f, "closed"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_lowercase() {
        assert_eq!(ConnectionState::Connecting.to_string(), "connecting");
        assert_eq!(ConnectionState::Open.to_string(), "open");
        assert_eq!(ConnectionState::Closed.to_string(), "closed");
    }

    #[test]
    fn serde_matches_display() {
        let value = serde_json::to_value(ConnectionState::Open).unwrap();
        assert_eq!(value, serde_json::json!("open"));
    }
}
