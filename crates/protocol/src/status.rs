//! Connection lifecycle status.

use serde::{Deserialize, Serialize};

/// Lifecycle states surfaced by the XMPP transport.
///
/// The set mirrors the status codes the underlying library reports while a
/// stream is being established, torn down, or re-attached. The wrapper only
/// ever inspects these through [`is_connected`](ConnectionStatus::is_connected);
/// everything else is pass-through for the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    /// Unrecoverable stream error.
    Error,
    /// Transport is being established.
    Connecting,
    /// Transport could not be established.
    ConnFail,
    /// Credentials are being negotiated.
    Authenticating,
    /// Server rejected the credentials.
    AuthFail,
    /// A fresh session is live.
    Connected,
    /// The stream is being torn down.
    Disconnecting,
    /// The session is gone.
    Disconnected,
    /// A prior session was re-attached instead of re-authenticated.
    Attached,
}

impl ConnectionStatus {
    /// True for the two states in which stanzas can be exchanged.
    pub fn is_connected(self) -> bool {
        matches!(
            self,
            ConnectionStatus::Connected | ConnectionStatus::Attached
        )
    }

    /// True once the transport has given up on this session.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            ConnectionStatus::Error
                | ConnectionStatus::ConnFail
                | ConnectionStatus::AuthFail
                | ConnectionStatus::Disconnected
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connected_and_attached_count_as_connected() {
        assert!(ConnectionStatus::Connected.is_connected());
        assert!(ConnectionStatus::Attached.is_connected());
    }

    #[test]
    fn every_other_status_counts_as_not_connected() {
        for status in [
            ConnectionStatus::Error,
            ConnectionStatus::Connecting,
            ConnectionStatus::ConnFail,
            ConnectionStatus::Authenticating,
            ConnectionStatus::AuthFail,
            ConnectionStatus::Disconnecting,
            ConnectionStatus::Disconnected,
        ] {
            assert!(!status.is_connected(), "{status:?} must not be connected");
        }
    }

    #[test]
    fn terminal_states() {
        assert!(ConnectionStatus::AuthFail.is_terminal());
        assert!(ConnectionStatus::Disconnected.is_terminal());
        assert!(!ConnectionStatus::Connecting.is_terminal());
        assert!(!ConnectionStatus::Attached.is_terminal());
    }
}
