//! Error types for the chatyuk runtime.

use thiserror::Error;

/// Result type alias for runtime operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the chatyuk runtime.
#[derive(Debug, Error)]
pub enum Error {
    /// Transport could not be established.
    #[error("failed to connect to chat server: {0}")]
    ConnectFailed(String),

    /// Server rejected the credentials.
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// Transport-level failure after the stream was up.
    #[error("transport error: {0}")]
    Transport(String),

    /// Operation requires a live session.
    #[error("not connected")]
    NotConnected,

    /// Internal channel closed unexpectedly.
    #[error("channel closed unexpectedly")]
    ChannelClosed,

    /// A JID could not be parsed.
    #[error("invalid JID '{jid}': {reason}")]
    InvalidJid { jid: String, reason: String },

    /// Timeout waiting for an operation.
    #[error("timeout: {0}")]
    Timeout(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Builds [`Error::InvalidJid`] from the offending input and parse error.
    pub fn invalid_jid(jid: impl Into<String>, reason: impl ToString) -> Self {
        Error::InvalidJid {
            jid: jid.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns true if this error means the credentials were rejected.
    pub fn is_auth(&self) -> bool {
        matches!(self, Error::AuthFailed(_))
    }

    /// Returns true if this is a timeout error.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout(_))
    }
}
