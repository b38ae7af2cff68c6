//! Persisted session shape.

use serde::{Deserialize, Serialize};

/// Identifiers a live connection exposes for later re-attachment.
///
/// Over a stream transport the session identity is the bound resource
/// (`sid`) plus the outbound stanza counter (`rid`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTicket {
    pub sid: String,
    pub rid: u64,
}

/// A session restored from, or about to be written to, the cookie jar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedSession {
    pub user: String,
    pub room: String,
    pub sid: String,
    pub rid: u64,
}

impl SavedSession {
    pub fn ticket(&self) -> SessionTicket {
        SessionTicket {
            sid: self.sid.clone(),
            rid: self.rid,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_session_round_trips_through_json() {
        let session = SavedSession {
            user: "fakeuser".into(),
            room: "fakeroom".into(),
            sid: "fakesid-123123".into(),
            rid: 999,
        };
        let json = serde_json::to_string(&session).unwrap();
        let back: SavedSession = serde_json::from_str(&json).unwrap();
        assert_eq!(back, session);
    }
}
