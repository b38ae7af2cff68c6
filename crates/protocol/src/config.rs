//! Server addressing.

use serde::{Deserialize, Serialize};

/// The server pair a client signs into.
///
/// `chat_server` is the domain users authenticate against;
/// `conference_server` is the domain hosting the multi-user chat rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerConfig {
    pub chat_server: String,
    pub conference_server: String,
}

impl ServerConfig {
    pub const DEFAULT_CHAT_SERVER: &'static str = "chatyuk.com";
    pub const DEFAULT_CONFERENCE_SERVER: &'static str = "conference.chatyuk.com";

    pub fn new(chat_server: impl Into<String>, conference_server: impl Into<String>) -> Self {
        Self {
            chat_server: chat_server.into(),
            conference_server: conference_server.into(),
        }
    }

    /// Login JID for a user: `user@chat_server`.
    pub fn user_jid(&self, username: &str) -> String {
        format!("{username}@{}", self.chat_server)
    }

    /// Room JID: `room@conference_server`.
    pub fn room_jid(&self, room: &str) -> String {
        format!("{room}@{}", self.conference_server)
    }

    /// Occupant JID inside a room: `room@conference_server/nick`.
    pub fn occupant_jid(&self, room: &str, nick: &str) -> String {
        format!("{}/{nick}", self.room_jid(room))
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CHAT_SERVER, Self::DEFAULT_CONFERENCE_SERVER)
    }
}
