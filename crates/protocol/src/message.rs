//! Chat message as delivered to the UI layer.

use serde::{Deserialize, Serialize};

/// A single groupchat message.
///
/// `sender` is the occupant nickname, i.e. the resource part of the room
/// JID the message came from. Messages without a named occupant (room-level
/// broadcasts) never reach this type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Occupant nickname the message came from.
    pub sender: String,
    /// Message body text.
    pub body: String,
}

impl ChatMessage {
    pub fn new(sender: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            sender: sender.into(),
            body: body.into(),
        }
    }
}
