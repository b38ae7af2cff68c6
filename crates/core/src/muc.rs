//! Groupchat stanza glue.
//!
//! Building and parsing delegate to `xmpp-parsers`; this module only
//! decides which stanzas count as room traffic and what the UI layer gets
//! to see of them.

use jid::Jid;
use minidom::Element;
use xmpp_parsers::message::{Body, Message, MessageType};
use xmpp_parsers::muc::Muc;
use xmpp_parsers::ns;
use xmpp_parsers::presence::{Presence, Type as PresenceType};

use chatyuk_protocol::ChatMessage;
use chatyuk_runtime::{Error, Result};

/// Presence that joins a room as the nick in `occupant_jid`
/// (`room@conference/nick`).
pub fn join_presence(occupant_jid: &str) -> Result<Element> {
    let to = parse_jid(occupant_jid)?;
    let mut presence = Presence::new(PresenceType::None).with_to(to);
    presence.add_payload(Muc::new());
    Ok(presence.into())
}

/// Presence that leaves the room joined as `occupant_jid`.
pub fn leave_presence(occupant_jid: &str) -> Result<Element> {
    let to = parse_jid(occupant_jid)?;
    Ok(Presence::new(PresenceType::Unavailable).with_to(to).into())
}

/// Groupchat message addressed to `room_jid`.
pub fn groupchat(room_jid: &str, body: &str) -> Result<Element> {
    let to = parse_jid(room_jid)?;
    let mut message = Message::new(Some(to));
    message.type_ = MessageType::Groupchat;
    message.bodies.insert(String::new(), Body(body.to_string()));
    Ok(message.into())
}

/// Extract a chat message from an inbound stanza.
///
/// Returns `Some` only for groupchat messages that carry a non-empty body
/// and come from a named occupant. Everything else - chat-state-only
/// stanzas, room subjects, bare-JID room broadcasts, presences, iqs - is
/// not room chatter and yields `None`.
pub fn extract_message(stanza: &Element) -> Option<ChatMessage> {
    if !stanza.is("message", ns::DEFAULT_NS) {
        return None;
    }

    let message = Message::try_from(stanza.clone()).ok()?;
    if message.type_ != MessageType::Groupchat {
        return None;
    }

    // The sender is the occupant nick: the resource part of the room JID.
    // Bare-JID messages are room-level broadcasts, not occupant chatter.
    let from = message.from.as_ref()?.to_string();
    let (_, sender) = from.rsplit_once('/')?;

    let body = message
        .bodies
        .get("")
        .or_else(|| message.bodies.values().next())?;
    if body.0.is_empty() {
        return None;
    }

    Some(ChatMessage::new(sender.to_string(), body.0.clone()))
}

fn parse_jid(jid: &str) -> Result<Jid> {
    jid.parse().map_err(|err| Error::invalid_jid(jid, err))
}
