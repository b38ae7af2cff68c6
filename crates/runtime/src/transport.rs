//! Transport seam between the session wrapper and the XMPP library.
//!
//! The wrapper never calls the library directly: it sees a write half, a
//! read half, and a stream of [`TransportEvent`]s. Production code wires
//! these to a `tokio-xmpp` client ([`StreamTransport`]); tests wire them to
//! an in-memory fake.
//!
//! [`StreamTransport`]: crate::client::StreamTransport

use std::future::Future;
use std::pin::Pin;

use minidom::Element;
use tokio::sync::mpsc;

use crate::error::Result;
use chatyuk_protocol::ConnectionStatus;

/// Events surfaced by a transport backend.
#[derive(Debug)]
pub enum TransportEvent {
    /// Connection lifecycle state changed.
    Status(ConnectionStatus),
    /// The stream is up and a JID has been bound.
    ///
    /// `resumed` is true when the library re-attached a previous stream
    /// instead of negotiating a fresh one.
    Online { bound_jid: String, resumed: bool },
    /// Inbound stanza.
    Stanza(Element),
    /// The stream went away; no further events will follow.
    Disconnected { reason: String },
}

/// Write half of a transport.
///
/// `send` queues a stanza for delivery; delivery order matches call order.
pub trait TransportSender: Send {
    fn send(&mut self, stanza: Element) -> Result<()>;

    /// Ask the backend to end the stream cleanly.
    fn close(&mut self) -> Result<()>;
}

/// Read half of a transport.
///
/// `run` drives the backend until the stream ends; it is consumed by the
/// task that polls it.
pub trait TransportReceiver: Send {
    fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>>;
}

/// Bundle handed to [`Connection::new`].
///
/// [`Connection::new`]: crate::connection::Connection::new
pub struct TransportParts {
    pub sender: Box<dyn TransportSender>,
    pub receiver: Box<dyn TransportReceiver>,
    pub event_rx: mpsc::UnboundedReceiver<TransportEvent>,
}
