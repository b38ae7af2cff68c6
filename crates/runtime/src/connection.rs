//! Session-level connection over a transport.
//!
//! `Connection` owns the write half of a transport plus the two pieces of
//! session bookkeeping the wrapper persists between runs: the request id
//! (a counter of outbound stanzas, continued across re-attachment) and the
//! session id (the resource the server bound). It also caches the last
//! status the transport reported so the wrapper can answer `is_connected`
//! without waiting on the event stream.
//!
//! The read half and the event stream are taken exactly once, by whoever
//! drives the session (the wrapper's event pump).

use std::sync::atomic::{AtomicU64, Ordering};

use minidom::Element;
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::transport::{TransportEvent, TransportParts, TransportReceiver, TransportSender};
use chatyuk_protocol::{ConnectionStatus, SessionTicket};

pub struct Connection {
    sender: Mutex<Box<dyn TransportSender>>,
    receiver: Mutex<Option<Box<dyn TransportReceiver>>>,
    event_rx: Mutex<Option<mpsc::UnboundedReceiver<TransportEvent>>>,
    status: Mutex<Option<ConnectionStatus>>,
    sid: Mutex<Option<String>>,
    rid: AtomicU64,
}

impl Connection {
    /// Wrap transport parts. `initial_rid` continues a restored session's
    /// stanza counter; fresh sessions start at zero.
    pub fn new(parts: TransportParts, initial_rid: u64) -> Self {
        let TransportParts {
            sender,
            receiver,
            event_rx,
        } = parts;

        Self {
            sender: Mutex::new(sender),
            receiver: Mutex::new(Some(receiver)),
            event_rx: Mutex::new(Some(event_rx)),
            status: Mutex::new(None),
            sid: Mutex::new(None),
            rid: AtomicU64::new(initial_rid),
        }
    }

    /// Spawn the transport receiver onto the runtime.
    pub fn start(&self) -> JoinHandle<Result<()>> {
        let receiver = self
            .receiver
            .lock()
            .take()
            .expect("start() can only be called once - receiver already taken");
        tokio::spawn(receiver.run())
    }

    /// Take the inbound event stream.
    pub fn take_events(&self) -> mpsc::UnboundedReceiver<TransportEvent> {
        self.event_rx
            .lock()
            .take()
            .expect("take_events() can only be called once - event stream already taken")
    }

    /// Queue a stanza and advance the request id.
    pub fn send_stanza(&self, stanza: Element) -> Result<()> {
        self.sender.lock().send(stanza)?;
        self.rid.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    /// Ask the transport to end the stream cleanly.
    pub fn close(&self) -> Result<()> {
        self.sender.lock().close()
    }

    /// Current request id: count of stanzas handed to the transport.
    pub fn rid(&self) -> u64 {
        self.rid.load(Ordering::SeqCst)
    }

    /// Record the resource the server bound for this session.
    pub fn record_sid(&self, sid: impl Into<String>) {
        *self.sid.lock() = Some(sid.into());
    }

    /// Re-attachment ticket, available once a resource has been bound.
    pub fn ticket(&self) -> Option<SessionTicket> {
        self.sid.lock().as_ref().map(|sid| SessionTicket {
            sid: sid.clone(),
            rid: self.rid(),
        })
    }

    /// Record a status reported by the transport.
    pub fn record_status(&self, status: ConnectionStatus) {
        *self.status.lock() = Some(status);
    }

    /// Last status the transport reported; `None` until it reports anything.
    pub fn status(&self) -> Option<ConnectionStatus> {
        *self.status.lock()
    }

    pub fn is_connected(&self) -> bool {
        self.status().is_some_and(ConnectionStatus::is_connected)
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("status", &self.status())
            .field("rid", &self.rid())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use std::future::Future;
    use std::pin::Pin;

    struct FakeSender {
        tx: mpsc::UnboundedSender<Element>,
    }

    impl TransportSender for FakeSender {
        fn send(&mut self, stanza: Element) -> Result<()> {
            self.tx.send(stanza).map_err(|_| Error::ChannelClosed)
        }

        fn close(&mut self) -> Result<()> {
            Ok(())
        }
    }

    struct FakeReceiver;

    impl TransportReceiver for FakeReceiver {
        fn run(self: Box<Self>) -> Pin<Box<dyn Future<Output = Result<()>> + Send>> {
            Box::pin(async { Ok(()) })
        }
    }

    fn fake_connection(initial_rid: u64) -> (Connection, mpsc::UnboundedReceiver<Element>) {
        let (sent_tx, sent_rx) = mpsc::unbounded_channel();
        let (_event_tx, event_rx) = mpsc::unbounded_channel();
        let parts = TransportParts {
            sender: Box::new(FakeSender { tx: sent_tx }),
            receiver: Box::new(FakeReceiver),
            event_rx,
        };
        (Connection::new(parts, initial_rid), sent_rx)
    }

    fn stanza() -> Element {
        Element::builder("message", "jabber:client").build()
    }

    #[test]
    fn rid_increments_per_stanza() {
        let (connection, _sent) = fake_connection(0);

        assert_eq!(connection.rid(), 0);
        connection.send_stanza(stanza()).unwrap();
        connection.send_stanza(stanza()).unwrap();
        assert_eq!(connection.rid(), 2);
    }

    #[test]
    fn rid_continues_from_restored_value() {
        let (connection, _sent) = fake_connection(999);

        connection.send_stanza(stanza()).unwrap();
        assert_eq!(connection.rid(), 1000);
    }

    #[test]
    fn rid_does_not_advance_on_failed_send() {
        let (connection, sent) = fake_connection(5);
        drop(sent);

        assert!(matches!(
            connection.send_stanza(stanza()),
            Err(Error::ChannelClosed)
        ));
        assert_eq!(connection.rid(), 5);
    }

    #[test]
    fn status_is_none_until_recorded() {
        let (connection, _sent) = fake_connection(0);

        assert_eq!(connection.status(), None);
        assert!(!connection.is_connected());

        connection.record_status(ConnectionStatus::Connecting);
        assert_eq!(connection.status(), Some(ConnectionStatus::Connecting));
        assert!(!connection.is_connected());

        connection.record_status(ConnectionStatus::Attached);
        assert!(connection.is_connected());
    }

    #[test]
    fn ticket_requires_a_bound_resource() {
        let (connection, _sent) = fake_connection(41);

        assert!(connection.ticket().is_none());

        connection.record_sid("s123");
        connection.send_stanza(stanza()).unwrap();
        assert_eq!(
            connection.ticket(),
            Some(SessionTicket {
                sid: "s123".into(),
                rid: 42
            })
        );
    }
}
