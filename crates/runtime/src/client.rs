//! Stream transport backed by `tokio-xmpp`.
//!
//! The receiver half owns the library client and multiplexes two sources:
//! outbound stanzas queued by the sender half, and events coming off the
//! stream. Stream negotiation, TLS, and authentication all happen inside
//! the library; this module only translates its events into
//! [`TransportEvent`]s.

use futures_util::StreamExt;
use jid::Jid;
use minidom::Element;
use tokio::sync::mpsc;
use tokio_xmpp::AsyncClient;
use tracing::{debug, trace};

use crate::error::{Error, Result};
use crate::transport::{TransportEvent, TransportParts, TransportReceiver, TransportSender};
use chatyuk_protocol::ConnectionStatus;

/// Credentials and addressing for a stream connection.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// JID to request: `user@server`, or `user@server/resource` when
    /// re-attaching to a saved session.
    pub jid: String,
    /// Password; empty for servers that allow open login.
    pub password: String,
}

enum Outbound {
    Stanza(Element),
    Close,
}

/// Write half: queues stanzas for the receiver's event loop.
pub struct StreamSender {
    tx: mpsc::UnboundedSender<Outbound>,
}

impl TransportSender for StreamSender {
    fn send(&mut self, stanza: Element) -> Result<()> {
        self.tx
            .send(Outbound::Stanza(stanza))
            .map_err(|_| Error::ChannelClosed)
    }

    fn close(&mut self) -> Result<()> {
        self.tx.send(Outbound::Close).map_err(|_| Error::ChannelClosed)
    }
}

/// Read half: owns the `tokio-xmpp` client and drives it to completion.
pub struct StreamReceiver {
    jid: Jid,
    password: String,
    outbound_rx: mpsc::UnboundedReceiver<Outbound>,
    event_tx: mpsc::UnboundedSender<TransportEvent>,
}

impl StreamReceiver {
    async fn drive(self) -> Result<()> {
        let StreamReceiver {
            jid,
            password,
            mut outbound_rx,
            event_tx,
        } = self;

        let mut client = AsyncClient::new(jid, password);
        client.set_reconnect(false);

        // The wrapper may already be gone during shutdown; sends are best-effort.
        let emit = |event: TransportEvent| {
            let _ = event_tx.send(event);
        };

        emit(TransportEvent::Status(ConnectionStatus::Connecting));
        let mut was_online = false;

        loop {
            tokio::select! {
                outbound = outbound_rx.recv() => match outbound {
                    Some(Outbound::Stanza(stanza)) => {
                        trace!(name = %stanza.name(), "sending stanza");
                        if let Err(err) = client.send_stanza(stanza).await {
                            let reason = err.to_string();
                            emit(TransportEvent::Disconnected { reason: reason.clone() });
                            return Err(Error::Transport(reason));
                        }
                    }
                    // Close requested, or every sender handle is gone.
                    Some(Outbound::Close) | None => {
                        emit(TransportEvent::Status(ConnectionStatus::Disconnecting));
                        let _ = client.send_end().await;
                        emit(TransportEvent::Disconnected {
                            reason: "closed by client".into(),
                        });
                        return Ok(());
                    }
                },
                event = client.next() => match event {
                    Some(tokio_xmpp::Event::Online { bound_jid, resumed }) => {
                        debug!(jid = %bound_jid, resumed, "stream online");
                        was_online = true;
                        emit(TransportEvent::Online {
                            bound_jid: bound_jid.to_string(),
                            resumed,
                        });
                    }
                    Some(tokio_xmpp::Event::Stanza(stanza)) => {
                        trace!(name = %stanza.name(), "received stanza");
                        emit(TransportEvent::Stanza(stanza));
                    }
                    Some(tokio_xmpp::Event::Disconnected(err)) => {
                        let reason = err.to_string();
                        debug!(%reason, was_online, "stream disconnected");
                        if let Some(status) = classify_disconnect(&err, was_online) {
                            emit(TransportEvent::Status(status));
                        }
                        emit(TransportEvent::Disconnected { reason: reason.clone() });
                        return if was_online {
                            Ok(())
                        } else if matches!(err, tokio_xmpp::Error::Auth(_)) {
                            Err(Error::AuthFailed(reason))
                        } else {
                            Err(Error::ConnectFailed(reason))
                        };
                    }
                    None => {
                        emit(TransportEvent::Disconnected {
                            reason: "stream ended".into(),
                        });
                        return Ok(());
                    }
                },
            }
        }
    }
}

impl TransportReceiver for StreamReceiver {
    fn run(self: Box<Self>) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<()>> + Send>> {
        Box::pin(self.drive())
    }
}

/// Intermediate status to report before the final `Disconnected` event.
fn classify_disconnect(err: &tokio_xmpp::Error, was_online: bool) -> Option<ConnectionStatus> {
    if matches!(err, tokio_xmpp::Error::Auth(_)) {
        Some(ConnectionStatus::AuthFail)
    } else if !was_online {
        Some(ConnectionStatus::ConnFail)
    } else {
        None
    }
}

/// Production transport over a `tokio-xmpp` stream.
pub struct StreamTransport;

impl StreamTransport {
    /// Build transport parts for the given credentials.
    ///
    /// Returns immediately; nothing touches the network until the receiver
    /// half is driven.
    pub fn open(credentials: Credentials) -> Result<TransportParts> {
        let jid: Jid = credentials
            .jid
            .parse()
            .map_err(|err| Error::invalid_jid(&credentials.jid, err))?;

        let (outbound_tx, outbound_rx) = mpsc::unbounded_channel();
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        Ok(TransportParts {
            sender: Box::new(StreamSender { tx: outbound_tx }),
            receiver: Box::new(StreamReceiver {
                jid,
                password: credentials.password,
                outbound_rx,
                event_tx,
            }),
            event_rx,
        })
    }
}
