//! Connection/session lifecycle wrapper.
//!
//! `Comms` is the single object the UI layer talks to. It coordinates the
//! XMPP library behind the transport seam: restoring or creating a
//! session, tracking connection status, joining the configured room once
//! the stream is up, and fanning messages out to callbacks and streams.
//!
//! Session restoration works off the cookie jar: if sid/rid cookies exist,
//! the next connect requests the saved resource and continues the saved
//! stanza counter. A bind that comes back with a different resource means
//! the prior session is gone; the stale cookies are destroyed and the
//! connection proceeds as fresh.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::cookies::CookieJar;
use crate::events::{CommsEvent, EventBus, EventStream, EventWaiter, Subscription};
use crate::muc;
use chatyuk_protocol::{ChatMessage, ConnectionStatus, SavedSession, ServerConfig};
use chatyuk_runtime::{
    Connection, Credentials, Error, Result, StreamTransport, TransportEvent, TransportParts,
};

/// Factory producing transport parts for a connect attempt.
///
/// Production code plugs in [`StreamTransport::open`]; tests substitute an
/// in-memory transport.
pub type TransportFactory = Box<dyn Fn(Credentials) -> Result<TransportParts> + Send + Sync>;

pub struct Comms {
    config: ServerConfig,
    jar: Arc<Mutex<CookieJar>>,
    bus: Arc<EventBus<CommsEvent>>,
    factory: TransportFactory,
    username: String,
    room: String,
    password: String,
    connection: Option<Arc<Connection>>,
    pump: Option<JoinHandle<()>>,
    driver: Option<JoinHandle<Result<()>>>,
}

impl Comms {
    /// Wrapper over the default cookie jar and the stream transport.
    pub fn new(config: ServerConfig) -> Self {
        Self::with_parts(
            config,
            CookieJar::open_default(),
            Box::new(StreamTransport::open),
        )
    }

    /// Wrapper with an explicit jar and transport factory.
    ///
    /// When the jar holds a prior session, username and room are prefilled
    /// from it so the UI can offer to rejoin.
    pub fn with_parts(config: ServerConfig, jar: CookieJar, factory: TransportFactory) -> Self {
        let (username, room) = jar
            .saved_session()
            .map(|s| (s.user, s.room))
            .unwrap_or_default();

        Self {
            config,
            jar: Arc::new(Mutex::new(jar)),
            bus: Arc::new(EventBus::default()),
            factory,
            username,
            room,
            password: String::new(),
            connection: None,
            pump: None,
            driver: None,
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn room(&self) -> &str {
        &self.room
    }

    /// Login JID: `username@chat_server`.
    pub fn jid(&self) -> String {
        self.config.user_jid(&self.username)
    }

    /// Room JID: `room@conference_server`.
    pub fn room_jid(&self) -> String {
        self.config.room_jid(&self.room)
    }

    /// Occupant JID in the room: `room@conference_server/username`.
    pub fn occupant_jid(&self) -> String {
        self.config.occupant_jid(&self.room, &self.username)
    }

    /// True when sid/rid cookies exist, i.e. a session can be re-attached.
    pub fn has_prior_session(&self) -> bool {
        self.jar.lock().saved_session().is_some()
    }

    /// Last status the transport reported; `None` before any report.
    pub fn current_status(&self) -> Option<ConnectionStatus> {
        self.connection.as_ref().and_then(|c| c.status())
    }

    pub fn is_connected(&self) -> bool {
        self.connection.as_ref().is_some_and(|c| c.is_connected())
    }

    /// Log in and join `room`.
    ///
    /// A restorable prior session for the same user is re-attached;
    /// otherwise a fresh session is opened. An existing connection is
    /// reset first. Must be called from within a tokio runtime.
    pub fn connect(&mut self, username: &str, password: &str, room: &str) -> Result<()> {
        self.reset();

        self.username = username.to_string();
        self.password = password.to_string();
        self.room = room.to_string();

        // A saved session only re-attaches for the same user.
        let prior = self
            .jar
            .lock()
            .saved_session()
            .filter(|s| s.user == username);
        let (jid, initial_rid) = match &prior {
            Some(saved) => (format!("{}/{}", self.jid(), saved.sid), saved.rid),
            None => (self.jid(), 0),
        };
        debug!(%jid, attach = prior.is_some(), "opening transport");

        let parts = (self.factory)(Credentials {
            jid,
            password: self.password.clone(),
        })?;

        let connection = Arc::new(Connection::new(parts, initial_rid));
        let events = connection.take_events();
        let driver = connection.start();

        let pump = EventPump {
            connection: Arc::clone(&connection),
            jar: Arc::clone(&self.jar),
            bus: Arc::clone(&self.bus),
            username: self.username.clone(),
            room: self.room.clone(),
            occupant_jid: self.occupant_jid(),
            expected_sid: prior.map(|s| s.sid),
        };

        self.pump = Some(tokio::spawn(pump.run(events)));
        self.driver = Some(driver);
        self.connection = Some(connection);
        Ok(())
    }

    /// Re-attach the saved session, if any.
    ///
    /// Returns false when there is nothing to restore.
    pub fn restore(&mut self) -> Result<bool> {
        let saved = self.jar.lock().saved_session();
        match saved {
            Some(saved) => {
                self.connect(&saved.user, "", &saved.room)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Persist the live session's identifiers to the cookie jar.
    ///
    /// This happens automatically once the stream comes up; it is exposed
    /// for callers that want to re-save after further traffic (the rid
    /// advances with every outbound stanza).
    pub fn save_session(&self) -> Result<()> {
        let connection = self.connection.as_ref().ok_or(Error::NotConnected)?;
        let ticket = connection.ticket().ok_or(Error::NotConnected)?;

        self.jar.lock().store_session(&SavedSession {
            user: self.username.clone(),
            room: self.room.clone(),
            sid: ticket.sid,
            rid: ticket.rid,
        })
    }

    /// Forget the saved session without touching the connection.
    pub fn clear_session(&self) -> Result<()> {
        self.jar.lock().clear_session()
    }

    /// Send a groupchat message to the joined room.
    pub fn send(&self, body: &str) -> Result<()> {
        let connection = self.connection.as_ref().ok_or(Error::NotConnected)?;
        if !connection.is_connected() {
            return Err(Error::NotConnected);
        }
        connection.send_stanza(muc::groupchat(&self.room_jid(), body)?)
    }

    /// Leave the room, end the stream, and forget the saved session.
    pub fn disconnect(&mut self) -> Result<()> {
        if let Some(connection) = &self.connection {
            if connection.is_connected() {
                let _ = connection.send_stanza(muc::leave_presence(&self.occupant_jid())?);
            }
            connection.close()?;
        }
        self.clear_session()
    }

    /// End the stream but keep the cookies, so the next run re-attaches.
    pub fn detach(&self) -> Result<()> {
        match &self.connection {
            Some(connection) => connection.close(),
            None => Ok(()),
        }
    }

    /// Register a handler for incoming groupchat messages.
    pub fn on_message<F>(&self, handler: F) -> Subscription
    where
        F: Fn(ChatMessage) + Send + 'static,
    {
        self.spawn_handler(move |event| {
            if let CommsEvent::Message(message) = event {
                handler(message);
            }
        })
    }

    /// Register a handler fired when the session comes up. The argument is
    /// true when a prior session was re-attached.
    pub fn on_connected<F>(&self, handler: F) -> Subscription
    where
        F: Fn(bool) + Send + 'static,
    {
        self.spawn_handler(move |event| {
            if let CommsEvent::Connected { attached } = event {
                handler(attached);
            }
        })
    }

    /// Register a handler fired when the session goes away.
    pub fn on_disconnected<F>(&self, handler: F) -> Subscription
    where
        F: Fn(&str) + Send + 'static,
    {
        self.spawn_handler(move |event| {
            if let CommsEvent::Disconnected { reason } = event {
                handler(&reason);
            }
        })
    }

    /// Subscribe to all wrapper events as a stream.
    pub fn events(&self) -> EventStream<CommsEvent> {
        EventStream::new(self.bus.subscribe())
    }

    /// Waiter that completes on the next `Connected` event.
    pub fn wait_until_connected(&self, timeout: Duration) -> EventWaiter<CommsEvent> {
        let rx = self
            .bus
            .register_waiter(|event| matches!(event, CommsEvent::Connected { .. }));
        EventWaiter::new(rx, timeout)
    }

    fn spawn_handler<F>(&self, handler: F) -> Subscription
    where
        F: Fn(CommsEvent) + Send + 'static,
    {
        let mut stream = EventStream::new(self.bus.subscribe());
        let (cancel_tx, mut cancel_rx) = oneshot::channel();

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut cancel_rx => break,
                    event = stream.recv() => match event {
                        Some(event) => handler(event),
                        None => break,
                    },
                }
            }
        });

        Subscription::new(cancel_tx)
    }

    fn reset(&mut self) {
        if let Some(connection) = self.connection.take() {
            let _ = connection.close();
        }
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Some(driver) = self.driver.take() {
            driver.abort();
        }
    }
}

impl Drop for Comms {
    fn drop(&mut self) {
        self.reset();
    }
}

/// Task translating transport events into session state and bus events.
struct EventPump {
    connection: Arc<Connection>,
    jar: Arc<Mutex<CookieJar>>,
    bus: Arc<EventBus<CommsEvent>>,
    username: String,
    room: String,
    occupant_jid: String,
    /// Resource requested from a saved session, when re-attaching.
    expected_sid: Option<String>,
}

impl EventPump {
    async fn run(self, mut events: mpsc::UnboundedReceiver<TransportEvent>) {
        while let Some(event) = events.recv().await {
            match event {
                TransportEvent::Status(status) => {
                    debug!(?status, "transport status");
                    self.connection.record_status(status);
                }
                TransportEvent::Online { bound_jid, resumed } => {
                    self.on_online(&bound_jid, resumed);
                }
                TransportEvent::Stanza(stanza) => {
                    if let Some(message) = muc::extract_message(&stanza) {
                        self.bus.emit(CommsEvent::Message(message));
                    }
                }
                TransportEvent::Disconnected { reason } => {
                    debug!(%reason, "transport disconnected");
                    self.connection.record_status(ConnectionStatus::Disconnected);
                    self.bus.emit(CommsEvent::Disconnected { reason });
                    break;
                }
            }
        }
    }

    fn on_online(&self, bound_jid: &str, resumed: bool) {
        // The bound resource is the session identity.
        let sid = bound_jid
            .rsplit_once('/')
            .map(|(_, resource)| resource.to_string())
            .unwrap_or_default();

        let attached = resumed || self.expected_sid.as_deref() == Some(sid.as_str());
        if !attached && self.expected_sid.is_some() {
            // The server refused the saved resource; that session is gone.
            warn!(%sid, "prior session could not be re-attached");
            if let Err(err) = self.jar.lock().clear_session() {
                warn!(error = %err, "failed to clear stale session cookies");
            }
        }

        self.connection.record_sid(sid.as_str());
        self.connection.record_status(if attached {
            ConnectionStatus::Attached
        } else {
            ConnectionStatus::Connected
        });

        match muc::join_presence(&self.occupant_jid) {
            Ok(presence) => {
                if let Err(err) = self.connection.send_stanza(presence) {
                    warn!(error = %err, "failed to send room join presence");
                }
            }
            Err(err) => warn!(error = %err, "could not build room join presence"),
        }

        let session = SavedSession {
            user: self.username.clone(),
            room: self.room.clone(),
            sid,
            rid: self.connection.rid(),
        };
        if let Err(err) = self.jar.lock().store_session(&session) {
            warn!(error = %err, "failed to persist session cookies");
        }

        self.bus.emit(CommsEvent::Connected { attached });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn offline_comms() -> (tempfile::TempDir, Comms) {
        let dir = tempfile::tempdir().unwrap();
        let jar = CookieJar::load(dir.path().join("cookies.json"));
        let factory: TransportFactory = Box::new(|_| Err(Error::NotConnected));
        (dir, Comms::with_parts(ServerConfig::default(), jar, factory))
    }

    #[test]
    fn status_is_none_before_any_connect() {
        let (_dir, comms) = offline_comms();

        assert_eq!(comms.current_status(), None);
        assert!(!comms.is_connected());
        assert!(!comms.has_prior_session());
    }

    #[test]
    fn jid_helpers_combine_identity_with_server_config() {
        let (_dir, mut comms) = offline_comms();
        let _ = comms.connect("fakeuser", "fakepass", "fakeroom");

        assert_eq!(comms.jid(), "fakeuser@chatyuk.com");
        assert_eq!(comms.room_jid(), "fakeroom@conference.chatyuk.com");
        assert_eq!(
            comms.occupant_jid(),
            "fakeroom@conference.chatyuk.com/fakeuser"
        );
    }

    #[test]
    fn connect_stores_the_credentials() {
        let (_dir, mut comms) = offline_comms();
        let _ = comms.connect("fakeuser", "fakepass", "fakeroom");

        assert_eq!(comms.username(), "fakeuser");
        assert_eq!(comms.room(), "fakeroom");
    }

    #[test]
    fn send_without_a_connection_is_rejected() {
        let (_dir, comms) = offline_comms();

        assert!(matches!(comms.send("hello"), Err(Error::NotConnected)));
    }
}
