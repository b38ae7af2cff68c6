//! Event fan-out for the session wrapper.
//!
//! The wrapper emits [`CommsEvent`]s; the UI layer consumes them either as
//! a stream ([`EventStream`]) or as registered callbacks (`on_*` methods on
//! [`Comms`], which spawn a handler task and hand back a [`Subscription`]).
//! One-shot waits (`wait_until_connected`) go through [`EventWaiter`].
//!
//! [`Comms`]: crate::Comms

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{broadcast, oneshot};

use chatyuk_protocol::ChatMessage;
use chatyuk_runtime::{Error, Result};

/// What the session wrapper tells the UI layer.
#[derive(Debug, Clone)]
pub enum CommsEvent {
    /// The session came up. `attached` is true when a prior session was
    /// re-attached rather than freshly authenticated.
    Connected { attached: bool },
    /// The session went away.
    Disconnected { reason: String },
    /// A groupchat message arrived.
    Message(ChatMessage),
}

/// RAII handle for a callback registered on the wrapper.
///
/// The spawned handler task stops when this handle is dropped or
/// [`unsubscribe`](Self::unsubscribe) is called.
pub struct Subscription {
    cancel_tx: Option<oneshot::Sender<()>>,
}

impl Subscription {
    pub(crate) fn new(cancel_tx: oneshot::Sender<()>) -> Self {
        Self {
            cancel_tx: Some(cancel_tx),
        }
    }

    /// Explicitly cancels the subscription, equivalent to dropping it.
    pub fn unsubscribe(mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(tx) = self.cancel_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel_tx.is_some())
            .finish()
    }
}

struct WaiterEntry<E> {
    predicate: Box<dyn Fn(&E) -> bool + Send + Sync>,
    complete_tx: oneshot::Sender<E>,
}

/// Internal dispatcher combining a broadcast channel with predicate-based
/// waiters.
///
/// Waiters are checked first during [`emit`](Self::emit) so one-shot waits
/// have guaranteed delivery even when broadcast receivers are lagging.
pub(crate) struct EventBus<E: Clone + Send + 'static> {
    tx: broadcast::Sender<E>,
    waiters: Mutex<Vec<WaiterEntry<E>>>,
}

impl<E: Clone + Send + 'static> EventBus<E> {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self {
            tx,
            waiters: Mutex::new(Vec::new()),
        }
    }

    /// Emits an event to matching waiters, then to all subscribers.
    pub fn emit(&self, event: E) {
        {
            let mut waiters = self.waiters.lock();
            let mut i = 0;
            while i < waiters.len() {
                if (waiters[i].predicate)(&event) {
                    let entry = waiters.swap_remove(i);
                    let _ = entry.complete_tx.send(event.clone());
                } else {
                    i += 1;
                }
            }
        }
        let _ = self.tx.send(event);
    }

    /// Subscribes to all future events.
    pub fn subscribe(&self) -> broadcast::Receiver<E> {
        self.tx.subscribe()
    }

    /// Registers a waiter that receives the first matching event and is
    /// then removed.
    pub fn register_waiter<F>(&self, predicate: F) -> oneshot::Receiver<E>
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        let (complete_tx, complete_rx) = oneshot::channel();
        self.waiters.lock().push(WaiterEntry {
            predicate: Box::new(predicate),
            complete_tx,
        });
        complete_rx
    }

    #[cfg(test)]
    pub fn waiter_count(&self) -> usize {
        self.waiters.lock().len()
    }
}

impl<E: Clone + Send + 'static> Default for EventBus<E> {
    fn default() -> Self {
        Self::new(256)
    }
}

/// Wrapper around [`broadcast::Receiver`] that survives lag.
///
/// Lag is logged and skipped instead of surfacing as an error, so a slow
/// UI loop never breaks on a burst of room traffic.
///
/// [`broadcast::Receiver`]: tokio::sync::broadcast::Receiver
pub struct EventStream<E: Clone + Send + 'static> {
    rx: broadcast::Receiver<E>,
}

impl<E: Clone + Send + 'static> EventStream<E> {
    pub(crate) fn new(rx: broadcast::Receiver<E>) -> Self {
        Self { rx }
    }

    /// Receives the next event; `None` once the wrapper is gone.
    pub async fn recv(&mut self) -> Option<E> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "event stream lagged, dropped events");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Receives an event if one is immediately available.
    pub fn try_recv(&mut self) -> Option<E> {
        loop {
            match self.rx.try_recv() {
                Ok(event) => return Some(event),
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    tracing::warn!(dropped = n, "event stream lagged, dropped events");
                }
                Err(
                    broadcast::error::TryRecvError::Empty | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }
}

/// One-shot event waiter with timeout support.
pub struct EventWaiter<E> {
    rx: oneshot::Receiver<E>,
    timeout: Duration,
}

impl<E: Send + 'static> EventWaiter<E> {
    pub(crate) fn new(rx: oneshot::Receiver<E>, timeout: Duration) -> Self {
        Self { rx, timeout }
    }

    /// Waits for the event with the configured timeout.
    ///
    /// # Errors
    ///
    /// - [`Error::Timeout`] if no matching event arrives in time
    /// - [`Error::ChannelClosed`] if the event source is dropped
    pub async fn wait(self) -> Result<E> {
        tokio::time::timeout(self.timeout, self.rx)
            .await
            .map_err(|_| Error::Timeout("timeout waiting for event".to_string()))?
            .map_err(|_| Error::ChannelClosed)
    }
}

impl<E: Send + 'static> Future for EventWaiter<E> {
    type Output = Result<E>;

    /// Polls without timeout; use [`wait()`](Self::wait) for timeouts.
    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        match Pin::new(&mut self.rx).poll(cx) {
            Poll::Ready(Ok(event)) => Poll::Ready(Ok(event)),
            Poll::Ready(Err(_)) => Poll::Ready(Err(Error::ChannelClosed)),
            Poll::Pending => Poll::Pending,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(sender: &str, body: &str) -> CommsEvent {
        CommsEvent::Message(ChatMessage::new(sender, body))
    }

    #[tokio::test]
    async fn bus_broadcasts_to_every_subscriber() {
        let bus: EventBus<CommsEvent> = EventBus::default();

        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();

        bus.emit(message("sillylogger", "hello"));

        for rx in [&mut rx1, &mut rx2] {
            match rx.recv().await.unwrap() {
                CommsEvent::Message(msg) => assert_eq!(msg.body, "hello"),
                other => panic!("expected message, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn waiter_only_completes_on_a_matching_event() {
        let bus: EventBus<CommsEvent> = EventBus::default();

        let mut rx = bus.register_waiter(|e| matches!(e, CommsEvent::Connected { .. }));

        bus.emit(message("sillylogger", "not yet"));
        assert!(rx.try_recv().is_err());

        bus.emit(CommsEvent::Connected { attached: true });
        match rx.await.unwrap() {
            CommsEvent::Connected { attached } => assert!(attached),
            other => panic!("expected connected, got {other:?}"),
        }
        assert_eq!(bus.waiter_count(), 0);
    }

    #[tokio::test]
    async fn event_stream_skips_lag_and_keeps_receiving() {
        let bus: EventBus<CommsEvent> = EventBus::new(1);
        let mut stream = EventStream::new(bus.subscribe());

        bus.emit(message("a", "1"));
        bus.emit(message("b", "2"));

        // Capacity 1: the first event was dropped, the second still arrives.
        match stream.recv().await.unwrap() {
            CommsEvent::Message(msg) => assert_eq!(msg.body, "2"),
            other => panic!("expected message, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn event_waiter_times_out() {
        let (_tx, rx) = oneshot::channel::<CommsEvent>();
        let waiter = EventWaiter::new(rx, Duration::from_millis(10));

        assert!(matches!(waiter.wait().await, Err(Error::Timeout(_))));
    }

    #[tokio::test]
    async fn subscription_signals_cancel_on_drop() {
        let (tx, mut rx) = oneshot::channel::<()>();
        let sub = Subscription::new(tx);

        drop(sub);

        assert!(rx.try_recv().is_ok());
    }
}
