//! Chatyuk runtime - transport seam and stream backend.
//!
//! This crate provides the low-level plumbing between the session wrapper
//! and the external XMPP library:
//!
//! - **Transport seam**: [`TransportSender`]/[`TransportReceiver`] traits
//!   plus the [`TransportEvent`] stream, so the wrapper never touches the
//!   library directly (tests substitute an in-memory transport).
//! - **Stream backend**: [`StreamTransport`] drives a `tokio-xmpp` client
//!   and translates its events.
//! - **Connection**: outbound stanza queue, request-id counter, and the
//!   last reported status.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐
//! │   chatyuk    │  Comms session wrapper
//! └──────┬───────┘
//!        │ TransportEvent / send_stanza
//! ┌──────▼───────┐
//! │   runtime    │  This crate
//! │  ┌─────────┐ │
//! │  │  Conn   │ │  queue, rid counter, status cell
//! │  └─────────┘ │
//! │  ┌─────────┐ │
//! │  │ Stream  │ │  tokio-xmpp event loop
//! │  └─────────┘ │
//! └──────────────┘
//! ```

pub mod client;
pub mod connection;
pub mod error;
pub mod transport;

pub use client::{Credentials, StreamTransport};
pub use connection::Connection;
pub use error::{Error, Result};
pub use transport::{TransportEvent, TransportParts, TransportReceiver, TransportSender};
