//! Shared types for the chatyuk client.
//!
//! This crate contains the serde-serializable types passed between the
//! transport runtime, the session wrapper, and the UI layer: connection
//! status, chat messages, server addressing, and the persisted session
//! shape.
//!
//! Types in this crate are pure data - no behavior beyond small helpers
//! and serialization. The session lifecycle lives in the `chatyuk` crate,
//! the transport in `chatyuk-runtime`.

pub mod config;
pub mod message;
pub mod session;
pub mod status;

pub use config::ServerConfig;
pub use message::ChatMessage;
pub use session::{SavedSession, SessionTicket};
pub use status::ConnectionStatus;
