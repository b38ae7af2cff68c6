//! chatyuk: a thin XMPP group-chat client.
//!
//! The crate wraps an external XMPP library behind a small session API:
//! log into a chat server, join a multi-user chat room, exchange groupchat
//! messages, and persist the session identifiers so the next run can
//! re-attach instead of logging in again.
//!
//! # Example
//!
//! ```ignore
//! use chatyuk::{Comms, CommsEvent, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> chatyuk::Result<()> {
//!     let mut comms = Comms::new(ServerConfig::default());
//!
//!     let _sub = comms.on_message(|msg| println!("<{}> {}", msg.sender, msg.body));
//!     comms.connect("test", "", "testroom")?;
//!     comms
//!         .wait_until_connected(std::time::Duration::from_secs(30))
//!         .wait()
//!         .await?;
//!
//!     comms.send("hello from rust")?;
//!     comms.disconnect()?;
//!     Ok(())
//! }
//! ```

pub mod comms;
pub mod cookies;
pub mod events;
pub mod muc;

pub use comms::{Comms, TransportFactory};
pub use cookies::CookieJar;
pub use events::{CommsEvent, EventStream, EventWaiter, Subscription};

// Re-export the shared types and the runtime for callers that need them.
pub use chatyuk_protocol as protocol;
pub use chatyuk_protocol::{ChatMessage, ConnectionStatus, SavedSession, ServerConfig, SessionTicket};
pub use chatyuk_runtime as runtime;
pub use chatyuk_runtime::{Error, Result};
