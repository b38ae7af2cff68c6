//! Terminal surface for the chatyuk client.
//!
//! Argument parsing, logging setup, and the chat REPL live here; the
//! session logic is all in the `chatyuk` crate.

pub mod cli;
pub mod logging;
pub mod repl;
