//! Line-oriented chat surface.
//!
//! Stands in for a login form and message pane: incoming messages print
//! as `<sender> body`, typed lines go to the room, `/quit` leaves for
//! good. Closing stdin (Ctrl-D) detaches instead, so the next run can
//! re-attach the session.

use std::time::Duration;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use chatyuk::runtime::StreamTransport;
use chatyuk::{Comms, CommsEvent, CookieJar, TransportFactory};

use crate::cli::Cli;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Defaults the original login form offered when nothing was saved.
const DEFAULT_USERNAME: &str = "test";
const DEFAULT_ROOM: &str = "testroom";

/// Resolve identity, connect, and hand off to the chat loop.
pub async fn launch(cli: Cli) -> Result<()> {
    let mut jar = match &cli.cookie_file {
        Some(path) => CookieJar::load(path.clone()),
        None => CookieJar::open_default(),
    };
    if cli.fresh {
        jar.clear_session()
            .context("failed to clear the saved session")?;
    }

    let factory: TransportFactory = Box::new(StreamTransport::open);
    let comms = Comms::with_parts(cli.server_config(), jar, factory);

    // Explicit flags win, then the saved session, then the form defaults.
    let username = cli
        .username
        .clone()
        .unwrap_or_else(|| pick(comms.username(), DEFAULT_USERNAME));
    let room = cli
        .room
        .clone()
        .unwrap_or_else(|| pick(comms.room(), DEFAULT_ROOM));

    run(comms, username, cli.password.clone(), room).await
}

fn pick(saved: &str, fallback: &str) -> String {
    if saved.is_empty() {
        fallback.to_string()
    } else {
        saved.to_string()
    }
}

async fn run(mut comms: Comms, username: String, password: String, room: String) -> Result<()> {
    let waiter = comms.wait_until_connected(CONNECT_TIMEOUT);
    let mut events = comms.events();

    comms
        .connect(&username, &password, &room)
        .context("failed to open the connection")?;

    match waiter.wait().await.context("connection timed out")? {
        CommsEvent::Connected { attached: true } => info!("re-attached to the previous session"),
        _ => {}
    }
    println!("Logged in as {} in {}", comms.username(), comms.room());

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();

    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(CommsEvent::Message(message)) => {
                    println!("<{}> {}", message.sender, message.body);
                }
                Some(CommsEvent::Disconnected { reason }) => {
                    info!(%reason, "disconnected");
                    break;
                }
                Some(CommsEvent::Connected { .. }) => {}
                None => break,
            },
            line = lines.next_line() => match line? {
                Some(line) if line.trim() == "/quit" => {
                    comms.disconnect().context("failed to log out")?;
                    break;
                }
                Some(line) if !line.trim().is_empty() => {
                    comms.send(line.trim()).context("failed to send message")?;
                }
                Some(_) => {}
                None => {
                    // Ctrl-D: drop the stream, keep the session restorable.
                    comms.detach().context("failed to detach")?;
                    break;
                }
            },
        }
    }

    Ok(())
}
