//! Ultron Console
//!
//! Headless terminal client for an Ultron Core backend. Reads directives
//! from stdin (one per line) and prints the merged session timeline as it
//! grows, interleaving agent replies with autonomous messages and link
//! status changes.
//!
//! # Usage
//!
//! ```bash
//! # Connect to the default local backend
//! ultron-console
//!
//! # Connect to a remote backend
//! ULTRON_COMMAND_URL=http://10.0.0.5:8000/chat \
//! ULTRON_PUSH_URL=ws://10.0.0.5:8000/ws ultron-console
//!
//! # With verbose logging
//! RUST_LOG=debug ultron-console
//! ```
//!
//! # Environment Variables
//!
//! - `ULTRON_COMMAND_URL`: directive endpoint (default `http://127.0.0.1:8000/chat`)
//! - `ULTRON_PUSH_URL`: push endpoint (default `ws://127.0.0.1:8000/ws`)
//! - `ULTRON_RECONNECT_MS`: push reconnect delay in milliseconds (default 3000)
//! - `ULTRON_COMMAND_TIMEOUT_SECS`: directive deadline in seconds (default 30)
//! - `RUST_LOG`: log level (trace, debug, info, warn, error)
//!
//! The backend process itself is managed elsewhere; the console simply
//! tolerates an unreachable backend and keeps retrying the push link.

use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};
use tracing::info;

use ultron_session::{
    Clock, CommandChannel, ConnectionStatus, HttpCommandTransport, Message, MessageKind,
    PushChannel, Reconciler, SessionConfig, SessionState, SystemClock, WebSocketTransport,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config = SessionConfig::load()?;
    info!(
        command_url = %config.command_url,
        push_url = %config.push_url,
        "starting session"
    );

    let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
    let (directives_tx, directives_rx) = mpsc::channel(8);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);

    let mut push = PushChannel::new(
        WebSocketTransport::new(config.push_url.as_str()),
        events_tx.clone(),
        Arc::clone(&clock),
        config.reconnect_delay,
    );
    let command = CommandChannel::new(
        HttpCommandTransport::new(config.command_url.as_str()),
        config.command_timeout,
    );
    let (reconciler, snapshots) = Reconciler::new(command, events_tx, clock);

    push.start();
    let session = tokio::spawn(reconciler.run(events_rx, directives_rx));
    let renderer = tokio::spawn(render(snapshots));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if directives_tx.send(line).await.is_err() {
            break;
        }
    }

    // stdin closed: tear the session down. An outstanding directive
    // resolves into a queue nobody reads and is discarded.
    push.stop();
    drop(directives_tx);
    let _ = session.await;
    renderer.abort();
    info!("session closed");
    Ok(())
}

/// Print timeline appends and link status changes as snapshots arrive.
async fn render(mut snapshots: watch::Receiver<SessionState>) {
    let mut printed = 0usize;
    let mut status = ConnectionStatus::Closed;
    loop {
        {
            let state = snapshots.borrow_and_update();
            if state.connection_status() != status {
                status = state.connection_status();
                println!("-- link {} --", status_label(status));
            }
            for message in &state.timeline()[printed..] {
                print_message(message);
            }
            printed = state.timeline().len();
        }
        if snapshots.changed().await.is_err() {
            break;
        }
    }
}

fn status_label(status: ConnectionStatus) -> &'static str {
    match status {
        ConnectionStatus::Connecting => "CONNECTING",
        ConnectionStatus::Open => "ONLINE",
        ConnectionStatus::Closing => "CLOSING",
        ConnectionStatus::Closed => "OFFLINE",
    }
}

fn print_message(message: &Message) {
    let time = message.timestamp.format("%H:%M:%S");
    match message.kind {
        MessageKind::User => println!("[{time}] USER: {}", message.text),
        MessageKind::Agent => {
            let mood = message.mood.as_deref().unwrap_or("UNKNOWN");
            match &message.tool_used {
                Some(tool) => println!("[{time}] ULTRON [{mood}] ({tool}): {}", message.text),
                None => println!("[{time}] ULTRON [{mood}]: {}", message.text),
            }
        }
        MessageKind::Autonomous => {
            let trigger = message.trigger.as_deref().unwrap_or("unprompted");
            println!("[{time}] ULTRON <{trigger}>: {}", message.text);
        }
        MessageKind::Error => println!("[{time}] ERROR: {}", message.text),
    }
}
