//! Ultron Session Core - Dual-Channel Client Synchronizer
//!
//! This crate presents a single conversational session with an autonomous
//! agent by merging two independent communication channels into one
//! consistent view:
//!
//! - a synchronous **command channel**: the user issues a directive over a
//!   request/response endpoint and receives one reply;
//! - an asynchronous **push channel**: the agent emits unsolicited
//!   messages and live status over a persistent connection.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────┐  directives   ┌──────────────────────────────────────┐
//! │ Presentation │──────────────▶│              Reconciler              │
//! │  (observer)  │◀──snapshots───│        sole writer of state          │
//! └──────────────┘               └───────▲──────────────────────▲───────┘
//!                                        │     SessionEvent     │
//!                                ┌───────┴───────┐      ┌───────┴───────┐
//!                                │ CommandChannel│      │  PushChannel  │
//!                                │  one in-flight│      │ reconnecting  │
//!                                │  HTTP request │      │   WebSocket   │
//!                                └───────────────┘      └───────────────┘
//! ```
//!
//! Both channels post onto a single event queue; the [`Reconciler`]
//! applies queue entries one at a time, so the merged timeline reflects
//! completion-arrival order and [`SessionState`] has exactly one writer.
//!
//! # Key Types
//!
//! - [`SessionState`]: timeline, mood, resource stats, connection status,
//!   and the in-flight command guard
//! - [`Reconciler`]: applies directives and channel events, publishes
//!   state snapshots
//! - [`PushChannel`]: persistent connection lifecycle with unbounded
//!   fixed-delay reconnection
//! - [`CommandChannel`]: single-in-flight directive dispatch with a
//!   bounded deadline
//! - [`Clock`]: injectable time source so reconnect delays and message
//!   timestamps are deterministic under test
//!
//! # Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use tokio::sync::mpsc;
//! use ultron_session::{
//!     Clock, CommandChannel, HttpCommandTransport, PushChannel, Reconciler,
//!     SessionConfig, SystemClock, WebSocketTransport,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = SessionConfig::load()?;
//!     let (events_tx, events_rx) = mpsc::channel(config.event_buffer);
//!     let (directives_tx, directives_rx) = mpsc::channel(8);
//!     let clock: Arc<dyn Clock> = Arc::new(SystemClock);
//!
//!     let mut push = PushChannel::new(
//!         WebSocketTransport::new(&config.push_url),
//!         events_tx.clone(),
//!         Arc::clone(&clock),
//!         config.reconnect_delay,
//!     );
//!     let command = CommandChannel::new(
//!         HttpCommandTransport::new(&config.command_url),
//!         config.command_timeout,
//!     );
//!     let (reconciler, mut snapshots) = Reconciler::new(command, events_tx, clock);
//!
//!     push.start();
//!     tokio::spawn(reconciler.run(events_rx, directives_rx));
//!
//!     directives_tx.send("status".to_string()).await?;
//!     snapshots.changed().await?;
//!     // Render the snapshot...
//!     Ok(())
//! }
//! ```
//!
//! # Module Overview
//!
//! - [`session`]: the session aggregate and its data model
//! - [`reconciler`]: the sole writer merging both channels
//! - [`push`]: push connection lifecycle and reconnection
//! - [`command`]: directive dispatch with the in-flight guard
//! - [`events`]: the event queue both channels feed
//! - [`wire`]: serde wire contract and push-frame validation
//! - [`clock`]: injectable time collaborator
//! - [`config`]: endpoints, delays and buffer sizes
//! - [`error`]: the recoverable error taxonomy
//!
//! # No Rendering Dependencies
//!
//! This crate has **zero** dependencies on any UI framework. A
//! presentation layer watches the snapshot stream and submits directives;
//! it never mutates session state directly.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod events;
pub mod push;
pub mod reconciler;
pub mod session;
pub mod wire;

// Re-exports for convenience
pub use clock::{Clock, ManualClock, SystemClock};
pub use command::{CommandChannel, CommandTransport, HttpCommandTransport};
pub use config::{default_config_path, ConfigError, SessionConfig};
pub use error::{ConnectionError, MalformedPayloadError, NetworkError};
pub use events::SessionEvent;
pub use push::{FrameStream, PushChannel, PushTransport, WebSocketTransport};
pub use reconciler::{Reconciler, TimelineObserver, COMMAND_FAILED_TEXT};
pub use session::{
    ConnectionStatus, Message, MessageKind, ResourceStats, SessionState, INITIAL_MOOD,
};
pub use wire::{parse_push_frame, AutonomousEvent, DirectiveReply, DirectiveRequest, WireStats};
