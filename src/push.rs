//! Push Channel
//!
//! Owns the single persistent connection that carries the agent's
//! unsolicited messages, and keeps it alive for the life of the session:
//! on close or error the channel waits a fixed delay and dials again,
//! forever, until [`PushChannel::stop`] ends the loop for good.
//!
//! Lifecycle transitions and validated frames are posted onto the session
//! event queue; malformed frames are logged and dropped here and never
//! reach the rest of the system. Frames in transit during a disconnect are
//! lost: delivery is at-most-once, and reconciliation is last-value-wins.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::clock::Clock;
use crate::error::ConnectionError;
use crate::events::SessionEvent;
use crate::session::ConnectionStatus;
use crate::wire;

/// Inbound text frames from one connection attempt.
///
/// The stream ends when the peer closes; mid-stream transport errors are
/// surfaced as items so the reconnect loop can tell "closed" from "lost".
pub type FrameStream = BoxStream<'static, Result<String, ConnectionError>>;

/// Transport that opens one persistent connection to the agent.
///
/// The production implementation is [`WebSocketTransport`]; tests
/// substitute scripted transports.
#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Open a connection and return its inbound frame stream.
    async fn connect(&self) -> Result<FrameStream, ConnectionError>;
}

/// WebSocket transport for the push channel.
pub struct WebSocketTransport {
    url: String,
}

impl WebSocketTransport {
    /// Create a transport dialing `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl PushTransport for WebSocketTransport {
    async fn connect(&self) -> Result<FrameStream, ConnectionError> {
        let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|err| ConnectionError::Connect(err.to_string()))?;

        let frames = stream.filter_map(|frame| async move {
            match frame {
                Ok(tokio_tungstenite::tungstenite::Message::Text(text)) => Some(Ok(text)),
                // Peer-initiated close ends the stream on the next poll.
                Ok(tokio_tungstenite::tungstenite::Message::Close(_)) => None,
                // Binary, ping and pong frames carry no session payload.
                Ok(_) => None,
                Err(err) => Some(Err(ConnectionError::Lost(err.to_string()))),
            }
        });

        Ok(frames.boxed())
    }
}

/// Maintains exactly one logical push connection at a time.
pub struct PushChannel<T: PushTransport + 'static> {
    transport: Arc<T>,
    events: mpsc::Sender<SessionEvent>,
    clock: Arc<dyn Clock>,
    reconnect_delay: Duration,
    stop: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl<T: PushTransport + 'static> PushChannel<T> {
    /// Create a channel that posts lifecycle and frame events to `events`
    /// and schedules reconnect delays through `clock`.
    pub fn new(
        transport: T,
        events: mpsc::Sender<SessionEvent>,
        clock: Arc<dyn Clock>,
        reconnect_delay: Duration,
    ) -> Self {
        let (stop, _) = watch::channel(false);
        Self {
            transport: Arc::new(transport),
            events,
            clock,
            reconnect_delay,
            stop,
            task: None,
        }
    }

    /// Open the connection if it is not already open or opening. Idempotent.
    pub fn start(&mut self) {
        if self.task.as_ref().is_some_and(|task| !task.is_finished()) {
            return;
        }
        let stop = self.stop.subscribe();
        self.task = Some(tokio::spawn(run(
            Arc::clone(&self.transport),
            self.events.clone(),
            Arc::clone(&self.clock),
            self.reconnect_delay,
            stop,
        )));
    }

    /// Close the connection and suppress further reconnection.
    ///
    /// Terminal: used only at session teardown.
    pub fn stop(&self) {
        let _ = self.stop.send(true);
    }
}

/// Connection loop: dial, pump frames, report status, sleep, repeat.
async fn run<T: PushTransport + 'static>(
    transport: Arc<T>,
    events: mpsc::Sender<SessionEvent>,
    clock: Arc<dyn Clock>,
    reconnect_delay: Duration,
    mut stop: watch::Receiver<bool>,
) {
    loop {
        if *stop.borrow() {
            return;
        }
        if send_status(&events, ConnectionStatus::Connecting).await.is_err() {
            return;
        }

        let connected = tokio::select! {
            _ = stop.changed() => None,
            result = transport.connect() => Some(result),
        };

        let mut locally_closed = false;
        match connected {
            Some(Ok(mut frames)) => {
                if send_status(&events, ConnectionStatus::Open).await.is_err() {
                    return;
                }
                tracing::info!("push connection open");

                loop {
                    tokio::select! {
                        _ = stop.changed() => {
                            locally_closed = true;
                            break;
                        }
                        frame = frames.next() => match frame {
                            Some(Ok(raw)) => match wire::parse_push_frame(&raw) {
                                Ok(event) => {
                                    if events.send(SessionEvent::Push(event)).await.is_err() {
                                        return;
                                    }
                                }
                                Err(err) => {
                                    tracing::warn!(error = %err, "dropping malformed push frame");
                                }
                            },
                            Some(Err(err)) => {
                                tracing::info!(error = %err, "push connection lost");
                                break;
                            }
                            None => {
                                tracing::info!("push connection closed by peer");
                                break;
                            }
                        }
                    }
                }
            }
            Some(Err(err)) => {
                tracing::info!(error = %err, "push connect failed");
            }
            // stop() arrived while the dial was still in progress.
            None => locally_closed = true,
        }

        if locally_closed {
            let _ = send_status(&events, ConnectionStatus::Closing).await;
        }
        if send_status(&events, ConnectionStatus::Closed).await.is_err() {
            return;
        }
        if locally_closed || *stop.borrow() {
            return;
        }

        // Fixed delay, retried forever. No backoff growth, no giving up.
        tokio::select! {
            _ = stop.changed() => return,
            _ = clock.sleep(reconnect_delay) => {}
        }
    }
}

async fn send_status(
    events: &mpsc::Sender<SessionEvent>,
    status: ConnectionStatus,
) -> Result<(), mpsc::error::SendError<SessionEvent>> {
    tracing::debug!(?status, "push connection status");
    events.send(SessionEvent::Status(status)).await
}
