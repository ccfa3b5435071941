//! Command Channel
//!
//! Submits exactly one directive at a time to the agent's request endpoint
//! and posts the outcome back onto the session event queue. The channel
//! never holds more than one request: acceptance is gated on the in-flight
//! guard owned by the session state, and every dispatched request resolves
//! to exactly one completion event, success or failure.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::error::NetworkError;
use crate::events::SessionEvent;
use crate::wire::{DirectiveRequest, DirectiveReply};

/// Transport that carries a single directive request to the agent.
///
/// The production implementation is [`HttpCommandTransport`]; tests
/// substitute scripted transports.
#[async_trait]
pub trait CommandTransport: Send + Sync {
    /// Deliver `request` and decode the reply.
    async fn send(&self, request: DirectiveRequest) -> Result<DirectiveReply, NetworkError>;
}

/// HTTP transport posting directives as JSON.
pub struct HttpCommandTransport {
    client: reqwest::Client,
    url: String,
}

impl HttpCommandTransport {
    /// Create a transport posting to `url`.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
        }
    }
}

#[async_trait]
impl CommandTransport for HttpCommandTransport {
    async fn send(&self, request: DirectiveRequest) -> Result<DirectiveReply, NetworkError> {
        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .map_err(|err| NetworkError::Unreachable(err.to_string()))?;

        if !response.status().is_success() {
            return Err(NetworkError::Status(response.status().as_u16()));
        }

        response
            .json::<DirectiveReply>()
            .await
            .map_err(|err| NetworkError::Decode(err.to_string()))
    }
}

/// Dispatches directives and reports their outcome on the event queue.
pub struct CommandChannel<T: CommandTransport + 'static> {
    transport: Arc<T>,
    timeout: Duration,
}

impl<T: CommandTransport + 'static> CommandChannel<T> {
    /// Create a channel with a bounded per-request deadline.
    pub fn new(transport: T, timeout: Duration) -> Self {
        Self {
            transport: Arc::new(transport),
            timeout,
        }
    }

    /// Whether `directive` should be dispatched at all.
    ///
    /// Blank directives and directives arriving while another is in flight
    /// are quietly refused; both are no-ops, not errors.
    #[must_use]
    pub fn accepts(directive: &str, command_in_flight: bool) -> bool {
        !command_in_flight && !directive.trim().is_empty()
    }

    /// Fire the request on a separate task.
    ///
    /// Exactly one completion event lands on `events` whichever way the
    /// request ends; deadline expiry counts as a [`NetworkError`]. If the
    /// queue receiver is gone the session is tearing down and the
    /// resolution is discarded.
    pub fn dispatch(&self, directive: String, events: mpsc::Sender<SessionEvent>) {
        let transport = Arc::clone(&self.transport);
        let deadline = self.timeout;

        tokio::spawn(async move {
            let request = DirectiveRequest { text: directive };
            let outcome = match tokio::time::timeout(deadline, transport.send(request)).await {
                Ok(Ok(reply)) => SessionEvent::Reply(reply),
                Ok(Err(err)) => SessionEvent::Failed(err),
                Err(_) => SessionEvent::Failed(NetworkError::Timeout(deadline)),
            };
            let _ = events.send(outcome).await;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::WireStats;

    struct FixedReply;

    #[async_trait]
    impl CommandTransport for FixedReply {
        async fn send(&self, request: DirectiveRequest) -> Result<DirectiveReply, NetworkError> {
            Ok(DirectiveReply {
                response: format!("ack: {}", request.text),
                mood: "OBSERVANT".to_string(),
                tool_used: "none".to_string(),
                success: true,
                stats: WireStats {
                    cpu: 5.0,
                    ram: 20.0,
                    battery: 99.0,
                },
            })
        }
    }

    struct AlwaysDown;

    #[async_trait]
    impl CommandTransport for AlwaysDown {
        async fn send(&self, _request: DirectiveRequest) -> Result<DirectiveReply, NetworkError> {
            Err(NetworkError::Unreachable("connection refused".to_string()))
        }
    }

    struct NeverReplies;

    #[async_trait]
    impl CommandTransport for NeverReplies {
        async fn send(&self, _request: DirectiveRequest) -> Result<DirectiveReply, NetworkError> {
            std::future::pending().await
        }
    }

    #[test]
    fn test_accepts_rejects_blank_and_in_flight() {
        assert!(CommandChannel::<FixedReply>::accepts("status", false));
        assert!(!CommandChannel::<FixedReply>::accepts("", false));
        assert!(!CommandChannel::<FixedReply>::accepts("   \t", false));
        assert!(!CommandChannel::<FixedReply>::accepts("status", true));
    }

    #[tokio::test]
    async fn test_dispatch_posts_reply() {
        let channel = CommandChannel::new(FixedReply, Duration::from_secs(5));
        let (tx, mut rx) = mpsc::channel(4);

        channel.dispatch("status".to_string(), tx);

        match rx.recv().await {
            Some(SessionEvent::Reply(reply)) => assert_eq!(reply.response, "ack: status"),
            other => panic!("expected reply, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_dispatch_posts_failure() {
        let channel = CommandChannel::new(AlwaysDown, Duration::from_secs(5));
        let (tx, mut rx) = mpsc::channel(4);

        channel.dispatch("status".to_string(), tx);

        match rx.recv().await {
            Some(SessionEvent::Failed(NetworkError::Unreachable(_))) => {}
            other => panic!("expected unreachable failure, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispatch_times_out_as_network_error() {
        let channel = CommandChannel::new(NeverReplies, Duration::from_secs(30));
        let (tx, mut rx) = mpsc::channel(4);

        channel.dispatch("status".to_string(), tx);

        match rx.recv().await {
            Some(SessionEvent::Failed(NetworkError::Timeout(deadline))) => {
                assert_eq!(deadline, Duration::from_secs(30));
            }
            other => panic!("expected timeout failure, got {other:?}"),
        }
    }
}
