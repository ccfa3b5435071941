//! Error Taxonomy
//!
//! Every failure in the session core is recoverable. A failed command
//! degrades to a single inline timeline message, a lost push connection
//! degrades to a status indicator while the reconnect loop runs, and a
//! malformed push frame is dropped where it arrives. Nothing here stops
//! the session.

use std::time::Duration;

use thiserror::Error;

/// A directive request failed before a usable reply was obtained.
///
/// Surfaced as exactly one `error` message in the timeline; mood and stats
/// are left untouched and the in-flight guard is released.
#[derive(Debug, Error)]
pub enum NetworkError {
    /// The command endpoint could not be reached.
    #[error("command endpoint unreachable: {0}")]
    Unreachable(String),

    /// The endpoint answered with a non-success HTTP status.
    #[error("command endpoint returned status {0}")]
    Status(u16),

    /// The reply body did not match the wire contract.
    #[error("malformed command reply: {0}")]
    Decode(String),

    /// No reply arrived within the configured deadline.
    #[error("command timed out after {0:?}")]
    Timeout(Duration),
}

/// The push connection failed to open, closed, or errored mid-stream.
///
/// Never surfaced to the timeline; visible only through the connection
/// status while the channel reconnects.
#[derive(Debug, Error)]
pub enum ConnectionError {
    /// The connection could not be established.
    #[error("push connect failed: {0}")]
    Connect(String),

    /// An established connection was lost.
    #[error("push connection lost: {0}")]
    Lost(String),
}

/// An inbound push frame failed shape validation.
///
/// Logged and dropped by the push channel; never raised to a caller and
/// never mutates session state.
#[derive(Debug, Error)]
pub enum MalformedPayloadError {
    /// The frame was not valid JSON.
    #[error("push frame is not valid JSON: {0}")]
    Json(String),

    /// The frame's `type` field was missing or not `autonomous`.
    #[error("push frame has unexpected type {0:?}")]
    UnexpectedKind(String),

    /// The frame carried no text, or only whitespace.
    #[error("push frame carries no text")]
    EmptyText,
}
