//! Channel Events
//!
//! Everything the reconciler consumes arrives as a [`SessionEvent`] on a
//! single queue. Both channels post into the same queue, so queue order is
//! completion-arrival order, and applying events in queue order is what
//! merges the two channels into one consistent view.

use crate::error::NetworkError;
use crate::session::ConnectionStatus;
use crate::wire::{AutonomousEvent, DirectiveReply};

/// An event from either channel, applied by the reconciler in arrival order.
#[derive(Debug)]
pub enum SessionEvent {
    /// A validated autonomous frame from the push channel.
    Push(AutonomousEvent),

    /// Push connection lifecycle change.
    Status(ConnectionStatus),

    /// Reply to the in-flight directive.
    Reply(DirectiveReply),

    /// The in-flight directive failed at the transport level.
    Failed(NetworkError),
}
