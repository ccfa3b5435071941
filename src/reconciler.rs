//! Reconciler
//!
//! The only writer of [`SessionState`]. User directives and channel events
//! both land here and are applied one at a time, in the order their
//! completions arrive, which is what merges the synchronous command channel
//! and the asynchronous push channel into one ordered timeline.
//!
//! # Design Philosophy
//!
//! Every invariant of the session lives in these update operations: one
//! timeline append per accepted event, last-accepted-wins mood and stats,
//! the single-in-flight command guard, and connection status driven only
//! by the push channel. A presentation layer watches the published
//! snapshots; it has no write access.

use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::clock::Clock;
use crate::command::{CommandChannel, CommandTransport};
use crate::events::SessionEvent;
use crate::session::{Message, SessionState};

/// Fixed user-facing text appended when a directive fails in transit.
pub const COMMAND_FAILED_TEXT: &str = "Connection to Ultron Core failed.";

/// Notified on every timeline append, so a presentation layer can react
/// (scroll to bottom, raise a toast) without polling the snapshot stream.
pub trait TimelineObserver: Send + Sync {
    /// A message was appended to the timeline.
    fn message_appended(&self, message: &Message);
}

/// Sole writer of the session state.
pub struct Reconciler<T: CommandTransport + 'static> {
    state: SessionState,
    command: CommandChannel<T>,
    events_tx: mpsc::Sender<SessionEvent>,
    clock: Arc<dyn Clock>,
    snapshots: watch::Sender<SessionState>,
    observer: Option<Box<dyn TimelineObserver>>,
}

impl<T: CommandTransport + 'static> Reconciler<T> {
    /// Create a reconciler and the snapshot stream a presentation layer
    /// watches. `events_tx` must be the sender side of the queue the
    /// reconciler is driven from, so command completions re-enter it.
    pub fn new(
        command: CommandChannel<T>,
        events_tx: mpsc::Sender<SessionEvent>,
        clock: Arc<dyn Clock>,
    ) -> (Self, watch::Receiver<SessionState>) {
        let state = SessionState::new();
        let (snapshots, snapshots_rx) = watch::channel(state.clone());
        (
            Self {
                state,
                command,
                events_tx,
                clock,
                snapshots,
                observer: None,
            },
            snapshots_rx,
        )
    }

    /// Attach an observer for timeline appends.
    #[must_use]
    pub fn with_observer(mut self, observer: Box<dyn TimelineObserver>) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Current state, for direct inspection.
    #[must_use]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle a user directive.
    ///
    /// A blank directive, or one arriving while another is outstanding, is
    /// a quiet no-op: nothing is dispatched and nothing is appended. An
    /// accepted directive appends its user message immediately, before any
    /// reply exists, and raises the in-flight guard until the completion
    /// event clears it.
    pub fn handle_directive(&mut self, directive: &str) {
        if !CommandChannel::<T>::accepts(directive, self.state.command_in_flight()) {
            tracing::debug!("directive refused: blank or command already in flight");
            return;
        }

        self.state.set_command_in_flight(true);
        self.append(Message::user(directive, self.clock.now()));
        self.command
            .dispatch(directive.to_string(), self.events_tx.clone());
        self.publish();
    }

    /// Apply one channel event.
    pub fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Push(push) => {
                self.append(Message::autonomous(
                    push.text,
                    push.mood.clone(),
                    push.trigger,
                    self.clock.now(),
                ));
                if let Some(mood) = push.mood {
                    self.state.set_mood(mood);
                }
                // A frame without stats leaves the last snapshot in place.
                if let Some(stats) = push.stats {
                    self.state.set_stats(stats);
                }
            }

            SessionEvent::Reply(reply) => {
                let tool_used = (reply.tool_used != "none").then_some(reply.tool_used);
                self.append(Message::agent(
                    reply.response,
                    reply.mood.clone(),
                    tool_used,
                    self.clock.now(),
                ));
                self.state.set_mood(reply.mood);
                self.state.set_stats(reply.stats.into());
                self.state.set_command_in_flight(false);
            }

            SessionEvent::Failed(err) => {
                tracing::warn!(error = %err, "directive failed");
                self.append(Message::error(COMMAND_FAILED_TEXT, self.clock.now()));
                self.state.set_command_in_flight(false);
            }

            SessionEvent::Status(status) => {
                self.state.set_connection_status(status);
            }
        }
        self.publish();
    }

    /// Drive the reconciler until the session ends.
    ///
    /// Ends when the directive source closes (the session is being torn
    /// down) or the event queue is exhausted with no senders left. A
    /// directive still in flight at that point resolves into a queue
    /// nobody reads; its outcome is discarded.
    pub async fn run(
        mut self,
        mut events: mpsc::Receiver<SessionEvent>,
        mut directives: mpsc::Receiver<String>,
    ) {
        loop {
            tokio::select! {
                event = events.recv() => match event {
                    Some(event) => self.apply(event),
                    None => break,
                },
                directive = directives.recv() => match directive {
                    Some(directive) => self.handle_directive(&directive),
                    None => break,
                },
            }
        }
        tracing::info!("session ended");
    }

    fn append(&mut self, message: Message) {
        self.state.push_message(message);
        if let (Some(observer), Some(last)) = (&self.observer, self.state.timeline().last()) {
            observer.message_appended(last);
        }
    }

    fn publish(&self) {
        self.snapshots.send_replace(self.state.clone());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use pretty_assertions::assert_eq;

    use crate::clock::ManualClock;
    use crate::error::NetworkError;
    use crate::session::{ConnectionStatus, MessageKind, ResourceStats};
    use crate::wire::{AutonomousEvent, DirectiveReply, DirectiveRequest, WireStats};

    /// Transport that never resolves; completions are injected by hand so
    /// tests control arrival order exactly.
    struct SilentTransport;

    #[async_trait]
    impl CommandTransport for SilentTransport {
        async fn send(&self, _request: DirectiveRequest) -> Result<DirectiveReply, NetworkError> {
            std::future::pending().await
        }
    }

    fn reconciler() -> (
        Reconciler<SilentTransport>,
        mpsc::Receiver<SessionEvent>,
        watch::Receiver<SessionState>,
    ) {
        let (events_tx, events_rx) = mpsc::channel(16);
        let command = CommandChannel::new(SilentTransport, Duration::from_secs(30));
        let (reconciler, snapshots) =
            Reconciler::new(command, events_tx, Arc::new(ManualClock::new()));
        (reconciler, events_rx, snapshots)
    }

    fn reply(text: &str, mood: &str, tool: &str, cpu: f64) -> DirectiveReply {
        DirectiveReply {
            response: text.to_string(),
            mood: mood.to_string(),
            tool_used: tool.to_string(),
            success: true,
            stats: WireStats {
                cpu,
                ram: 40.1,
                battery: 87.0,
            },
        }
    }

    #[tokio::test]
    async fn test_blank_directive_is_a_no_op() {
        let (mut reconciler, _events, _snapshots) = reconciler();

        reconciler.handle_directive("");
        reconciler.handle_directive("   \t  ");

        assert!(reconciler.state().timeline().is_empty());
        assert!(!reconciler.state().command_in_flight());
    }

    #[tokio::test]
    async fn test_accepted_directive_appends_user_message_immediately() {
        let (mut reconciler, _events, _snapshots) = reconciler();

        reconciler.handle_directive("status");

        let timeline = reconciler.state().timeline();
        assert_eq!(timeline.len(), 1);
        assert_eq!(timeline[0].kind, MessageKind::User);
        assert_eq!(timeline[0].text, "status");
        assert!(reconciler.state().command_in_flight());
    }

    #[tokio::test]
    async fn test_second_directive_while_in_flight_is_a_no_op() {
        let (mut reconciler, _events, _snapshots) = reconciler();

        reconciler.handle_directive("status");
        reconciler.handle_directive("open the pod bay doors");

        assert_eq!(reconciler.state().timeline().len(), 1);
        assert!(reconciler.state().command_in_flight());
    }

    #[tokio::test]
    async fn test_reply_appends_agent_message_and_updates_shared_state() {
        let (mut reconciler, _events, _snapshots) = reconciler();
        reconciler.handle_directive("status");

        reconciler.apply(SessionEvent::Reply(reply(
            "All systems nominal.",
            "OBSERVANT",
            "none",
            12.3,
        )));

        let state = reconciler.state();
        assert_eq!(state.timeline().len(), 2);
        let agent = &state.timeline()[1];
        assert_eq!(agent.kind, MessageKind::Agent);
        assert_eq!(agent.text, "All systems nominal.");
        assert_eq!(agent.mood.as_deref(), Some("OBSERVANT"));
        // "none" means no capability was invoked: no tool badge.
        assert!(agent.tool_used.is_none());
        assert_eq!(state.mood(), "OBSERVANT");
        assert_eq!(state.stats().cpu_percent, 12.3);
        assert_eq!(state.stats().ram_percent, 40.1);
        assert_eq!(state.stats().battery_percent, 87.0);
        assert!(!state.command_in_flight());
    }

    #[tokio::test]
    async fn test_reply_with_tool_carries_tool_badge() {
        let (mut reconciler, _events, _snapshots) = reconciler();
        reconciler.handle_directive("volume to 40");

        reconciler.apply(SessionEvent::Reply(reply(
            "Volume set to 40%.",
            "IRRITATED",
            "set_volume",
            8.0,
        )));

        let agent = &reconciler.state().timeline()[1];
        assert_eq!(agent.tool_used.as_deref(), Some("set_volume"));
        assert_eq!(reconciler.state().mood(), "IRRITATED");
    }

    #[tokio::test]
    async fn test_failure_appends_one_error_and_releases_guard() {
        let (mut reconciler, _events, _snapshots) = reconciler();
        reconciler.handle_directive("status");
        let mood_before = reconciler.state().mood().to_string();
        let stats_before = reconciler.state().stats();

        reconciler.apply(SessionEvent::Failed(NetworkError::Unreachable(
            "connection refused".to_string(),
        )));

        let state = reconciler.state();
        assert_eq!(state.timeline().len(), 2);
        let error = &state.timeline()[1];
        assert_eq!(error.kind, MessageKind::Error);
        assert_eq!(error.text, COMMAND_FAILED_TEXT);
        assert_eq!(state.mood(), mood_before);
        assert_eq!(state.stats(), stats_before);
        assert!(!state.command_in_flight());
    }

    #[tokio::test]
    async fn test_push_event_appends_autonomous_message() {
        let (mut reconciler, _events, _snapshots) = reconciler();
        let stats_before = reconciler.state().stats();

        reconciler.apply(SessionEvent::Push(AutonomousEvent {
            text: "Idle.".to_string(),
            mood: Some("BORED".to_string()),
            trigger: Some("timer".to_string()),
            stats: None,
        }));

        let state = reconciler.state();
        assert_eq!(state.timeline().len(), 1);
        let auto = &state.timeline()[0];
        assert_eq!(auto.kind, MessageKind::Autonomous);
        assert_eq!(auto.trigger.as_deref(), Some("timer"));
        assert_eq!(state.mood(), "BORED");
        // The frame carried no stats: the snapshot is unchanged.
        assert_eq!(state.stats(), stats_before);
    }

    #[tokio::test]
    async fn test_push_event_without_mood_leaves_mood_unchanged() {
        let (mut reconciler, _events, _snapshots) = reconciler();

        reconciler.apply(SessionEvent::Push(AutonomousEvent {
            text: "...".to_string(),
            mood: None,
            trigger: None,
            stats: None,
        }));

        assert_eq!(reconciler.state().mood(), "OBSERVANT");
        assert_eq!(reconciler.state().timeline().len(), 1);
    }

    #[tokio::test]
    async fn test_status_change_never_appends_a_message() {
        let (mut reconciler, _events, _snapshots) = reconciler();

        reconciler.apply(SessionEvent::Status(ConnectionStatus::Connecting));
        reconciler.apply(SessionEvent::Status(ConnectionStatus::Open));
        reconciler.apply(SessionEvent::Status(ConnectionStatus::Closed));

        assert!(reconciler.state().timeline().is_empty());
        assert_eq!(
            reconciler.state().connection_status(),
            ConnectionStatus::Closed
        );
    }

    #[tokio::test]
    async fn test_mood_and_stats_are_last_accepted_wins() {
        let (mut reconciler, _events, _snapshots) = reconciler();

        reconciler.handle_directive("status");
        reconciler.apply(SessionEvent::Push(AutonomousEvent {
            text: "CPU spike.".to_string(),
            mood: Some("IRRITATED".to_string()),
            trigger: Some("high_cpu".to_string()),
            stats: Some(ResourceStats {
                cpu_percent: 95.0,
                ram_percent: 60.0,
                battery_percent: 50.0,
            }),
        }));
        // The reply completes after the push event, so it wins.
        reconciler.apply(SessionEvent::Reply(reply(
            "All systems nominal.",
            "OBSERVANT",
            "none",
            12.3,
        )));

        let state = reconciler.state();
        assert_eq!(state.mood(), "OBSERVANT");
        assert_eq!(state.stats().cpu_percent, 12.3);
        assert_eq!(state.timeline().len(), 3);
    }

    #[tokio::test]
    async fn test_snapshots_follow_every_applied_event() {
        let (mut reconciler, _events, mut snapshots) = reconciler();

        reconciler.apply(SessionEvent::Status(ConnectionStatus::Open));
        assert_eq!(
            snapshots.borrow_and_update().connection_status(),
            ConnectionStatus::Open
        );

        reconciler.handle_directive("status");
        assert_eq!(snapshots.borrow_and_update().timeline().len(), 1);
    }

    #[tokio::test]
    async fn test_observer_sees_each_append() {
        struct Counter(Arc<AtomicUsize>);
        impl TimelineObserver for Counter {
            fn message_appended(&self, _message: &Message) {
                self.0.fetch_add(1, Ordering::SeqCst);
            }
        }

        let appended = Arc::new(AtomicUsize::new(0));
        let (events_tx, _events_rx) = mpsc::channel(16);
        let command = CommandChannel::new(SilentTransport, Duration::from_secs(30));
        let (reconciler, _snapshots) =
            Reconciler::new(command, events_tx, Arc::new(ManualClock::new()));
        let mut reconciler = reconciler.with_observer(Box::new(Counter(Arc::clone(&appended))));

        reconciler.handle_directive("status");
        reconciler.apply(SessionEvent::Status(ConnectionStatus::Open));
        reconciler.apply(SessionEvent::Failed(NetworkError::Status(500)));

        // Two appends: the user message and the error. Status changes never
        // touch the timeline.
        assert_eq!(appended.load(Ordering::SeqCst), 2);
    }
}
