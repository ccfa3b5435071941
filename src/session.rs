//! Session State
//!
//! The single mutable aggregate behind the conversational view: the ordered
//! message timeline, the agent's current mood, the latest resource snapshot,
//! the push-connection status, and the in-flight command guard.
//!
//! # Design Philosophy
//!
//! Both channels feed one state container with exactly one writer (the
//! reconciler). Read access is public; mutation is crate-private so every
//! invariant lives in one place and is unit-testable without any rendering
//! layer. A presentation layer observes this state; it never writes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mood label the session starts with, before the backend reports one.
pub const INITIAL_MOOD: &str = "OBSERVANT";

/// What produced a timeline message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A directive typed by the user.
    User,
    /// The agent's reply to a directive.
    Agent,
    /// An unsolicited message pushed by the agent.
    Autonomous,
    /// A locally generated failure notice.
    Error,
}

/// One entry in the session timeline. Immutable once appended.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Message {
    /// What produced this message.
    pub kind: MessageKind,
    /// Content text.
    pub text: String,
    /// Mood label, carried by agent and autonomous messages.
    pub mood: Option<String>,
    /// Stimulus that caused an autonomous message.
    pub trigger: Option<String>,
    /// Capability invoked for an agent reply; absent when the backend only
    /// conversed.
    pub tool_used: Option<String>,
    /// Arrival time at append, not origin time.
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// A user directive, appended as soon as the directive is accepted.
    #[must_use]
    pub fn user(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: MessageKind::User,
            text: text.into(),
            mood: None,
            trigger: None,
            tool_used: None,
            timestamp,
        }
    }

    /// An agent reply to a directive.
    #[must_use]
    pub fn agent(
        text: impl Into<String>,
        mood: impl Into<String>,
        tool_used: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: MessageKind::Agent,
            text: text.into(),
            mood: Some(mood.into()),
            trigger: None,
            tool_used,
            timestamp,
        }
    }

    /// An unsolicited message pushed by the agent.
    #[must_use]
    pub fn autonomous(
        text: impl Into<String>,
        mood: Option<String>,
        trigger: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: MessageKind::Autonomous,
            text: text.into(),
            mood,
            trigger,
            tool_used: None,
            timestamp,
        }
    }

    /// A locally generated failure notice.
    #[must_use]
    pub fn error(text: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind: MessageKind::Error,
            text: text.into(),
            mood: None,
            trigger: None,
            tool_used: None,
            timestamp,
        }
    }
}

/// Host resource usage snapshot reported by the backend.
///
/// Values are percentages as reported; no clamping is applied here.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResourceStats {
    /// CPU load percentage.
    pub cpu_percent: f64,
    /// RAM usage percentage.
    pub ram_percent: f64,
    /// Battery charge percentage.
    pub battery_percent: f64,
}

impl Default for ResourceStats {
    fn default() -> Self {
        Self {
            cpu_percent: 0.0,
            ram_percent: 0.0,
            battery_percent: 100.0,
        }
    }
}

/// Lifecycle status of the push connection.
///
/// Driven solely by the push channel; command activity never alters it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConnectionStatus {
    /// A connection attempt is underway.
    Connecting,
    /// The connection is established.
    Open,
    /// A locally initiated close is in progress.
    Closing,
    /// No connection exists.
    Closed,
}

/// The session aggregate, written only by the reconciler.
#[derive(Clone, Debug)]
pub struct SessionState {
    timeline: Vec<Message>,
    mood: String,
    stats: ResourceStats,
    connection_status: ConnectionStatus,
    command_in_flight: bool,
}

impl Default for SessionState {
    fn default() -> Self {
        Self {
            timeline: Vec::new(),
            mood: INITIAL_MOOD.to_string(),
            stats: ResourceStats::default(),
            connection_status: ConnectionStatus::Closed,
            command_in_flight: false,
        }
    }
}

impl SessionState {
    /// Create the initial state: empty timeline, observant mood, idle
    /// stats, no connection, no command in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The ordered message timeline. Insertion order is display order.
    #[must_use]
    pub fn timeline(&self) -> &[Message] {
        &self.timeline
    }

    /// The agent's current mood label.
    #[must_use]
    pub fn mood(&self) -> &str {
        &self.mood
    }

    /// The most recently accepted resource snapshot.
    #[must_use]
    pub fn stats(&self) -> ResourceStats {
        self.stats
    }

    /// Current push-connection status.
    #[must_use]
    pub fn connection_status(&self) -> ConnectionStatus {
        self.connection_status
    }

    /// Whether a directive is currently outstanding.
    #[must_use]
    pub fn command_in_flight(&self) -> bool {
        self.command_in_flight
    }

    /// Append a message. The timeline never shrinks or reorders.
    pub(crate) fn push_message(&mut self, message: Message) {
        self.timeline.push(message);
    }

    pub(crate) fn set_mood(&mut self, mood: String) {
        self.mood = mood;
    }

    pub(crate) fn set_stats(&mut self, stats: ResourceStats) {
        self.stats = stats;
    }

    pub(crate) fn set_connection_status(&mut self, status: ConnectionStatus) {
        self.connection_status = status;
    }

    pub(crate) fn set_command_in_flight(&mut self, in_flight: bool) {
        self.command_in_flight = in_flight;
    }
}
