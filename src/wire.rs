//! Wire Contract
//!
//! Serde types for both channels: the directive request/reply exchanged
//! over the command endpoint, and the frames the agent pushes over the
//! persistent connection. Push frames are validated here; anything that
//! does not match the autonomous shape is a [`MalformedPayloadError`] and
//! is dropped by the push channel.

use serde::{Deserialize, Serialize};

use crate::error::MalformedPayloadError;
use crate::session::ResourceStats;

/// Body of a directive request.
#[derive(Clone, Debug, Serialize)]
pub struct DirectiveRequest {
    /// The user-issued directive text.
    pub text: String,
}

/// Resource snapshot as both channels carry it on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WireStats {
    /// CPU load percentage.
    pub cpu: f64,
    /// RAM usage percentage.
    pub ram: f64,
    /// Battery charge percentage.
    pub battery: f64,
}

impl From<WireStats> for ResourceStats {
    fn from(stats: WireStats) -> Self {
        Self {
            cpu_percent: stats.cpu,
            ram_percent: stats.ram,
            battery_percent: stats.battery,
        }
    }
}

/// Successful reply to a directive.
#[derive(Clone, Debug, Deserialize)]
pub struct DirectiveReply {
    /// Reply text.
    pub response: String,
    /// Mood label after handling the directive.
    pub mood: String,
    /// Capability the backend invoked; `"none"` when it only conversed.
    pub tool_used: String,
    /// Whether the backend considers the directive satisfied.
    pub success: bool,
    /// Resource snapshot taken alongside the reply.
    pub stats: WireStats,
}

/// A validated autonomous push frame.
#[derive(Clone, Debug, PartialEq)]
pub struct AutonomousEvent {
    /// The unsolicited message text.
    pub text: String,
    /// Mood label, when the frame carried one.
    pub mood: Option<String>,
    /// Stimulus that caused the event.
    pub trigger: Option<String>,
    /// Resource snapshot, when the frame carried one.
    pub stats: Option<ResourceStats>,
}

/// Raw push frame shape, before validation.
#[derive(Debug, Deserialize)]
struct PushFrame {
    #[serde(rename = "type")]
    kind: Option<String>,
    text: Option<String>,
    mood: Option<String>,
    trigger: Option<String>,
    stats: Option<WireStats>,
}

/// Validate a raw inbound text frame.
///
/// Accepted only when `type` is `"autonomous"` and `text` is non-empty.
/// `mood` and `trigger` are expected but tolerated when missing; `stats`
/// is optional. Everything else is malformed.
pub fn parse_push_frame(raw: &str) -> Result<AutonomousEvent, MalformedPayloadError> {
    let frame: PushFrame =
        serde_json::from_str(raw).map_err(|err| MalformedPayloadError::Json(err.to_string()))?;

    match frame.kind.as_deref() {
        Some("autonomous") => {}
        other => {
            return Err(MalformedPayloadError::UnexpectedKind(
                other.unwrap_or("<missing>").to_string(),
            ));
        }
    }

    let text = frame.text.unwrap_or_default();
    if text.trim().is_empty() {
        return Err(MalformedPayloadError::EmptyText);
    }

    Ok(AutonomousEvent {
        text,
        mood: frame.mood,
        trigger: frame.trigger,
        stats: frame.stats.map(ResourceStats::from),
    })
}
