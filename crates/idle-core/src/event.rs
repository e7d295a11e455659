//! Host lifecycle event schema
//!
//! The host emits one JSON object per event:
//!
//! ```json
//! {"type":"session.status","properties":{"sessionID":"ses_1","status":{"type":"idle"}}}
//! {"type":"session.idle","properties":{"sessionID":"ses_1"}}
//! {"type":"session.deleted","properties":{"info":{"id":"ses_1"}}}
//! {"type":"tool.execute.before","properties":{"sessionID":"ses_1","tool":"bash"}}
//! ```
//!
//! Only the fields the idle engine reads are typed. Everything else stays in
//! `properties` as raw JSON so events can be forwarded to hook consumers
//! without data loss.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use thiserror::Error;

pub const SESSION_STATUS: &str = "session.status";
pub const SESSION_IDLE: &str = "session.idle";
pub const SESSION_DELETED: &str = "session.deleted";
pub const MESSAGE_UPDATED: &str = "message.updated";
pub const TOOL_EXECUTE_BEFORE: &str = "tool.execute.before";
pub const TOOL_EXECUTE_AFTER: &str = "tool.execute.after";

/// Error decoding a host event line.
#[derive(Debug, Error)]
pub enum EventError {
    #[error("malformed event JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("event has an empty type")]
    EmptyType,
}

/// Coarse classification of a host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// Generic status change; may carry an idle state.
    SessionStatus,
    /// Dedicated idle notification from the host.
    SessionIdle,
    /// Session removed; all tracking for it can be dropped.
    SessionDeleted,
    /// Anything indicating the session is working.
    Activity,
    Other,
}

/// A single upstream lifecycle event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<Value>,
}

impl HostEvent {
    pub fn new(event_type: impl Into<String>, properties: Value) -> Self {
        Self {
            event_type: event_type.into(),
            properties: Some(properties),
        }
    }

    /// Build a canonical `session.idle` event for `session_id`.
    pub fn idle(session_id: &str) -> Self {
        Self::new(SESSION_IDLE, json!({ "sessionID": session_id }))
    }

    /// Decode one line of the host event stream.
    pub fn from_json_line(line: &str) -> Result<Self, EventError> {
        let event: HostEvent = serde_json::from_str(line)?;
        if event.event_type.trim().is_empty() {
            return Err(EventError::EmptyType);
        }
        Ok(event)
    }

    pub fn kind(&self) -> EventKind {
        match self.event_type.as_str() {
            SESSION_STATUS => EventKind::SessionStatus,
            SESSION_IDLE => EventKind::SessionIdle,
            SESSION_DELETED => EventKind::SessionDeleted,
            MESSAGE_UPDATED | TOOL_EXECUTE_BEFORE | TOOL_EXECUTE_AFTER => EventKind::Activity,
            _ => EventKind::Other,
        }
    }

    /// Session id the event refers to.
    ///
    /// Looks at `properties.sessionID` first, then `properties.info.sessionID`
    /// (message events nest it there). `session.deleted` carries the id at
    /// `properties.info.id`, which is checked last.
    pub fn session_id(&self) -> Option<&str> {
        let props = self.properties.as_ref()?;
        if let Some(id) = props.get("sessionID").and_then(Value::as_str) {
            return Some(id);
        }
        let info = props.get("info")?;
        if let Some(id) = info.get("sessionID").and_then(Value::as_str) {
            return Some(id);
        }
        if self.kind() == EventKind::SessionDeleted {
            return info.get("id").and_then(Value::as_str);
        }
        None
    }

    /// `properties.status.type` for status events.
    pub fn status_type(&self) -> Option<&str> {
        self.properties
            .as_ref()?
            .get("status")?
            .get("type")?
            .as_str()
    }
}
