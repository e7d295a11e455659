//! Idle signal extraction from host events.
//!
//! Two host events can mean "this session went idle": the dedicated
//! `session.idle` event (a *real* signal) and a `session.status` event whose
//! status is `idle` (a *synthetic* signal). Both are reduced to an
//! [`IdleSignal`] so the dedup window can compare them.

use serde_json::Value;
use session_idle_core::event::{EventKind, HostEvent};

/// Where an idle signal came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IdleOrigin {
    /// Delivered by the host as `session.idle`.
    Real,
    /// Inferred from a `session.status` event.
    Synthetic,
}

impl std::fmt::Display for IdleOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Real => write!(f, "real"),
            Self::Synthetic => write!(f, "synthetic"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdleSignal {
    pub session_id: String,
    pub origin: IdleOrigin,
}

/// Map a `session.status` event carrying an idle status to a synthetic
/// idle signal. Every other event, or a status event missing `properties`,
/// `properties.sessionID` or an `idle` status type, yields `None`.
pub fn normalize(event: &HostEvent) -> Option<IdleSignal> {
    if event.kind() != EventKind::SessionStatus {
        return None;
    }
    if event.status_type()? != "idle" {
        return None;
    }
    let session_id = event
        .properties
        .as_ref()?
        .get("sessionID")
        .and_then(Value::as_str)?;
    Some(IdleSignal {
        session_id: session_id.to_string(),
        origin: IdleOrigin::Synthetic,
    })
}

/// Real idle signal for a `session.idle` event that names its session.
pub fn real_idle(event: &HostEvent) -> Option<IdleSignal> {
    if event.kind() != EventKind::SessionIdle {
        return None;
    }
    Some(IdleSignal {
        session_id: event.session_id()?.to_string(),
        origin: IdleOrigin::Real,
    })
}
