//! Bridges the event stream to the [`IdleScheduler`].
//!
//! | Event | Scheduler call |
//! |-------|----------------|
//! | `session.idle` | `schedule_idle` |
//! | `message.updated`, `tool.execute.*` | `mark_activity` |
//! | `session.deleted` | `delete_session` |
//!
//! `session.status` is not acted on here: an idle status reaches this hook as
//! the canonical `session.idle` the dispatcher emits after deduplication.

use super::{HookConsumer, HookError};
use crate::scheduler::IdleScheduler;
use async_trait::async_trait;
use session_idle_core::{EventKind, HostEvent};
use std::sync::Arc;
use tracing::debug;

pub struct SessionNotificationHook {
    scheduler: Arc<IdleScheduler>,
}

impl SessionNotificationHook {
    pub fn new(scheduler: Arc<IdleScheduler>) -> Self {
        Self { scheduler }
    }
}

#[async_trait]
impl HookConsumer for SessionNotificationHook {
    fn name(&self) -> &'static str {
        "session-notification"
    }

    async fn on_event(&self, event: &HostEvent) -> Result<(), HookError> {
        let kind = event.kind();
        if matches!(kind, EventKind::SessionStatus | EventKind::Other) {
            return Ok(());
        }

        let Some(session_id) = event.session_id() else {
            debug!("{} event without a session id ignored", event.event_type);
            return Ok(());
        };

        match kind {
            EventKind::SessionIdle => self.scheduler.schedule_idle(session_id),
            EventKind::Activity => self.scheduler.mark_activity(session_id),
            EventKind::SessionDeleted => self.scheduler.delete_session(session_id),
            EventKind::SessionStatus | EventKind::Other => {}
        }
        Ok(())
    }
}
