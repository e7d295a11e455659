//! Event dispatcher: normalize, deduplicate, fan out.
//!
//! Every upstream event passes through [`EventDispatcher::dispatch`] exactly
//! once. The dedup window is pruned first, then:
//!
//! - a `session.idle` whose synthetic counterpart was already delivered is
//!   dropped entirely;
//! - every other event is forwarded to each consumer;
//! - a `session.status` that normalizes to a fresh synthetic idle signal is
//!   followed by a canonical `session.idle` for the same session.

use super::dedup::IdleDedupWindow;
use super::normalize::{normalize, real_idle};
use crate::hooks::HookConsumer;
use session_idle_core::HostEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// What the dispatcher did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// Forwarded unchanged.
    Forwarded,
    /// Duplicate idle signal swallowed; nothing forwarded.
    Suppressed,
    /// Forwarded, then followed by a canonical `session.idle`.
    ForwardedWithIdle,
}

pub struct EventDispatcher {
    consumers: Vec<Arc<dyn HookConsumer>>,
    dedup: IdleDedupWindow,
}

impl EventDispatcher {
    pub fn new(dedup_window: Duration) -> Self {
        Self {
            consumers: Vec::new(),
            dedup: IdleDedupWindow::new(dedup_window),
        }
    }

    /// Register a consumer. Consumers receive events in registration order.
    pub fn register(&mut self, consumer: Arc<dyn HookConsumer>) {
        debug!("Registered hook consumer {}", consumer.name());
        self.consumers.push(consumer);
    }

    pub fn consumer_count(&self) -> usize {
        self.consumers.len()
    }

    pub async fn dispatch(&mut self, event: &HostEvent) -> DispatchOutcome {
        self.dispatch_at(event, Instant::now()).await
    }

    /// Dispatch with an explicit arrival instant.
    pub async fn dispatch_at(&mut self, event: &HostEvent, now: Instant) -> DispatchOutcome {
        self.dedup.prune(now);

        if let Some(signal) = real_idle(event)
            && !self.dedup.admit(&signal, now)
        {
            return DispatchOutcome::Suppressed;
        }

        self.fan_out(event).await;

        let Some(signal) = normalize(event) else {
            return DispatchOutcome::Forwarded;
        };
        if !self.dedup.admit(&signal, now) {
            return DispatchOutcome::Forwarded;
        }

        debug!("Idle status for {} promoted to session.idle", signal.session_id);
        self.fan_out(&HostEvent::idle(&signal.session_id)).await;
        DispatchOutcome::ForwardedWithIdle
    }

    async fn fan_out(&self, event: &HostEvent) {
        for consumer in &self.consumers {
            if let Err(e) = consumer.on_event(event).await {
                warn!(
                    "Hook consumer {} failed on {}: {e}",
                    consumer.name(),
                    event.event_type
                );
            }
        }
    }
}
