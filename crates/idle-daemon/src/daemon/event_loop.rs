//! Main daemon event loop

use super::dispatcher::EventDispatcher;
use super::watcher::{EventWatcher, read_stdin};
use crate::scheduler::IdleScheduler;
use anyhow::{Context, Result};
use session_idle_core::HostEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Channel depth between the event source and the dispatcher.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Where host events come from.
pub enum EventSource {
    File(EventWatcher),
    Stdin,
}

/// Run the daemon until `cancel` fires or the event source ends.
///
/// Events are dispatched strictly one at a time. When the source ends on its
/// own (stdin closed) the loop waits one confirmation delay so timers that
/// were already armed can still fire. All remaining timers are cancelled on
/// the way out.
pub async fn run(
    mut dispatcher: EventDispatcher,
    source: EventSource,
    scheduler: Arc<IdleScheduler>,
    cancel: CancellationToken,
) -> Result<()> {
    let (tx, rx) = mpsc::channel::<HostEvent>(EVENT_CHANNEL_CAPACITY);

    let source_cancel = cancel.child_token();
    let source_task = match source {
        EventSource::File(watcher) => {
            info!("Reading host events from {}", watcher.path().display());
            tokio::spawn(watcher.run(tx, source_cancel.clone()))
        }
        EventSource::Stdin => {
            info!("Reading host events from standard input");
            tokio::spawn(read_stdin(tx, source_cancel.clone()))
        }
    };

    let processed = drain(&mut dispatcher, rx, &cancel).await;
    info!("Event loop stopped after {processed} event(s)");

    if !cancel.is_cancelled() {
        let grace = scheduler.config().idle_confirmation_delay;
        debug!("Event source ended; waiting {grace:?} for armed timers");
        tokio::select! {
            _ = cancel.cancelled() => {}
            _ = tokio::time::sleep(grace) => {}
        }
    }

    source_cancel.cancel();
    source_task.await.context("Event source task panicked")?;
    scheduler.shutdown();
    Ok(())
}

/// Feed events from `rx` into the dispatcher until cancelled or closed.
///
/// Returns the number of events dispatched.
pub async fn drain(
    dispatcher: &mut EventDispatcher,
    mut rx: mpsc::Receiver<HostEvent>,
    cancel: &CancellationToken,
) -> usize {
    let mut processed = 0;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                debug!("Event loop cancelled");
                break;
            }
            event = rx.recv() => {
                let Some(event) = event else {
                    debug!("Event channel closed");
                    break;
                };
                let outcome = dispatcher.dispatch(&event).await;
                debug!("{} -> {outcome:?}", event.event_type);
                processed += 1;
            }
        }
    }
    processed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alert::{RecordingNotifier, StaticOracle};
    use crate::hooks::SessionNotificationHook;
    use crate::scheduler::SchedulerConfig;
    use std::time::Duration;

    fn scheduler(notifier: &RecordingNotifier) -> Arc<IdleScheduler> {
        let cfg = SchedulerConfig {
            idle_confirmation_delay: Duration::from_millis(100),
            skip_if_incomplete_todos: false,
            ..SchedulerConfig::default()
        };
        IdleScheduler::new(
            cfg,
            Arc::new(notifier.clone()),
            Arc::new(StaticOracle::answering(false)),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_stops_when_channel_closes() {
        let notifier = RecordingNotifier::new();
        let scheduler = scheduler(&notifier);
        let mut dispatcher = EventDispatcher::new(Duration::from_millis(500));
        dispatcher.register(Arc::new(SessionNotificationHook::new(Arc::clone(&scheduler))));

        let (tx, rx) = mpsc::channel(8);
        tx.send(HostEvent::idle("s1")).await.unwrap();
        tx.send(HostEvent::idle("s2")).await.unwrap();
        drop(tx);

        let processed = drain(&mut dispatcher, rx, &CancellationToken::new()).await;
        assert_eq!(processed, 2);
        assert_eq!(scheduler.tracked_sessions(), 2);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(notifier.notification_count(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drain_stops_on_cancel() {
        let mut dispatcher = EventDispatcher::new(Duration::from_millis(500));
        let (_tx, rx) = mpsc::channel::<HostEvent>(8);
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(drain(&mut dispatcher, rx, &cancel).await, 0);
    }

    #[tokio::test]
    async fn test_run_cancels_pending_timers_on_shutdown() {
        let notifier = RecordingNotifier::new();
        let cfg = SchedulerConfig {
            idle_confirmation_delay: Duration::from_secs(60),
            skip_if_incomplete_todos: false,
            ..SchedulerConfig::default()
        };
        let scheduler = IdleScheduler::new(
            cfg,
            Arc::new(notifier.clone()),
            Arc::new(StaticOracle::answering(false)),
        );
        scheduler.schedule_idle("s1");

        let dir = tempfile::TempDir::new().unwrap();
        let watcher = EventWatcher::new(dir.path().join("events.jsonl"));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            EventDispatcher::new(Duration::from_millis(500)),
            EventSource::File(watcher),
            Arc::clone(&scheduler),
            cancel.clone(),
        ));

        cancel.cancel();
        task.await.unwrap().unwrap();
        assert_eq!(scheduler.tracked_sessions(), 0);
        assert_eq!(notifier.notification_count(), 0);
    }
}
