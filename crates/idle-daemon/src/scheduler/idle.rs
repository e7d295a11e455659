//! Debounced, cancellable idle notification scheduler.
//!
//! `schedule_idle` arms a per-session countdown. When it expires the
//! scheduler re-validates the session and, if it is still idle and has no
//! incomplete work, fires exactly one notification for the idle episode.
//! `mark_activity` cancels the countdown and opens a new episode.
//!
//! ## Races
//!
//! Timers run on the tokio runtime and can interleave with later calls for
//! the same session. Every arm and every activity bumps the session's
//! `version`; a timer only acts if the version it captured is still current.
//! The incomplete-work query is the one suspension point, so state is checked
//! again after it returns. Every failed check is a silent abort.
//!
//! The session table sits behind a `std::sync::Mutex` that is never held
//! across an `.await`.

use super::registry::{SessionSnapshot, SessionTable};
use crate::alert::{Notifier, WorkOracle};
use session_idle_core::config::NotificationConfig;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Scheduler settings, usually derived from `[notification]`.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub idle_confirmation_delay: Duration,
    pub skip_if_incomplete_todos: bool,
    pub max_tracked_sessions: usize,
    pub title: String,
    pub message: String,
    pub play_sound: bool,
    pub sound_path: PathBuf,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from(&NotificationConfig::default())
    }
}

impl From<&NotificationConfig> for SchedulerConfig {
    fn from(n: &NotificationConfig) -> Self {
        Self {
            idle_confirmation_delay: n.idle_confirmation_delay(),
            skip_if_incomplete_todos: n.skip_if_incomplete_todos,
            max_tracked_sessions: n.max_tracked_sessions,
            title: n.title.clone(),
            message: n.message.clone(),
            play_sound: n.play_sound,
            sound_path: n.resolved_sound_path(),
        }
    }
}

/// Result of one confirm-and-fire attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Notification dispatched for this episode.
    Notified,
    /// Another firing for the session is already in flight.
    SkippedExecuting,
    /// The captured version was superseded, or the session is gone.
    SkippedStale,
    /// Activity arrived after the timer was armed.
    SkippedActivity,
    /// This episode was already notified.
    SkippedAlreadyNotified,
    /// The session still has incomplete work.
    SkippedIncompleteWork,
}

/// Per-session idle notification scheduler.
///
/// Construct with [`IdleScheduler::new`]; the scheduler is always used through
/// an `Arc` because armed timers hold a reference to it. `schedule_idle` must
/// be called from within a tokio runtime.
pub struct IdleScheduler {
    config: SchedulerConfig,
    sessions: Mutex<SessionTable>,
    notifier: Arc<dyn Notifier>,
    oracle: Arc<dyn WorkOracle>,
}

impl IdleScheduler {
    pub fn new(
        config: SchedulerConfig,
        notifier: Arc<dyn Notifier>,
        oracle: Arc<dyn WorkOracle>,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            sessions: Mutex::new(SessionTable::new()),
            notifier,
            oracle,
        })
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    fn table(&self) -> MutexGuard<'_, SessionTable> {
        self.sessions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record that `session_id` is working.
    ///
    /// Cancels any pending countdown and invalidates timers already in
    /// flight. Unless a notification is executing right now, the session
    /// becomes eligible to notify again on its next idle episode.
    pub fn mark_activity(&self, session_id: &str) {
        let mut table = self.table();
        let version = table.next_version();
        let slot = table.get_or_insert(session_id);
        if slot.cancel_timer() {
            debug!("Cancelled pending idle timer for {session_id}");
        }
        slot.activity_since_arm = true;
        slot.version = version;
        if !slot.executing {
            slot.already_notified = false;
        }
    }

    /// Arm the confirm-and-notify countdown for `session_id`.
    ///
    /// No-op when the episode was already notified, a countdown is pending,
    /// or a notification is executing.
    pub fn schedule_idle(self: &Arc<Self>, session_id: &str) {
        let mut table = self.table();
        let slot = table.get_or_insert(session_id);

        if slot.already_notified || slot.pending.is_some() || slot.executing {
            debug!(
                "Idle for {session_id} ignored (notified={}, pending={}, executing={})",
                slot.already_notified,
                slot.pending.is_some(),
                slot.executing
            );
            return;
        }

        slot.activity_since_arm = false;
        let version = table.next_version();
        let slot = table.get_or_insert(session_id);
        slot.version = version;

        let scheduler = Arc::clone(self);
        let owned_id = session_id.to_string();
        let delay = self.config.idle_confirmation_delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            scheduler.confirm_and_fire(owned_id, version).await;
        });
        slot.pending = Some(super::registry::PendingTimer { version, handle });
        debug!("Armed idle timer for {session_id} (v{version}, {delay:?})");

        for (evicted, mut slot) in table.evict_to_capacity(self.config.max_tracked_sessions) {
            slot.cancel_timer();
            debug!("Evicted idle tracking for {evicted}");
        }
    }

    /// Forget `session_id` entirely, cancelling its countdown.
    pub fn delete_session(&self, session_id: &str) {
        if let Some(mut slot) = self.table().remove(session_id) {
            slot.cancel_timer();
            debug!("Dropped idle tracking for deleted session {session_id}");
        }
    }

    /// Abort every pending countdown and forget all sessions.
    pub fn shutdown(&self) {
        let drained = self.table().drain();
        let mut cancelled = 0;
        for (_, mut slot) in drained {
            if slot.cancel_timer() {
                cancelled += 1;
            }
        }
        info!("Idle scheduler stopped ({cancelled} pending timer(s) cancelled)");
    }

    pub fn snapshot(&self, session_id: &str) -> Option<SessionSnapshot> {
        self.table().get(session_id).map(SessionSnapshot::from)
    }

    pub fn tracked_sessions(&self) -> usize {
        self.table().len()
    }

    async fn confirm_and_fire(self: Arc<Self>, session_id: String, version: u64) -> FireOutcome {
        let outcome = self.run_confirmation(&session_id, version).await;
        match outcome {
            FireOutcome::Notified => info!("Idle notification sent for {session_id}"),
            other => debug!("Idle notification for {session_id} (v{version}) skipped: {other:?}"),
        }
        outcome
    }

    async fn run_confirmation(&self, session_id: &str, version: u64) -> FireOutcome {
        let epoch = match self.begin_execution(session_id, version) {
            Ok(epoch) => epoch,
            Err(outcome) => return outcome,
        };
        let _executing = ExecutingGuard {
            scheduler: self,
            session_id,
            epoch,
        };

        if self.config.skip_if_incomplete_todos {
            let has_work = match self.oracle.has_incomplete_work(session_id).await {
                Ok(has_work) => has_work,
                Err(e) => {
                    warn!("Incomplete-work check failed for {session_id}, notifying anyway: {e}");
                    false
                }
            };
            if let Some(outcome) = self.still_current(session_id, version) {
                return outcome;
            }
            if has_work {
                return FireOutcome::SkippedIncompleteWork;
            }
        }

        if !self.claim_episode(session_id, version) {
            return FireOutcome::SkippedActivity;
        }

        self.deliver(session_id).await;
        FireOutcome::Notified
    }

    /// Pre-flight guards, then mark the session as executing.
    ///
    /// Returns the epoch of the slot the confirmation now owns.
    fn begin_execution(&self, session_id: &str, version: u64) -> Result<u64, FireOutcome> {
        let mut table = self.table();
        let Some(slot) = table.get_mut(session_id) else {
            return Err(FireOutcome::SkippedStale);
        };

        // This timer has fired; detach its handle so a later cancellation
        // cannot abort the confirmation halfway through.
        if slot.pending.as_ref().is_some_and(|t| t.version == version) {
            slot.pending = None;
        }

        if slot.executing {
            return Err(FireOutcome::SkippedExecuting);
        }
        if slot.version != version {
            return Err(FireOutcome::SkippedStale);
        }
        if slot.activity_since_arm {
            slot.activity_since_arm = false;
            return Err(FireOutcome::SkippedActivity);
        }
        if slot.already_notified {
            return Err(FireOutcome::SkippedAlreadyNotified);
        }

        slot.executing = true;
        Ok(slot.epoch)
    }

    /// Re-validation after the incomplete-work query returns.
    fn still_current(&self, session_id: &str, version: u64) -> Option<FireOutcome> {
        let table = self.table();
        let Some(slot) = table.get(session_id) else {
            return Some(FireOutcome::SkippedStale);
        };
        if slot.version != version {
            return Some(FireOutcome::SkippedStale);
        }
        if slot.activity_since_arm {
            return Some(FireOutcome::SkippedActivity);
        }
        None
    }

    /// Final activity check; on success the episode is marked notified.
    fn claim_episode(&self, session_id: &str, version: u64) -> bool {
        let mut table = self.table();
        match table.get_mut(session_id) {
            Some(slot) if slot.version == version && !slot.activity_since_arm => {
                slot.already_notified = true;
                true
            }
            _ => false,
        }
    }

    async fn deliver(&self, session_id: &str) {
        let c = &self.config;
        if let Err(e) = self.notifier.send_notification(&c.title, &c.message).await {
            warn!("Failed to send idle notification for {session_id}: {e}");
        }
        if c.play_sound
            && let Err(e) = self.notifier.play_sound(&c.sound_path).await
        {
            warn!("Failed to play idle sound {}: {e}", c.sound_path.display());
        }
    }

    /// Cleanup that runs however the confirmation ends.
    ///
    /// A slot with another epoch belongs to a later incarnation of the
    /// session and is left alone.
    fn finish_execution(&self, session_id: &str, epoch: u64) {
        let mut table = self.table();
        if let Some(slot) = table.get_mut(session_id)
            && slot.epoch == epoch
        {
            slot.executing = false;
            if slot.activity_since_arm {
                slot.already_notified = false;
                slot.activity_since_arm = false;
            }
        }
    }
}

/// Clears `executing` when the confirmation returns, early or not.
struct ExecutingGuard<'a> {
    scheduler: &'a IdleScheduler,
    session_id: &'a str,
    epoch: u64,
}

impl Drop for ExecutingGuard<'_> {
    fn drop(&mut self) {
        self.scheduler.finish_execution(self.session_id, self.epoch);
    }
}
