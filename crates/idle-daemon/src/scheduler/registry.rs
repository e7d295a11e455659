//! Per-session tracking table for the idle scheduler.
//!
//! One [`SessionSlot`] per tracked session, plus the order sessions were first
//! inserted in. Trimming under the size cap drops the oldest-inserted
//! sessions first; lookups do not refresh a session's position.
//!
//! Versions and slot epochs come from one table-wide counter, so a value is
//! never reused even after a session is removed and tracked again.
//!
//! ## Thread safety
//!
//! The table is not `Sync`. [`IdleScheduler`](super::IdleScheduler) owns it
//! behind a `Mutex`.

use std::collections::{HashMap, VecDeque};
use tokio::task::JoinHandle;

/// A countdown armed by `schedule_idle`, tagged with the version it captured.
#[derive(Debug)]
pub struct PendingTimer {
    pub version: u64,
    pub handle: JoinHandle<()>,
}

/// Idle-episode state for one session.
#[derive(Debug, Default)]
pub struct SessionSlot {
    /// Armed confirm-and-notify countdown, if any.
    pub pending: Option<PendingTimer>,
    /// Activity arrived after the timer was armed.
    pub activity_since_arm: bool,
    /// Bumped on every arm and every activity; stale timers compare against it.
    pub version: u64,
    /// A notification already fired for the current idle episode.
    pub already_notified: bool,
    /// The notification check/dispatch is in flight.
    pub executing: bool,
    /// Identifies this slot among every slot the session has ever had.
    pub epoch: u64,
}

impl SessionSlot {
    /// Abort the pending timer, if any.
    pub fn cancel_timer(&mut self) -> bool {
        match self.pending.take() {
            Some(timer) => {
                timer.handle.abort();
                true
            }
            None => false,
        }
    }
}

/// Point-in-time copy of a [`SessionSlot`] for inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
    pub timer_pending: bool,
    pub activity_since_arm: bool,
    pub version: u64,
    pub already_notified: bool,
    pub executing: bool,
}

impl From<&SessionSlot> for SessionSnapshot {
    fn from(slot: &SessionSlot) -> Self {
        Self {
            timer_pending: slot.pending.is_some(),
            activity_since_arm: slot.activity_since_arm,
            version: slot.version,
            already_notified: slot.already_notified,
            executing: slot.executing,
        }
    }
}

/// Session id → slot, with insertion order for capacity eviction.
///
/// `order` entries are tagged with the slot epoch. Removal leaves the entry
/// behind; entries whose epoch no longer matches a live slot are skipped and
/// compacted away.
#[derive(Debug, Default)]
pub struct SessionTable {
    slots: HashMap<String, SessionSlot>,
    order: VecDeque<(String, u64)>,
    counter: u64,
}

impl SessionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Next value of the table-wide counter. Never returns the same value twice.
    pub fn next_version(&mut self) -> u64 {
        self.counter += 1;
        self.counter
    }

    /// Slot for `session_id`, created empty on first use.
    pub fn get_or_insert(&mut self, session_id: &str) -> &mut SessionSlot {
        if !self.slots.contains_key(session_id) {
            let epoch = self.next_version();
            self.order.push_back((session_id.to_string(), epoch));
            self.slots.insert(
                session_id.to_string(),
                SessionSlot {
                    epoch,
                    ..SessionSlot::default()
                },
            );
        }
        self.slots.entry(session_id.to_string()).or_default()
    }

    pub fn get(&self, session_id: &str) -> Option<&SessionSlot> {
        self.slots.get(session_id)
    }

    pub fn get_mut(&mut self, session_id: &str) -> Option<&mut SessionSlot> {
        self.slots.get_mut(session_id)
    }

    /// Remove every trace of `session_id`.
    pub fn remove(&mut self, session_id: &str) -> Option<SessionSlot> {
        let slot = self.slots.remove(session_id)?;
        if self.order.len() > 2 * self.slots.len() + 16 {
            self.compact_order();
        }
        Some(slot)
    }

    fn is_live(&self, session_id: &str, epoch: u64) -> bool {
        self.slots.get(session_id).is_some_and(|s| s.epoch == epoch)
    }

    fn compact_order(&mut self) {
        let order = std::mem::take(&mut self.order);
        let live: VecDeque<(String, u64)> = order
            .into_iter()
            .filter(|(id, epoch)| self.is_live(id, *epoch))
            .collect();
        self.order = live;
    }

    /// Drop oldest-inserted sessions until at most `capacity` remain.
    ///
    /// Returns the evicted sessions so the caller can release their timers.
    pub fn evict_to_capacity(&mut self, capacity: usize) -> Vec<(String, SessionSlot)> {
        let mut evicted = Vec::new();
        while self.slots.len() > capacity {
            let Some((oldest, epoch)) = self.order.pop_front() else {
                break;
            };
            if !self.is_live(&oldest, epoch) {
                continue;
            }
            if let Some(slot) = self.slots.remove(&oldest) {
                evicted.push((oldest, slot));
            }
        }
        evicted
    }

    /// Drain all sessions (shutdown path).
    pub fn drain(&mut self) -> Vec<(String, SessionSlot)> {
        self.order.clear();
        self.slots.drain().collect()
    }

    pub fn contains(&self, session_id: &str) -> bool {
        self.slots.contains_key(session_id)
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}
