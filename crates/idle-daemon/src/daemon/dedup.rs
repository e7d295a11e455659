//! Cross-source idle deduplication window.
//!
//! The host can report one idle transition twice: once as `session.idle` and
//! once as a `session.status` carrying `idle`, in either order. The window
//! remembers when each origin last emitted for a session and swallows the
//! second signal if it arrives within `window` of the first.
//!
//! Entries are in-memory only and pruned before every event, so a missing
//! entry always means "no recent signal of that origin".

use super::normalize::{IdleOrigin, IdleSignal};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Two per-origin maps of `session_id → last emitted at`.
#[derive(Debug)]
pub struct IdleDedupWindow {
    real: HashMap<String, Instant>,
    synthetic: HashMap<String, Instant>,
    window: Duration,
}

impl IdleDedupWindow {
    pub fn new(window: Duration) -> Self {
        Self {
            real: HashMap::new(),
            synthetic: HashMap::new(),
            window,
        }
    }

    /// Drop every entry, in both maps, whose age is at least the window.
    pub fn prune(&mut self, now: Instant) {
        let window = self.window;
        let fresh = |ts: &mut Instant| now.saturating_duration_since(*ts) < window;
        self.real.retain(|_, ts| fresh(ts));
        self.synthetic.retain(|_, ts| fresh(ts));
    }

    /// Decide whether `signal` should be delivered.
    ///
    /// Returns `false` when the opposite origin already emitted for the same
    /// session inside the window; that entry is consumed so a third signal
    /// starts a new pairing. Otherwise the signal is recorded and `true` is
    /// returned. Call [`prune`](Self::prune) with the same `now` first.
    pub fn admit(&mut self, signal: &IdleSignal, now: Instant) -> bool {
        let (own, other) = match signal.origin {
            IdleOrigin::Real => (&mut self.real, &mut self.synthetic),
            IdleOrigin::Synthetic => (&mut self.synthetic, &mut self.real),
        };

        let counterpart_recent = other
            .get(&signal.session_id)
            .is_some_and(|emitted_at| now.saturating_duration_since(*emitted_at) < self.window);
        if counterpart_recent {
            other.remove(&signal.session_id);
            debug!(
                "Suppressed {} idle for {}: counterpart already delivered",
                signal.origin, signal.session_id
            );
            return false;
        }

        own.insert(signal.session_id.clone(), now);
        true
    }

    /// Number of live entries across both maps.
    pub fn len(&self) -> usize {
        self.real.len() + self.synthetic.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
