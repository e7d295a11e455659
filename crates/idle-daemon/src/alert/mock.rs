//! In-memory collaborators for tests and dry runs.
//!
//! [`RecordingNotifier`] records every notification and sound request, can be
//! told to fail, and can be slowed down so tests can land activity while a
//! notification is being delivered. [`StaticOracle`] answers the incomplete-work query with a
//! fixed result, optionally after a delay so tests can interleave activity
//! with an in-flight query.

use super::{Notifier, NotifyError, OracleError, WorkOracle};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Call record for [`RecordingNotifier`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifierCall {
    Notification { title: String, message: String },
    Sound { path: PathBuf },
}

#[derive(Debug, Default)]
struct RecorderState {
    calls: Vec<NotifierCall>,
    notification_error: Option<String>,
    sound_error: Option<String>,
}

/// [`Notifier`] that records calls instead of presenting anything.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    state: Arc<Mutex<RecorderState>>,
    delay: Duration,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record each call immediately, then sleep for `delay` (on the tokio
    /// clock) before returning.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RecorderState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(
        &self,
        call: NotifierCall,
        fail: impl Fn(&RecorderState) -> Option<String>,
    ) -> Option<String> {
        let mut state = self.lock();
        state.calls.push(call);
        fail(&state)
    }

    async fn finish(&self, error: Option<String>) -> Result<(), NotifyError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match error {
            Some(e) => Err(NotifyError::Other(e)),
            None => Ok(()),
        }
    }

    /// All recorded calls, oldest first.
    pub fn calls(&self) -> Vec<NotifierCall> {
        self.lock().calls.clone()
    }

    pub fn notification_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, NotifierCall::Notification { .. }))
            .count()
    }

    pub fn sound_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| matches!(c, NotifierCall::Sound { .. }))
            .count()
    }

    /// Make every following notification fail with `error` (the call is still recorded).
    pub fn set_notification_error(&self, error: Option<String>) {
        self.lock().notification_error = error;
    }

    /// Make every following sound request fail with `error` (the call is still recorded).
    pub fn set_sound_error(&self, error: Option<String>) {
        self.lock().sound_error = error;
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_notification(&self, title: &str, message: &str) -> Result<(), NotifyError> {
        let call = NotifierCall::Notification {
            title: title.to_string(),
            message: message.to_string(),
        };
        let error = self.record(call, |s| s.notification_error.clone());
        self.finish(error).await
    }

    async fn play_sound(&self, path: &Path) -> Result<(), NotifyError> {
        let call = NotifierCall::Sound {
            path: path.to_path_buf(),
        };
        let error = self.record(call, |s| s.sound_error.clone());
        self.finish(error).await
    }
}

#[derive(Debug, Clone)]
enum OracleAnswer {
    Value(bool),
    Fail(String),
}

/// [`WorkOracle`] with a fixed (but changeable) answer.
#[derive(Debug, Clone)]
pub struct StaticOracle {
    answer: Arc<Mutex<OracleAnswer>>,
    delay: Duration,
    queries: Arc<AtomicUsize>,
}

impl StaticOracle {
    /// Always answer `incomplete`.
    pub fn answering(incomplete: bool) -> Self {
        Self::with_answer(OracleAnswer::Value(incomplete))
    }

    /// Always fail with `message`.
    pub fn failing(message: &str) -> Self {
        Self::with_answer(OracleAnswer::Fail(message.to_string()))
    }

    fn with_answer(answer: OracleAnswer) -> Self {
        Self {
            answer: Arc::new(Mutex::new(answer)),
            delay: Duration::ZERO,
            queries: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Sleep for `delay` (on the tokio clock) before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_incomplete(&self, incomplete: bool) {
        *self.answer.lock().unwrap_or_else(|e| e.into_inner()) = OracleAnswer::Value(incomplete);
    }

    /// Number of queries answered so far.
    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkOracle for StaticOracle {
    async fn has_incomplete_work(&self, _session_id: &str) -> Result<bool, OracleError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let answer = self.answer.lock().unwrap_or_else(|e| e.into_inner()).clone();
        match answer {
            OracleAnswer::Value(v) => Ok(v),
            OracleAnswer::Fail(msg) => Err(OracleError::Other(msg)),
        }
    }
}
