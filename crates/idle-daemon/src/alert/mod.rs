//! Side-effect and query collaborators of the idle scheduler.
//!
//! The scheduler only talks to two traits:
//!
//! - [`Notifier`] presents the notification and plays the sound. Both calls
//!   are best-effort; the scheduler logs failures and moves on.
//! - [`WorkOracle`] answers "does this session still have incomplete work".
//!   A failed lookup is treated as "no".

pub mod desktop;
pub mod mock;
pub mod todo_oracle;

pub use desktop::DesktopNotifier;
pub use mock::{NotifierCall, RecordingNotifier, StaticOracle};
pub use todo_oracle::TodoFileOracle;

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Failure presenting a notification or sound.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("failed to launch {program}: {source}")]
    Spawn {
        program: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    CommandFailed {
        program: &'static str,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("sound file not found: {0}")]
    MissingSound(PathBuf),

    #[error("no notification backend for this platform")]
    Unsupported,

    #[error("{0}")]
    Other(String),
}

/// Failure answering the incomplete-work query.
#[derive(Debug, Error)]
pub enum OracleError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed todo list {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0}")]
    Other(String),
}

/// Presents idle notifications to the user.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Show a notification with `title` and `message`.
    async fn send_notification(&self, title: &str, message: &str) -> Result<(), NotifyError>;

    /// Play the sound file at `path`.
    async fn play_sound(&self, path: &Path) -> Result<(), NotifyError>;
}

/// Answers whether a session still has incomplete work queued.
#[async_trait]
pub trait WorkOracle: Send + Sync {
    async fn has_incomplete_work(&self, session_id: &str) -> Result<bool, OracleError>;
}
