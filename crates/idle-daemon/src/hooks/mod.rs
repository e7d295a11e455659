//! Downstream consumers of the normalized host event stream.
//!
//! The dispatcher hands every forwarded event to each registered
//! [`HookConsumer`] in registration order. A consumer error is logged by the
//! dispatcher and never stops delivery to the remaining consumers.

pub mod session_notification;

pub use session_notification::SessionNotificationHook;

use async_trait::async_trait;
use session_idle_core::HostEvent;
use thiserror::Error;

/// Failure inside a hook consumer.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook runtime error: {message}")]
    Runtime {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("hook rejected event: {message}")]
    InvalidEvent { message: String },
}

impl HookError {
    pub fn runtime(message: impl Into<String>) -> Self {
        HookError::Runtime {
            message: message.into(),
            source: None,
        }
    }
}

/// A sink for host events after idle deduplication.
#[async_trait]
pub trait HookConsumer: Send + Sync {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    async fn on_event(&self, event: &HostEvent) -> Result<(), HookError>;
}
