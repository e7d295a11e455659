//! Core types for session-idle
//!
//! This crate holds what every session-idle component shares: the host
//! lifecycle event schema, layered configuration, home-directory resolution
//! and logging setup. The idle engine itself lives in `session-idle-daemon`.

pub mod config;
pub mod event;
pub mod home;
pub mod logging;

pub use config::{Config, NotificationConfig};
pub use event::{EventError, EventKind, HostEvent};
