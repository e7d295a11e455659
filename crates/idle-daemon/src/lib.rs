//! Session idle notification engine.
//!
//! Host lifecycle events flow through the [`daemon::EventDispatcher`], which
//! collapses duplicate idle signals and fans events out to
//! [`hooks::HookConsumer`]s. The [`hooks::SessionNotificationHook`] drives the
//! [`scheduler::IdleScheduler`], which fires at most one notification per idle
//! episode through an [`alert::Notifier`].

pub mod alert;
pub mod daemon;
pub mod hooks;
pub mod scheduler;
