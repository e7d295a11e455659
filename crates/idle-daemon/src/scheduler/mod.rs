//! Idle notification scheduling.

pub mod idle;
pub mod registry;

pub use idle::{FireOutcome, IdleScheduler, SchedulerConfig};
pub use registry::SessionSnapshot;
