pub mod dedup;
pub mod dispatcher;
pub mod event_loop;
pub mod normalize;
pub mod watcher;

pub use dedup::IdleDedupWindow;
pub use dispatcher::{DispatchOutcome, EventDispatcher};
pub use event_loop::{EventSource, run};
pub use normalize::{IdleOrigin, IdleSignal, normalize, real_idle};
pub use watcher::{EventWatcher, read_stdin};
