//! Configuration resolution
//!
//! Resolves configuration from multiple sources with priority:
//! 1. Command-line flags (passed as parameters)
//! 2. Environment variables
//! 3. Repo-local config (.session-idle.toml)
//! 4. Global config (~/.config/session-idle/config.toml)
//! 5. Defaults

mod discovery;
mod types;

pub use discovery::{ConfigError, ConfigOverrides, resolve_config, validate};
pub use types::{
    Config, EventsConfig, NotificationConfig, TodosConfig, default_sound_path,
};
