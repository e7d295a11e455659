//! Configuration types

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Idle notification engine settings
    #[serde(default)]
    pub notification: NotificationConfig,
    /// Incomplete-work lookup
    #[serde(default)]
    pub todos: TodosConfig,
    /// Host event source
    #[serde(default)]
    pub events: EventsConfig,
}

/// Idle notification engine configuration: `[notification]`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Debounce delay before a notification fires
    #[serde(default = "default_idle_confirmation_delay_ms")]
    pub idle_confirmation_delay_ms: u64,
    /// Ask the incomplete-work oracle before notifying
    #[serde(default = "default_true")]
    pub skip_if_incomplete_todos: bool,
    /// Eviction threshold for per-session tracking
    #[serde(default = "default_max_tracked_sessions")]
    pub max_tracked_sessions: usize,
    /// Cross-source idle suppression window
    #[serde(default = "default_dedup_window_ms")]
    pub dedup_window_ms: u64,
    /// Notification title
    #[serde(default = "default_title")]
    pub title: String,
    /// Notification body
    #[serde(default = "default_message")]
    pub message: String,
    /// Play a sound alongside the notification
    #[serde(default)]
    pub play_sound: bool,
    /// Sound file; the platform default is used when unset
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sound_path: Option<PathBuf>,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            idle_confirmation_delay_ms: default_idle_confirmation_delay_ms(),
            skip_if_incomplete_todos: true,
            max_tracked_sessions: default_max_tracked_sessions(),
            dedup_window_ms: default_dedup_window_ms(),
            title: default_title(),
            message: default_message(),
            play_sound: false,
            sound_path: None,
        }
    }
}

impl NotificationConfig {
    pub fn idle_confirmation_delay(&self) -> Duration {
        Duration::from_millis(self.idle_confirmation_delay_ms)
    }

    pub fn dedup_window(&self) -> Duration {
        Duration::from_millis(self.dedup_window_ms)
    }

    /// Configured sound path, or the platform default.
    pub fn resolved_sound_path(&self) -> PathBuf {
        self.sound_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(default_sound_path()))
    }
}

/// Incomplete-work lookup configuration: `[todos]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TodosConfig {
    /// Directory holding `<session_id>.json` todo lists.
    /// Defaults to `<data_dir>/todos` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

/// Host event source configuration: `[events]`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventsConfig {
    /// Append-only JSONL file the host writes events to.
    /// Defaults to `<data_dir>/events.jsonl` when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

/// Platform default notification sound.
pub fn default_sound_path() -> &'static str {
    if cfg!(target_os = "macos") {
        "/System/Library/Sounds/Glass.aiff"
    } else if cfg!(windows) {
        "C:\\Windows\\Media\\notify.wav"
    } else {
        "/usr/share/sounds/freedesktop/stereo/complete.oga"
    }
}

fn default_idle_confirmation_delay_ms() -> u64 {
    1500
}

fn default_max_tracked_sessions() -> usize {
    100
}

fn default_dedup_window_ms() -> u64 {
    500
}

fn default_title() -> String {
    "Session idle".to_string()
}

fn default_message() -> String {
    "Agent is ready for input".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = Config::default();
        let n = &config.notification;
        assert_eq!(n.idle_confirmation_delay_ms, 1500);
        assert!(n.skip_if_incomplete_todos);
        assert_eq!(n.max_tracked_sessions, 100);
        assert_eq!(n.dedup_window_ms, 500);
        assert!(!n.play_sound);
        assert_eq!(n.idle_confirmation_delay(), Duration::from_millis(1500));
        assert_eq!(n.dedup_window(), Duration::from_millis(500));
        assert!(config.todos.dir.is_none());
        assert!(config.events.path.is_none());
    }

    #[test]
    fn test_partial_section_fills_defaults() {
        let toml_str = r#"
[notification]
idle_confirmation_delay_ms = 10
play_sound = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.notification.idle_confirmation_delay_ms, 10);
        assert!(config.notification.play_sound);
        assert_eq!(config.notification.dedup_window_ms, 500);
        assert_eq!(config.notification.title, "Session idle");
    }

    #[test]
    fn test_config_serialization() {
        let mut config = Config::default();
        config.notification.sound_path = Some(PathBuf::from("/tmp/ding.wav"));
        config.todos.dir = Some(PathBuf::from("/tmp/todos"));
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_sound_path_falls_back_to_platform_default() {
        let n = NotificationConfig::default();
        assert_eq!(n.resolved_sound_path(), PathBuf::from(default_sound_path()));

        let n = NotificationConfig {
            sound_path: Some(PathBuf::from("/tmp/ding.wav")),
            ..Default::default()
        };
        assert_eq!(n.resolved_sound_path(), PathBuf::from("/tmp/ding.wav"));
    }
}
