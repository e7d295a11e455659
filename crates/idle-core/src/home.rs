//! Home directory resolution
//!
//! # Precedence
//!
//! 1. `SESSION_IDLE_HOME` environment variable (if set and non-empty)
//! 2. `dirs::home_dir()` platform default
//!
//! Tests point `SESSION_IDLE_HOME` at a temp dir so config discovery never
//! touches the real user home.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Get the home directory used for config and data lookups.
///
/// # Errors
///
/// Returns an error if `SESSION_IDLE_HOME` is unset and the platform home
/// directory cannot be determined.
pub fn get_home_dir() -> Result<PathBuf> {
    if let Ok(home) = std::env::var("SESSION_IDLE_HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Ok(PathBuf::from(trimmed));
        }
    }

    dirs::home_dir().context("Could not determine home directory")
}

/// `~/.local/share/session-idle` under the given home.
pub fn data_dir(home: &Path) -> PathBuf {
    home.join(".local/share/session-idle")
}

/// Expand a leading `~/` against `home`. Other paths are returned unchanged.
pub fn expand_tilde(path: &Path, home: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => home.join(rest),
        Err(_) => path.to_path_buf(),
    }
}
