//! Configuration discovery and resolution

use super::types::Config;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

const REPO_CONFIG_NAME: &str = ".session-idle.toml";
const GLOBAL_CONFIG_PATH: &str = ".config/session-idle/config.toml";

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O error
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    TomlParse(#[from] toml::de::Error),

    /// A value parsed but is not usable
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Command-line overrides for configuration
#[derive(Debug, Default, Clone)]
pub struct ConfigOverrides {
    /// Explicit config file; must exist when given
    pub config_path: Option<PathBuf>,
    /// Override the host event file
    pub events_path: Option<PathBuf>,
    /// Override the debounce delay
    pub idle_confirmation_delay_ms: Option<u64>,
    /// Override the dedup window
    pub dedup_window_ms: Option<u64>,
    /// Override the incomplete-work check
    pub skip_if_incomplete_todos: Option<bool>,
}

/// Resolve configuration from all sources
///
/// Priority (highest to lowest):
/// 1. Command-line overrides (including an explicit `--config` file)
/// 2. Environment variables
/// 3. Repo-local config (`.session-idle.toml` in current dir or up to git root)
/// 4. Global config (`~/.config/session-idle/config.toml`)
/// 5. Defaults
///
/// File layers are merged key by key, so a repo-local file that only sets
/// `dedup_window_ms` keeps every other value from the global file.
pub fn resolve_config(
    overrides: &ConfigOverrides,
    current_dir: &Path,
    home_dir: &Path,
) -> Result<Config, ConfigError> {
    let mut merged = toml::Table::new();

    // 4. Global config
    let global_config_path = home_dir.join(GLOBAL_CONFIG_PATH);
    if global_config_path.exists() {
        match load_table(&global_config_path) {
            Ok(table) => merge_tables(&mut merged, table),
            Err(e) => warn!("Failed to parse global config at {global_config_path:?}: {e}"),
        }
    }

    // 3. Repo-local config
    if let Some(repo_config) = find_repo_local_config(current_dir) {
        match load_table(&repo_config) {
            Ok(table) => merge_tables(&mut merged, table),
            Err(e) => warn!("Failed to parse repo config at {repo_config:?}: {e}"),
        }
    }

    // 1a. Explicit config file is a hard error when unreadable
    if let Some(ref path) = overrides.config_path {
        merge_tables(&mut merged, load_table(path)?);
    }

    let mut config: Config = toml::Value::Table(merged).try_into()?;

    // 2. Environment variables
    apply_env_overrides(&mut config);

    // 1b. Command-line flags
    apply_cli_overrides(&mut config, overrides);

    validate(&config)?;
    Ok(config)
}

/// Reject values the engine cannot run with.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    if config.notification.max_tracked_sessions == 0 {
        return Err(ConfigError::Invalid(
            "notification.max_tracked_sessions must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Find repo-local config file
///
/// Searches current directory and parent directories up to git root
fn find_repo_local_config(current_dir: &Path) -> Option<PathBuf> {
    let mut dir = current_dir;

    loop {
        let config_path = dir.join(REPO_CONFIG_NAME);
        if config_path.exists() {
            return Some(config_path);
        }

        if dir.join(".git").exists() {
            break;
        }

        dir = dir.parent()?;
    }

    None
}

fn load_table(path: &Path) -> Result<toml::Table, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let table: toml::Table = toml::from_str(&contents)?;
    debug!("Loaded config layer from {}", path.display());
    Ok(table)
}

/// Overlay `overlay` onto `base`; nested tables merge, everything else replaces.
fn merge_tables(base: &mut toml::Table, overlay: toml::Table) {
    for (key, value) in overlay {
        match (base.get_mut(&key), value) {
            (Some(toml::Value::Table(existing)), toml::Value::Table(incoming)) => {
                merge_tables(existing, incoming);
            }
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

fn env_parse<T: std::str::FromStr>(name: &str) -> Option<T> {
    let raw = std::env::var(name).ok()?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!("Ignoring unparseable {name}='{raw}'");
            None
        }
    }
}

/// Apply environment variable overrides
fn apply_env_overrides(config: &mut Config) {
    if let Some(ms) = env_parse::<u64>("SESSION_IDLE_DELAY_MS") {
        config.notification.idle_confirmation_delay_ms = ms;
    }

    if let Some(ms) = env_parse::<u64>("SESSION_IDLE_DEDUP_WINDOW_MS") {
        config.notification.dedup_window_ms = ms;
    }

    if let Some(max) = env_parse::<usize>("SESSION_IDLE_MAX_SESSIONS") {
        config.notification.max_tracked_sessions = max;
    }

    if let Some(skip) = env_parse::<bool>("SESSION_IDLE_SKIP_INCOMPLETE") {
        config.notification.skip_if_incomplete_todos = skip;
    }

    if let Ok(path) = std::env::var("SESSION_IDLE_EVENTS")
        && !path.trim().is_empty()
    {
        config.events.path = Some(PathBuf::from(path.trim()));
    }
}

/// Apply command-line overrides
fn apply_cli_overrides(config: &mut Config, overrides: &ConfigOverrides) {
    if let Some(ref path) = overrides.events_path {
        config.events.path = Some(path.clone());
    }

    if let Some(ms) = overrides.idle_confirmation_delay_ms {
        config.notification.idle_confirmation_delay_ms = ms;
    }

    if let Some(ms) = overrides.dedup_window_ms {
        config.notification.dedup_window_ms = ms;
    }

    if let Some(skip) = overrides.skip_if_incomplete_todos {
        config.notification.skip_if_incomplete_todos = skip;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    const ENV_VARS: &[&str] = &[
        "SESSION_IDLE_DELAY_MS",
        "SESSION_IDLE_DEDUP_WINDOW_MS",
        "SESSION_IDLE_MAX_SESSIONS",
        "SESSION_IDLE_SKIP_INCOMPLETE",
        "SESSION_IDLE_EVENTS",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            unsafe { std::env::remove_var(var) };
        }
    }

    fn write_global(home: &Path, body: &str) {
        let path = home.join(GLOBAL_CONFIG_PATH);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    #[serial]
    fn test_defaults_when_no_files() {
        clear_env();
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        std::fs::create_dir(repo.path().join(".git")).unwrap();

        let config = resolve_config(&ConfigOverrides::default(), repo.path(), home.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    #[serial]
    fn test_repo_local_merges_over_global() {
        clear_env();
        let home = TempDir::new().unwrap();
        write_global(
            home.path(),
            "[notification]\ndedup_window_ms = 900\ntitle = \"Global\"\n",
        );

        let repo = TempDir::new().unwrap();
        std::fs::create_dir(repo.path().join(".git")).unwrap();
        let nested = repo.path().join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(
            repo.path().join(REPO_CONFIG_NAME),
            "[notification]\ntitle = \"Repo\"\n",
        )
        .unwrap();

        let config = resolve_config(&ConfigOverrides::default(), &nested, home.path()).unwrap();
        assert_eq!(config.notification.title, "Repo");
        assert_eq!(config.notification.dedup_window_ms, 900);
    }

    #[test]
    #[serial]
    fn test_env_then_cli_priority() {
        clear_env();
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        std::fs::create_dir(repo.path().join(".git")).unwrap();

        unsafe {
            std::env::set_var("SESSION_IDLE_DELAY_MS", "250");
            std::env::set_var("SESSION_IDLE_DEDUP_WINDOW_MS", "42");
            std::env::set_var("SESSION_IDLE_SKIP_INCOMPLETE", "false");
        }
        let overrides = ConfigOverrides {
            idle_confirmation_delay_ms: Some(10),
            ..Default::default()
        };
        let config = resolve_config(&overrides, repo.path(), home.path()).unwrap();
        clear_env();

        assert_eq!(config.notification.idle_confirmation_delay_ms, 10);
        assert_eq!(config.notification.dedup_window_ms, 42);
        assert!(!config.notification.skip_if_incomplete_todos);
    }

    #[test]
    #[serial]
    fn test_unparseable_env_is_ignored() {
        clear_env();
        let home = TempDir::new().unwrap();
        let repo = TempDir::new().unwrap();
        std::fs::create_dir(repo.path().join(".git")).unwrap();

        unsafe { std::env::set_var("SESSION_IDLE_MAX_SESSIONS", "lots") };
        let config = resolve_config(&ConfigOverrides::default(), repo.path(), home.path()).unwrap();
        clear_env();

        assert_eq!(config.notification.max_tracked_sessions, 100);
    }

    #[test]
    #[serial]
    fn test_missing_explicit_config_is_an_error() {
        clear_env();
        let home = TempDir::new().unwrap();
        let overrides = ConfigOverrides {
            config_path: Some(home.path().join("nope.toml")),
            ..Default::default()
        };
        let err = resolve_config(&overrides, home.path(), home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }

    #[test]
    #[serial]
    fn test_zero_max_sessions_rejected() {
        clear_env();
        let home = TempDir::new().unwrap();
        let path = home.path().join("explicit.toml");
        std::fs::write(&path, "[notification]\nmax_tracked_sessions = 0\n").unwrap();
        let overrides = ConfigOverrides {
            config_path: Some(path),
            ..Default::default()
        };
        let err = resolve_config(&overrides, home.path(), home.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    #[serial]
    fn test_broken_global_is_skipped() {
        clear_env();
        let home = TempDir::new().unwrap();
        write_global(home.path(), "this is = = not toml");
        let repo = TempDir::new().unwrap();
        std::fs::create_dir(repo.path().join(".git")).unwrap();

        let config = resolve_config(&ConfigOverrides::default(), repo.path(), home.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_merge_tables_is_deep() {
        let mut base: toml::Table = toml::from_str("[a]\nx = 1\ny = 2\n").unwrap();
        let overlay: toml::Table = toml::from_str("[a]\ny = 3\n[b]\nz = 4\n").unwrap();
        merge_tables(&mut base, overlay);
        assert_eq!(base["a"]["x"].as_integer(), Some(1));
        assert_eq!(base["a"]["y"].as_integer(), Some(3));
        assert_eq!(base["b"]["z"].as_integer(), Some(4));
    }
}
