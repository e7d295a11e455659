//! session-idle - desktop notifications when an agent session goes idle

use anyhow::{Context, Result};
use clap::Parser;
use session_idle_core::config::{ConfigOverrides, resolve_config};
use session_idle_core::home::{data_dir, expand_tilde, get_home_dir};
use session_idle_daemon::alert::{DesktopNotifier, TodoFileOracle};
use session_idle_daemon::daemon::{self, EventDispatcher, EventSource, EventWatcher};
use session_idle_daemon::hooks::SessionNotificationHook;
use session_idle_daemon::scheduler::{IdleScheduler, SchedulerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Watch host session events and notify once per idle episode
#[derive(Parser, Debug)]
#[command(name = "session-idle")]
#[command(about = "Watch host session events and notify once per idle episode")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// JSONL file the host appends events to
    #[arg(long, value_name = "PATH", conflicts_with = "stdin")]
    events: Option<PathBuf>,

    /// Read events from standard input instead of a file
    #[arg(long)]
    stdin: bool,

    /// Replay events already present in the events file
    #[arg(long, conflicts_with = "stdin")]
    from_start: bool,

    /// Debounce delay before a notification fires
    #[arg(long, value_name = "N")]
    delay_ms: Option<u64>,

    /// Window in which a second idle signal for a session is dropped
    #[arg(long, value_name = "N")]
    dedup_window_ms: Option<u64>,

    /// Notify even when the session still has open todos
    #[arg(long)]
    no_todo_check: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    session_idle_core::logging::init_with_level(args.verbose.then_some(tracing::Level::DEBUG));

    info!("session-idle {} starting", env!("CARGO_PKG_VERSION"));

    let home_dir = get_home_dir().context("Failed to determine home directory")?;
    let current_dir = std::env::current_dir().context("Failed to get current directory")?;

    let overrides = ConfigOverrides {
        config_path: args.config.clone(),
        events_path: args.events.clone(),
        idle_confirmation_delay_ms: args.delay_ms,
        dedup_window_ms: args.dedup_window_ms,
        skip_if_incomplete_todos: args.no_todo_check.then_some(false),
    };
    let config = resolve_config(&overrides, &current_dir, &home_dir)
        .context("Failed to resolve configuration")?;

    let data = data_dir(&home_dir);
    let todos_dir = config
        .todos
        .dir
        .as_deref()
        .map(|p| expand_tilde(p, &home_dir))
        .unwrap_or_else(|| data.join("todos"));
    let events_path = config
        .events
        .path
        .as_deref()
        .map(|p| expand_tilde(p, &home_dir))
        .unwrap_or_else(|| data.join("events.jsonl"));

    let scheduler_config = SchedulerConfig::from(&config.notification);
    if scheduler_config.play_sound && !scheduler_config.sound_path.exists() {
        warn!(
            "Sound file {} not found; notifications will be silent",
            scheduler_config.sound_path.display()
        );
    }
    info!(
        "Idle delay {:?}, dedup window {:?}, todo check {}",
        scheduler_config.idle_confirmation_delay,
        config.notification.dedup_window(),
        if scheduler_config.skip_if_incomplete_todos {
            format!("on ({})", todos_dir.display())
        } else {
            "off".to_string()
        }
    );

    let scheduler = IdleScheduler::new(
        scheduler_config,
        Arc::new(DesktopNotifier::new()),
        Arc::new(TodoFileOracle::new(todos_dir)),
    );

    let mut dispatcher = EventDispatcher::new(config.notification.dedup_window());
    dispatcher.register(Arc::new(SessionNotificationHook::new(Arc::clone(&scheduler))));

    let source = if args.stdin {
        EventSource::Stdin
    } else {
        EventSource::File(EventWatcher::new(events_path).from_start(args.from_start))
    };

    let cancel_token = CancellationToken::new();
    spawn_signal_handler(cancel_token.clone())?;

    daemon::run(dispatcher, source, scheduler, cancel_token)
        .await
        .context("Event loop failed")?;

    info!("session-idle shutdown complete");
    Ok(())
}

/// Cancel `cancel` on SIGINT, or SIGTERM on unix.
fn spawn_signal_handler(cancel: CancellationToken) -> Result<()> {
    #[cfg(unix)]
    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
        .context("Failed to create SIGTERM handler")?;

    tokio::spawn(async move {
        #[cfg(unix)]
        {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => info!("Received SIGINT (Ctrl+C)"),
                _ = sigterm.recv() => info!("Received SIGTERM"),
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for Ctrl+C: {e}");
                return;
            }
            info!("Received Ctrl+C");
        }

        cancel.cancel();
    });
    Ok(())
}
