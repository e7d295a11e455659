//! Host event sources.
//!
//! [`EventWatcher`] tails an append-only JSONL file that the host writes one
//! lifecycle event per line into. On each file change only the bytes after the
//! last-known offset are read. [`read_stdin`] consumes the same format from
//! standard input.
//!
//! Decoded events are sent over an `mpsc` channel to the event loop. Lines that
//! fail to decode are skipped with a warning.
//!
//! ## Truncation
//!
//! If the stored offset exceeds the current file size the file was rotated or
//! reset; the offset goes back to 0 and the file is re-read from the start.
//!
//! ## Partial lines
//!
//! A trailing line without `\n` is left unread until the writer finishes it.

use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use session_idle_core::HostEvent;
use std::fs::File;
use std::io::{BufRead, BufReader, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Watches a JSONL event file and forwards new events.
pub struct EventWatcher {
    path: PathBuf,
    from_start: bool,
}

impl EventWatcher {
    /// Watch `path`, skipping whatever it already contains.
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            from_start: false,
        }
    }

    /// Replay events already in the file before tailing it.
    pub fn from_start(mut self, from_start: bool) -> Self {
        self.from_start = from_start;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run until `cancel` fires or the receiver is dropped.
    pub async fn run(self, tx: mpsc::Sender<HostEvent>, cancel: CancellationToken) {
        let (fs_tx, mut fs_rx) = mpsc::unbounded_channel::<notify::Event>();

        let watcher_result = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => {
                    let _ = fs_tx.send(event);
                }
                Err(e) => warn!("Event file watcher error: {e}"),
            }
        });

        let mut watcher: RecommendedWatcher = match watcher_result {
            Ok(w) => w,
            Err(e) => {
                warn!("Failed to create file watcher for host events: {e}");
                return;
            }
        };

        // The file itself may not exist yet.
        let watch_dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        if let Err(e) = watcher.watch(watch_dir, RecursiveMode::NonRecursive) {
            warn!("Failed to watch {}: {e}", watch_dir.display());
            return;
        }

        let mut offset = if self.from_start {
            0
        } else {
            file_len(&self.path)
        };
        info!(
            "Watching {} for host events (starting at byte {offset})",
            self.path.display()
        );

        if !self.forward_new(&mut offset, &tx).await {
            return;
        }

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!("Event watcher shutting down");
                    break;
                }
                Some(event) = fs_rx.recv() => {
                    if should_process_event(&event, &self.path)
                        && !self.forward_new(&mut offset, &tx).await
                    {
                        break;
                    }
                }
            }
        }
    }

    /// Returns `false` once the receiver is gone.
    async fn forward_new(&self, offset: &mut u64, tx: &mpsc::Sender<HostEvent>) -> bool {
        let (next, events) = read_new_events(&self.path, *offset);
        *offset = next;
        for event in events {
            if tx.send(event).await.is_err() {
                debug!("Event channel closed; stopping watcher");
                return false;
            }
        }
        true
    }
}

/// Read newline-delimited events from standard input until EOF or `cancel`.
pub async fn read_stdin(tx: mpsc::Sender<HostEvent>, cancel: CancellationToken) {
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    loop {
        let line = tokio::select! {
            _ = cancel.cancelled() => break,
            line = lines.next_line() => line,
        };
        match line {
            Ok(Some(line)) => {
                if let Some(event) = parse_line(&line)
                    && tx.send(event).await.is_err()
                {
                    break;
                }
            }
            Ok(None) => {
                info!("Standard input closed");
                break;
            }
            Err(e) => {
                warn!("Failed to read standard input: {e}");
                break;
            }
        }
    }
}

fn file_len(path: &Path) -> u64 {
    std::fs::metadata(path).map(|m| m.len()).unwrap_or(0)
}

/// Returns `true` if this notify event is for our target file.
fn should_process_event(event: &notify::Event, target: &Path) -> bool {
    let is_data_event = matches!(
        event.kind,
        EventKind::Create(_)
            | EventKind::Modify(notify::event::ModifyKind::Data(_))
            | EventKind::Modify(notify::event::ModifyKind::Any)
            | EventKind::Modify(notify::event::ModifyKind::Other)
    );
    if !is_data_event {
        return false;
    }

    if event.paths.is_empty() {
        return true;
    }

    // Compare file names too: macOS reports /private/var for /var.
    let target_name = target.file_name();
    event
        .paths
        .iter()
        .any(|p| p == target || (p.file_name().is_some() && p.file_name() == target_name))
}

/// Read complete lines from `path` after `offset`.
///
/// Returns the new offset and the events decoded from those lines.
pub fn read_new_events(path: &Path, offset: u64) -> (u64, Vec<HostEvent>) {
    let Ok(file) = File::open(path) else {
        return (offset, Vec::new());
    };
    let Ok(file_size) = file.metadata().map(|m| m.len()) else {
        return (offset, Vec::new());
    };

    let start = if offset > file_size {
        debug!(
            "{} truncated (offset {offset} > size {file_size}), resetting to 0",
            path.display()
        );
        0
    } else {
        offset
    };

    let mut reader = BufReader::new(file);
    if reader.seek(SeekFrom::Start(start)).is_err() {
        return (offset, Vec::new());
    }

    let mut next = start;
    let mut events = Vec::new();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf) {
            Ok(0) => break,
            Ok(n) => {
                if buf.last() != Some(&b'\n') {
                    break;
                }
                next += n as u64;
                match std::str::from_utf8(&buf) {
                    Ok(line) => events.extend(parse_line(line)),
                    Err(e) => warn!("Skipping non-UTF-8 line in {}: {e}", path.display()),
                }
            }
            Err(e) => {
                warn!("Error reading {}: {e}", path.display());
                break;
            }
        }
    }
    (next, events)
}

fn parse_line(line: &str) -> Option<HostEvent> {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return None;
    }
    match HostEvent::from_json_line(trimmed) {
        Ok(event) => Some(event),
        Err(e) => {
            warn!("Skipping malformed host event: {e}");
            None
        }
    }
}
