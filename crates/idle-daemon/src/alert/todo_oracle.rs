//! File-backed incomplete-work oracle.
//!
//! The host mirrors each session's todo list to `<dir>/<session_id>.json`:
//!
//! ```json
//! [
//!   {"content":"write tests","status":"completed"},
//!   {"content":"fix lint","status":"in_progress"}
//! ]
//! ```
//!
//! A session has incomplete work when any item is neither `completed` nor
//! `cancelled`.

use super::{OracleError, WorkOracle};
use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Clone, Deserialize)]
pub struct TodoItem {
    #[serde(default)]
    pub content: String,
    pub status: String,
}

impl TodoItem {
    pub fn is_open(&self) -> bool {
        !matches!(self.status.as_str(), "completed" | "cancelled")
    }
}

/// [`WorkOracle`] reading per-session todo files from a directory.
#[derive(Debug, Clone)]
pub struct TodoFileOracle {
    dir: PathBuf,
}

impl TodoFileOracle {
    pub fn new(dir: PathBuf) -> Self {
        Self { dir }
    }

    fn path_for(&self, session_id: &str) -> Result<PathBuf, OracleError> {
        if session_id.is_empty()
            || session_id.contains(['/', '\\'])
            || session_id.starts_with('.')
        {
            return Err(OracleError::Other(format!(
                "refusing to resolve todo file for session id '{session_id}'"
            )));
        }
        Ok(self.dir.join(format!("{session_id}.json")))
    }
}

#[async_trait]
impl WorkOracle for TodoFileOracle {
    async fn has_incomplete_work(&self, session_id: &str) -> Result<bool, OracleError> {
        let path = self.path_for(session_id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No todo list for {session_id} at {}", path.display());
                return Ok(false);
            }
            Err(source) => return Err(OracleError::Io { path, source }),
        };

        let items: Vec<TodoItem> =
            serde_json::from_str(&content).map_err(|source| OracleError::Parse {
                path: path.clone(),
                source,
            })?;

        let open = items.iter().filter(|t| t.is_open()).count();
        debug!("Session {session_id}: {open}/{} todos open", items.len());
        Ok(open > 0)
    }
}
