// SPDX-FileCopyrightText: 2026 Tokentally Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! JSON snapshot of every session rollup.
//!
//! The whole map is rewritten after each tracked call. Writes land in a
//! sibling temp file that is renamed over the snapshot, so a crash mid-write
//! leaves the previous snapshot readable.

use std::path::{Path, PathBuf};

use tokentally_core::TokentallyError;
use tracing::{debug, error};

use crate::rollup::SessionMap;

/// File name of the snapshot inside the metrics directory.
pub const SNAPSHOT_FILE: &str = "session_costs.json";

/// Durable copy of the session rollups.
#[derive(Debug, Clone)]
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A store for `session_costs.json` under `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        Self::new(dir.as_ref().join(SNAPSHOT_FILE))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Read the snapshot. A missing file is an empty map, not an error.
    pub async fn load(&self) -> Result<SessionMap, TokentallyError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(SessionMap::new()),
            Err(e) => return Err(TokentallyError::persistence(&self.path, e)),
        };
        serde_json::from_slice(&bytes).map_err(|e| TokentallyError::persistence(&self.path, e))
    }

    /// Read the snapshot, logging and discarding any failure.
    pub async fn load_or_default(&self) -> SessionMap {
        match self.load().await {
            Ok(sessions) => {
                debug!(
                    path = %self.path.display(),
                    sessions = sessions.len(),
                    "session snapshot loaded"
                );
                sessions
            }
            Err(e) => {
                error!(
                    path = %self.path.display(),
                    error = %e,
                    "failed to load session snapshot, starting empty"
                );
                SessionMap::new()
            }
        }
    }

    /// Replace the snapshot with `sessions`.
    pub async fn save(&self, sessions: &SessionMap) -> Result<(), TokentallyError> {
        let json = serde_json::to_vec_pretty(sessions)
            .map_err(|e| TokentallyError::persistence(&self.path, e))?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, &json)
            .await
            .map_err(|e| TokentallyError::persistence(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| TokentallyError::persistence(&self.path, e))
    }
}
