// ABOUTME: Sync state manager, the sole writer of the persisted watermark and credential file
// ABOUTME: Every write replaces the whole YAML document through write-to-temp-then-rename
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! # Sync State
//!
//! The state file holds the watermarks of both sync kinds and the credentials
//! of every provider in one YAML document:
//!
//! ```yaml
//! watermarks:
//!   last_activity_sync_ts: 2024-03-01T06:30:00Z
//!   last_measurement_sync_ts: 2024-03-02T07:12:45Z
//! credentials:
//!   strava:
//!     access_token: ...
//!     refresh_token: ...
//! ```
//!
//! Writes are serialized through [`StateManager`]. [`StateManager::update`]
//! applies a change to the latest committed document, so one sync kind
//! committing its watermark never overwrites a watermark or token written by
//! the other kind in the meantime.

use crate::errors::{SyncError, SyncResult};
use crate::models::{Credentials, Watermarks};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Everything persisted between runs
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncState {
    /// Per-kind watermarks
    pub watermarks: Watermarks,
    /// Credentials keyed by provider name
    pub credentials: BTreeMap<String, Credentials>,
}

/// Owner of the state file
#[derive(Debug)]
pub struct StateManager {
    path: PathBuf,
    current: Mutex<SyncState>,
}

impl StateManager {
    /// Open the state file, starting from an empty state if it does not exist
    ///
    /// # Errors
    ///
    /// Returns `SyncError::State` if the file exists but cannot be read or parsed
    pub fn open(path: impl Into<PathBuf>) -> SyncResult<Self> {
        let path = path.into();
        let state = read_state(&path)?;
        info!(
            path = %path.display(),
            providers = state.credentials.len(),
            last_activity_sync_ts = %state.watermarks.last_activity_sync_ts,
            last_measurement_sync_ts = %state.watermarks.last_measurement_sync_ts,
            "Loaded sync state"
        );
        Ok(Self {
            path,
            current: Mutex::new(state),
        })
    }

    /// Location of the state file
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the last committed state
    ///
    /// # Errors
    ///
    /// Returns `SyncError::State` if a previous writer panicked mid-commit
    pub fn load(&self) -> SyncResult<SyncState> {
        Ok(self.lock()?.clone())
    }

    /// Replace the persisted state with `state` in one atomic write
    ///
    /// Committing identical content twice leaves the same file behind.
    ///
    /// # Errors
    ///
    /// Returns `SyncError::State` if the file cannot be written
    pub fn commit(&self, state: SyncState) -> SyncResult<()> {
        let mut current = self.lock()?;
        write_state(&self.path, &state)?;
        *current = state;
        Ok(())
    }

    /// Apply `change` to the latest committed state and commit the result
    ///
    /// # Errors
    ///
    /// Returns `SyncError::State` if the file cannot be written; the in-memory
    /// state is left untouched in that case
    pub fn update<F>(&self, change: F) -> SyncResult<SyncState>
    where
        F: FnOnce(&mut SyncState),
    {
        let mut current = self.lock()?;
        let mut next = current.clone();
        change(&mut next);
        if next == *current {
            debug!("State unchanged, skipping write");
            return Ok(next);
        }
        write_state(&self.path, &next)?;
        *current = next.clone();
        Ok(next)
    }

    fn lock(&self) -> SyncResult<MutexGuard<'_, SyncState>> {
        self.current
            .lock()
            .map_err(|_| SyncError::state("state lock poisoned"))
    }
}

fn read_state(path: &Path) -> SyncResult<SyncState> {
    match fs::read_to_string(path) {
        Ok(contents) if contents.trim().is_empty() => Ok(SyncState::default()),
        Ok(contents) => serde_yaml::from_str(&contents)
            .map_err(|e| SyncError::state(format!("failed to parse {}: {e}", path.display()))),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            info!(path = %path.display(), "No state file yet, starting from epoch watermarks");
            Ok(SyncState::default())
        }
        Err(e) => Err(SyncError::state(format!(
            "failed to read {}: {e}",
            path.display()
        ))),
    }
}

fn write_state(path: &Path, state: &SyncState) -> SyncResult<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    fs::create_dir_all(dir)
        .map_err(|e| SyncError::state(format!("failed to create {}: {e}", dir.display())))?;

    let yaml = serde_yaml::to_string(state)
        .map_err(|e| SyncError::state(format!("failed to serialize state: {e}")))?;

    let mut tmp = NamedTempFile::new_in(dir)
        .map_err(|e| SyncError::state(format!("failed to create temp file: {e}")))?;
    tmp.write_all(yaml.as_bytes())
        .and_then(|()| tmp.as_file().sync_all())
        .map_err(|e| SyncError::state(format!("failed to write temp file: {e}")))?;
    tmp.persist(path).map_err(|e| {
        SyncError::state(format!("failed to replace {}: {}", path.display(), e.error))
    })?;

    debug!(path = %path.display(), bytes = yaml.len(), "Committed sync state");
    Ok(())
}
