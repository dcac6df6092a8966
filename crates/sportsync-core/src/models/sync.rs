// ABOUTME: Sync kinds and the per-kind watermarks persisted between runs
// ABOUTME: Watermarks only ever move forward
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The two independent synchronization flows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncKind {
    /// Tracker activities pushed to the social platform
    Activities,
    /// Scale measurements pushed to the tracker and the social platform
    Measurements,
}

impl SyncKind {
    /// Every sync kind, in the order a full run executes them
    pub const ALL: [Self; 2] = [Self::Activities, Self::Measurements];

    /// Stable lowercase name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Activities => "activities",
            Self::Measurements => "measurements",
        }
    }
}

impl fmt::Display for SyncKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-kind instant below which everything is considered synchronized
///
/// A fresh state starts both watermarks at the Unix epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Watermarks {
    /// Start time of the newest activity delivered everywhere
    pub last_activity_sync_ts: DateTime<Utc>,
    /// Timestamp of the newest measurement delivered everywhere
    pub last_measurement_sync_ts: DateTime<Utc>,
}

impl Watermarks {
    /// Watermark for a sync kind
    #[must_use]
    pub const fn get(&self, kind: SyncKind) -> DateTime<Utc> {
        match kind {
            SyncKind::Activities => self.last_activity_sync_ts,
            SyncKind::Measurements => self.last_measurement_sync_ts,
        }
    }

    /// Move the watermark for `kind` forward to `to`
    ///
    /// Returns `true` when the watermark changed. A value at or below the
    /// current watermark is ignored.
    pub fn advance(&mut self, kind: SyncKind, to: DateTime<Utc>) -> bool {
        let slot = match kind {
            SyncKind::Activities => &mut self.last_activity_sync_ts,
            SyncKind::Measurements => &mut self.last_measurement_sync_ts,
        };
        if to > *slot {
            *slot = to;
            true
        } else {
            false
        }
    }
}
