// ABOUTME: Canonical record model shared by fetchers, calculators and destinations
// ABOUTME: Measurement, HeightSample, Activity, Credentials, SyncKind and Watermarks
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

mod activity;
mod credentials;
mod measurement;
mod sync;

pub use activity::Activity;
pub use credentials::{Credentials, EXPIRY_SKEW_SECS};
pub use measurement::{HeightSample, Measurement};
pub use sync::{SyncKind, Watermarks};

use chrono::{DateTime, Utc};

/// Records that carry the instant used for watermark comparison
pub trait TimestampedRecord {
    /// Instant compared against the watermark
    fn timestamp(&self) -> DateTime<Utc>;
}

/// Keep records strictly newer than `since`, ordered oldest first
///
/// A record exactly at `since` was already delivered by the run that set the
/// watermark and is excluded.
#[must_use]
pub fn newer_than<R: TimestampedRecord>(records: Vec<R>, since: DateTime<Utc>) -> Vec<R> {
    let mut kept: Vec<R> = records
        .into_iter()
        .filter(|r| r.timestamp() > since)
        .collect();
    kept.sort_by_key(TimestampedRecord::timestamp);
    kept
}

/// Timestamp of the newest record, if any
#[must_use]
pub fn latest_timestamp<R: TimestampedRecord>(records: &[R]) -> Option<DateTime<Utc>> {
    records.iter().map(TimestampedRecord::timestamp).max()
}
