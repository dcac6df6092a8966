// ABOUTME: Canonical activity record fetched from the fitness tracker
// ABOUTME: Immutable once fetched; owns its binary payload until delivered
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use super::TimestampedRecord;
use chrono::{DateTime, Utc};
use std::fmt;

/// Activity recorded on the tracker, ready to be pushed to destinations
///
/// Fields are private so an activity cannot change after the fetcher builds
/// it; destinations only ever borrow it.
#[derive(Clone, PartialEq, Eq)]
pub struct Activity {
    provider_id: String,
    start_time: DateTime<Utc>,
    name: String,
    type_key: String,
    payload: Vec<u8>,
}

impl Activity {
    /// Assemble an activity from its summary and downloaded payload
    #[must_use]
    pub const fn new(
        provider_id: String,
        start_time: DateTime<Utc>,
        name: String,
        type_key: String,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            provider_id,
            start_time,
            name,
            type_key,
            payload,
        }
    }

    /// Identifier of the activity in the source provider
    #[must_use]
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Start instant
    #[must_use]
    pub const fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    /// Display name
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Categorical type tag (e.g. `running`, `road_biking`)
    #[must_use]
    pub fn type_key(&self) -> &str {
        &self.type_key
    }

    /// Opaque activity file (FIT)
    #[must_use]
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

impl TimestampedRecord for Activity {
    fn timestamp(&self) -> DateTime<Utc> {
        self.start_time
    }
}

impl fmt::Debug for Activity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Activity")
            .field("provider_id", &self.provider_id)
            .field("start_time", &self.start_time)
            .field("name", &self.name)
            .field("type_key", &self.type_key)
            .field("payload_bytes", &self.payload.len())
            .finish()
    }
}
