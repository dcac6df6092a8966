// ABOUTME: Provider traits for token refresh, record sources and destinations
// ABOUTME: Raw provider DTOs that the sync engine maps into canonical records
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! # Provider Contracts
//!
//! Every remote operation the engine needs is one method on one of these
//! traits. Providers are stateless with respect to tokens: the caller passes
//! the current access token on every call, and token refresh is a pure
//! function from old credentials to new credentials. Ownership of token
//! material stays with the credential store.
//!
//! | Trait                   | Withings | Garmin | Strava |
//! |-------------------------|----------|--------|--------|
//! | `TokenRefresher`        | yes      | yes    | yes    |
//! | `MeasurementSource`     | yes      |        |        |
//! | `ActivitySource`        |          | yes    |        |
//! | `FileUploader`          |          | yes    |        |
//! | `ActivityUploader`      |          |        | yes    |
//! | `ProfileWeightUpdater`  |          |        | yes    |

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sportsync_core::errors::ProviderResult;
use sportsync_core::models::{Activity, Credentials};

/// Endpoints for one provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Provider name (e.g., "withings", "garmin", "strava")
    pub name: String,
    /// OAuth authorization endpoint, used by the out-of-band consent flow
    pub auth_url: String,
    /// OAuth token endpoint
    pub token_url: String,
    /// Base URL for API calls
    pub api_base_url: String,
}

/// One raw reading inside a measure group
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawMeasure {
    /// Provider measure type code
    pub measure_type: i32,
    /// Integer mantissa
    pub value: i64,
    /// Power-of-ten exponent applied to `value`
    pub unit: i32,
}

/// Readings taken together at one instant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMeasureGroup {
    /// Provider group id
    pub group_id: i64,
    /// Instant of the readings
    pub timestamp: DateTime<Utc>,
    /// Provider category (1 = real measurement, 2 = user objective)
    pub category: i32,
    /// Readings in the group
    pub measures: Vec<RawMeasure>,
}

/// Activity listing entry from a tracker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivitySummary {
    /// Provider activity id
    pub id: String,
    /// Start instant
    pub start_time: DateTime<Utc>,
    /// Display name
    pub name: String,
    /// Activity type tag
    pub type_key: String,
}

/// Result of an accepted activity upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadReceipt {
    /// A new remote activity was created
    Created {
        /// Remote activity id
        remote_id: String,
    },
    /// The destination already holds this activity
    Duplicate {
        /// Destination message
        message: String,
    },
}

/// Exchanges a refresh token for new credentials
#[async_trait]
pub trait TokenRefresher: Send + Sync {
    /// Provider name
    fn name(&self) -> &'static str;

    /// Mint new credentials from `credentials.refresh_token`
    ///
    /// Returns `ProviderError::ReauthorizationRequired` when the refresh token
    /// itself is rejected.
    async fn refresh(&self, credentials: &Credentials) -> ProviderResult<Credentials>;
}

/// Source of body-composition measure groups
#[async_trait]
pub trait MeasurementSource: Send + Sync {
    /// Provider name
    fn name(&self) -> &'static str;

    /// List measure groups of the given types updated since `since`
    async fn measure_groups(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
        measure_types: &[i32],
    ) -> ProviderResult<Vec<RawMeasureGroup>>;
}

/// Source of recorded activities
#[async_trait]
pub trait ActivitySource: Send + Sync {
    /// Provider name
    fn name(&self) -> &'static str;

    /// List activities that started at or after `since`
    async fn list_activities(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
    ) -> ProviderResult<Vec<ActivitySummary>>;

    /// Download the activity file for `activity_id`
    async fn download_activity(&self, access_token: &str, activity_id: &str)
        -> ProviderResult<Vec<u8>>;
}

/// Destination that accepts activity files
#[async_trait]
pub trait ActivityUploader: Send + Sync {
    /// Provider name
    fn name(&self) -> &'static str;

    /// Upload one activity and wait until the destination has processed it
    async fn upload_activity(
        &self,
        access_token: &str,
        activity: &Activity,
    ) -> ProviderResult<UploadReceipt>;
}

/// Destination that accepts a complete binary fitness file
#[async_trait]
pub trait FileUploader: Send + Sync {
    /// Provider name
    fn name(&self) -> &'static str;

    /// Upload a finished file
    async fn upload_file(
        &self,
        access_token: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> ProviderResult<()>;
}

/// Destination whose profile carries a single weight value
#[async_trait]
pub trait ProfileWeightUpdater: Send + Sync {
    /// Provider name
    fn name(&self) -> &'static str;

    /// Replace the profile weight
    async fn update_weight(&self, access_token: &str, weight_kg: f64) -> ProviderResult<()>;
}
