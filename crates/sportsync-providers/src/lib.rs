// ABOUTME: Provider API clients for Withings, Garmin Connect and Strava
// ABOUTME: Provider traits, shared HTTP client, OAuth2 refresh and archive extraction
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! Provider API clients and the traits the sync engine consumes.
//!
//! Each provider implements only the traits matching its role (see
//! [`core`]). None of them stores tokens; callers pass an access token on
//! every call.

// Re-export sportsync-core modules so providers and callers share one path
pub use sportsync_core::constants;
pub use sportsync_core::errors;
pub use sportsync_core::models;

/// Zip extraction for downloaded activity files
pub mod archive;
/// Core provider traits and DTOs
pub mod core;
/// Shared HTTP client for provider API calls
pub mod http_client;
/// `OAuth2` refresh-token grant
pub mod oauth;

/// Garmin Connect provider implementation
pub mod garmin;
/// Strava API provider implementation
pub mod strava;
/// Withings API provider implementation
pub mod withings;

pub use core::{
    ActivitySource, ActivitySummary, ActivityUploader, FileUploader, MeasurementSource,
    ProfileWeightUpdater, ProviderConfig, RawMeasure, RawMeasureGroup, TokenRefresher,
    UploadReceipt,
};
pub use garmin::GarminProvider;
pub use http_client::{initialize_shared_client, shared_client};
pub use strava::{StravaProvider, UploadPolling};
pub use withings::WithingsProvider;
