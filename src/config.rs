// ABOUTME: Run configuration loaded from SPORTSYNC_* environment variables
// ABOUTME: Look-back and trailing windows, upload allow-list, timeouts and polling
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::errors::{SyncError, SyncResult};
use chrono::Duration;
use sportsync_core::constants::defaults;
use std::collections::BTreeSet;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::info;

/// Environment variable names
pub mod env_keys {
    /// Path of the persisted state file
    pub const STATE_FILE: &str = "SPORTSYNC_STATE_FILE";
    /// Bounded look-back window in days
    pub const LOOKBACK_DAYS: &str = "SPORTSYNC_LOOKBACK_DAYS";
    /// Trailing weight mean window in days
    pub const WEIGHT_WINDOW_DAYS: &str = "SPORTSYNC_WEIGHT_WINDOW_DAYS";
    /// Comma-separated activity types uploaded to Strava
    pub const STRAVA_UPLOAD_TYPES: &str = "SPORTSYNC_STRAVA_UPLOAD_TYPES";
    /// Height in metres used when the scale has no height on record
    pub const FALLBACK_HEIGHT_M: &str = "SPORTSYNC_FALLBACK_HEIGHT_M";
    /// Shared HTTP client request timeout
    pub const HTTP_TIMEOUT_SECS: &str = "SPORTSYNC_HTTP_TIMEOUT_SECS";
    /// Shared HTTP client connect timeout
    pub const HTTP_CONNECT_TIMEOUT_SECS: &str = "SPORTSYNC_HTTP_CONNECT_TIMEOUT_SECS";
    /// Deadline for one destination to accept a batch
    pub const DESTINATION_TIMEOUT_SECS: &str = "SPORTSYNC_DESTINATION_TIMEOUT_SECS";
    /// Strava upload status polls
    pub const UPLOAD_POLL_ATTEMPTS: &str = "SPORTSYNC_UPLOAD_POLL_ATTEMPTS";
    /// Delay between Strava upload status polls
    pub const UPLOAD_POLL_INTERVAL_MS: &str = "SPORTSYNC_UPLOAD_POLL_INTERVAL_MS";
}

/// Configuration for one sync run
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    /// Persisted state file
    pub state_file: PathBuf,
    /// Records older than `now - lookback` are never fetched
    pub lookback: Duration,
    /// Trailing window for the profile weight mean
    pub weight_window: Duration,
    /// Activity types uploaded to Strava
    pub strava_upload_types: BTreeSet<String>,
    /// Height used for BMI when no height sample precedes a measurement
    pub fallback_height_m: Option<f64>,
    /// HTTP request timeout, seconds
    pub http_timeout_secs: u64,
    /// HTTP connect timeout, seconds
    pub http_connect_timeout_secs: u64,
    /// Per-destination delivery deadline
    pub destination_timeout: std::time::Duration,
    /// Upload status polls before giving up
    pub upload_poll_attempts: u32,
    /// Delay between upload status polls
    pub upload_poll_interval: std::time::Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            state_file: PathBuf::from(defaults::STATE_FILE),
            lookback: Duration::days(defaults::LOOKBACK_DAYS),
            weight_window: Duration::days(defaults::WEIGHT_WINDOW_DAYS),
            strava_upload_types: defaults::UPLOAD_TYPES
                .iter()
                .map(|t| (*t).to_owned())
                .collect(),
            fallback_height_m: None,
            http_timeout_secs: defaults::HTTP_TIMEOUT_SECS,
            http_connect_timeout_secs: defaults::HTTP_CONNECT_TIMEOUT_SECS,
            destination_timeout: std::time::Duration::from_secs(defaults::DESTINATION_TIMEOUT_SECS),
            upload_poll_attempts: defaults::UPLOAD_POLL_ATTEMPTS,
            upload_poll_interval: std::time::Duration::from_millis(
                defaults::UPLOAD_POLL_INTERVAL_MS,
            ),
        }
    }
}

impl SyncConfig {
    /// Load configuration from environment variables, falling back to defaults
    ///
    /// # Errors
    ///
    /// Returns `SyncError::Config` when a variable is set but cannot be parsed
    /// or is out of range.
    pub fn from_env() -> SyncResult<Self> {
        let base = Self::default();

        let lookback_days: i64 = parse_env(env_keys::LOOKBACK_DAYS, defaults::LOOKBACK_DAYS)?;
        let window_days: i64 =
            parse_env(env_keys::WEIGHT_WINDOW_DAYS, defaults::WEIGHT_WINDOW_DAYS)?;
        if lookback_days <= 0 {
            return Err(SyncError::config(format!(
                "{} must be positive, got {lookback_days}",
                env_keys::LOOKBACK_DAYS
            )));
        }
        if window_days <= 0 {
            return Err(SyncError::config(format!(
                "{} must be positive, got {window_days}",
                env_keys::WEIGHT_WINDOW_DAYS
            )));
        }

        let fallback_height_m = match env::var(env_keys::FALLBACK_HEIGHT_M) {
            Ok(raw) => {
                let height: f64 = parse_value(env_keys::FALLBACK_HEIGHT_M, &raw)?;
                if !(height.is_finite() && height > 0.0) {
                    return Err(SyncError::config(format!(
                        "{} must be a positive height in metres, got {raw}",
                        env_keys::FALLBACK_HEIGHT_M
                    )));
                }
                Some(height)
            }
            Err(_) => None,
        };

        let strava_upload_types = env::var(env_keys::STRAVA_UPLOAD_TYPES)
            .map_or(base.strava_upload_types, |raw| parse_list(&raw));

        let config = Self {
            state_file: env::var(env_keys::STATE_FILE).map_or(base.state_file, PathBuf::from),
            lookback: Duration::days(lookback_days),
            weight_window: Duration::days(window_days),
            strava_upload_types,
            fallback_height_m,
            http_timeout_secs: parse_env(env_keys::HTTP_TIMEOUT_SECS, base.http_timeout_secs)?,
            http_connect_timeout_secs: parse_env(
                env_keys::HTTP_CONNECT_TIMEOUT_SECS,
                base.http_connect_timeout_secs,
            )?,
            destination_timeout: std::time::Duration::from_secs(parse_env(
                env_keys::DESTINATION_TIMEOUT_SECS,
                defaults::DESTINATION_TIMEOUT_SECS,
            )?),
            upload_poll_attempts: parse_env(
                env_keys::UPLOAD_POLL_ATTEMPTS,
                base.upload_poll_attempts,
            )?,
            upload_poll_interval: std::time::Duration::from_millis(parse_env(
                env_keys::UPLOAD_POLL_INTERVAL_MS,
                defaults::UPLOAD_POLL_INTERVAL_MS,
            )?),
        };

        info!(
            state_file = %config.state_file.display(),
            lookback_days,
            weight_window_days = window_days,
            upload_types = config.strava_upload_types.len(),
            "Loaded sync configuration"
        );
        Ok(config)
    }

    /// Override the state file location
    #[must_use]
    pub fn with_state_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.state_file = path.into();
        self
    }
}

fn parse_env<T: FromStr>(key: &str, default: T) -> SyncResult<T> {
    env::var(key).map_or(Ok(default), |raw| parse_value(key, &raw))
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> SyncResult<T> {
    raw.trim()
        .parse()
        .map_err(|_| SyncError::config(format!("invalid value for {key}: {raw:?}")))
}

/// Parse a comma-separated list, dropping blanks
fn parse_list(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}
