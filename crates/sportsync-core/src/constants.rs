// ABOUTME: Provider identifiers, scale measure type codes and sync defaults
// ABOUTME: Centralizes names so logs, state file keys and destinations agree
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

/// Provider identifiers, used as state-file keys and log fields
pub mod providers {
    /// Smart-scale provider
    pub const WITHINGS: &str = "withings";
    /// Fitness-tracker provider
    pub const GARMIN: &str = "garmin";
    /// Social fitness-tracking provider
    pub const STRAVA: &str = "strava";
}

/// Measure type codes understood by the scale provider
pub mod measure_types {
    /// Weight (kg)
    pub const WEIGHT: i32 = 1;
    /// Height (m)
    pub const HEIGHT: i32 = 4;
    /// Fat free mass (kg)
    pub const FAT_FREE_MASS: i32 = 5;
    /// Fat ratio (%)
    pub const FAT_RATIO: i32 = 6;
    /// Fat mass weight (kg)
    pub const FAT_MASS: i32 = 8;
    /// Muscle mass (kg)
    pub const MUSCLE_MASS: i32 = 76;
    /// Hydration (kg)
    pub const HYDRATION: i32 = 77;
    /// Bone mass (kg)
    pub const BONE_MASS: i32 = 88;

    /// Types requested for a body-composition fetch
    pub const BODY_COMPOSITION: &[i32] = &[
        WEIGHT,
        FAT_FREE_MASS,
        FAT_RATIO,
        FAT_MASS,
        MUSCLE_MASS,
        HYDRATION,
        BONE_MASS,
    ];
}

/// Defaults for the run configuration
pub mod defaults {
    /// Name of the persisted state file
    pub const STATE_FILE: &str = "sportsync.yml";
    /// Bounded look-back window for fetching, in days
    pub const LOOKBACK_DAYS: i64 = 21;
    /// Trailing window for the profile weight mean, in days
    pub const WEIGHT_WINDOW_DAYS: i64 = 7;
    /// Activity types uploaded to the social platform when none are configured
    pub const UPLOAD_TYPES: &[&str] = &[
        "running",
        "trail_running",
        "treadmill_running",
        "cycling",
        "road_biking",
        "mountain_biking",
        "gravel_cycling",
        "indoor_cycling",
        "virtual_ride",
        "lap_swimming",
        "open_water_swimming",
        "hiking",
        "walking",
    ];
    /// HTTP request timeout, seconds
    pub const HTTP_TIMEOUT_SECS: u64 = 30;
    /// HTTP connect timeout, seconds
    pub const HTTP_CONNECT_TIMEOUT_SECS: u64 = 10;
    /// Deadline for one destination to accept a batch, seconds
    pub const DESTINATION_TIMEOUT_SECS: u64 = 120;
    /// Upload status polls before giving up
    pub const UPLOAD_POLL_ATTEMPTS: u32 = 10;
    /// Delay between upload status polls, milliseconds
    pub const UPLOAD_POLL_INTERVAL_MS: u64 = 2000;
}
