// ABOUTME: Canonical body-composition measurement and height sample records
// ABOUTME: Optional components stay absent rather than zero; BMI is derived from height
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use super::TimestampedRecord;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Provider-agnostic body-composition reading
///
/// `weight_kg` is mandatory: a reading without weight is never constructed, so
/// every `Measurement` is dispatchable. The remaining components are `None`
/// when the scale did not report them; `Some(0.0)` is a genuine reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Instant of the reading
    pub timestamp: DateTime<Utc>,
    /// Body weight in kilograms
    pub weight_kg: f64,
    /// Body fat as a percentage of weight
    pub fat_ratio_pct: Option<f64>,
    /// Body water as a percentage of weight
    pub hydration_pct: Option<f64>,
    /// Bone mass in kilograms
    pub bone_mass_kg: Option<f64>,
    /// Muscle mass in kilograms
    pub muscle_mass_kg: Option<f64>,
    /// Most recent known height at the time of the reading, in metres
    pub height_m: Option<f64>,
}

impl Measurement {
    /// Create a weight-only measurement
    #[must_use]
    pub const fn new(timestamp: DateTime<Utc>, weight_kg: f64) -> Self {
        Self {
            timestamp,
            weight_kg,
            fat_ratio_pct: None,
            hydration_pct: None,
            bone_mass_kg: None,
            muscle_mass_kg: None,
            height_m: None,
        }
    }

    /// Body-mass index, available only when a positive height is known
    #[must_use]
    pub fn bmi(&self) -> Option<f64> {
        self.height_m
            .filter(|h| *h > 0.0)
            .map(|h| self.weight_kg / (h * h))
    }
}

impl TimestampedRecord for Measurement {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}

/// A height reading reported by the scale provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeightSample {
    /// Instant of the reading
    pub timestamp: DateTime<Utc>,
    /// Height in metres
    pub height_m: f64,
}

impl TimestampedRecord for HeightSample {
    fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }
}
