// ABOUTME: Derived metrics computed from canonical measurements before dispatch
// ABOUTME: Height attachment for BMI and the trailing-window mean weight
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::models::{HeightSample, Measurement};
use chrono::{DateTime, Duration, Utc};

/// Most recent height at or before `at`
///
/// `heights` must be ordered oldest first.
#[must_use]
pub fn height_at(heights: &[HeightSample], at: DateTime<Utc>) -> Option<f64> {
    let idx = heights.partition_point(|h| h.timestamp <= at);
    idx.checked_sub(1).map(|i| heights[i].height_m)
}

/// Set `height_m` on every measurement from the height history
///
/// Measurements that precede every height sample use `fallback_m`; with no
/// fallback their height (and therefore BMI) stays absent.
pub fn attach_heights(
    measurements: &mut [Measurement],
    heights: &[HeightSample],
    fallback_m: Option<f64>,
) {
    for measurement in measurements {
        measurement.height_m = height_at(heights, measurement.timestamp).or(fallback_m);
    }
}

/// Mean weight over a trailing window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrailingMean {
    /// Mean weight in kilograms
    pub mean_kg: f64,
    /// Measurements inside the window
    pub count: usize,
    /// Newest measurement inside the window
    pub latest: DateTime<Utc>,
}

/// Mean weight of measurements taken within `window` before `now`
///
/// The window ends at process time, not at the newest measurement. Returns
/// `None` for an empty window: the mean is undefined, not zero.
#[must_use]
pub fn trailing_mean(
    measurements: &[Measurement],
    now: DateTime<Utc>,
    window: Duration,
) -> Option<TrailingMean> {
    let start = now - window;
    let in_window = measurements
        .iter()
        .filter(|m| m.timestamp >= start && m.timestamp <= now);

    let (sum, count, latest) = in_window.fold((0.0, 0_usize, None), |(sum, count, latest), m| {
        (
            sum + m.weight_kg,
            count + 1,
            latest.max(Some(m.timestamp)),
        )
    });

    latest.map(|latest| TrailingMean {
        mean_kg: sum / count as f64,
        count,
        latest,
    })
}
