// ABOUTME: Incremental fetcher turning provider payloads into canonical records newer than a bound
// ABOUTME: Scale measure groups become Measurements and tracker listings become Activities
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::credentials::{CallSite, CredentialStore};
use crate::errors::SyncResult;
use crate::models::{newer_than, Activity, HeightSample, Measurement};
use chrono::{DateTime, Utc};
use sportsync_core::constants::measure_types;
use sportsync_core::units::scaled_value;
use sportsync_providers::{ActivitySource, MeasurementSource, RawMeasureGroup};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Retrieves canonical records strictly newer than a lower bound
///
/// Every fetch returns records ordered oldest first. Calling a fetch twice
/// with the same bound and no upstream change yields the same records.
pub struct IncrementalFetcher {
    credentials: Arc<CredentialStore>,
    measurements: Arc<dyn MeasurementSource>,
    activities: Arc<dyn ActivitySource>,
}

impl IncrementalFetcher {
    /// Create a fetcher over the scale and tracker sources
    #[must_use]
    pub fn new(
        credentials: Arc<CredentialStore>,
        measurements: Arc<dyn MeasurementSource>,
        activities: Arc<dyn ActivitySource>,
    ) -> Self {
        Self {
            credentials,
            measurements,
            activities,
        }
    }

    /// Body-composition measurements taken strictly after `since`
    ///
    /// Heights are not attached; see [`crate::metrics::attach_heights`].
    ///
    /// # Errors
    ///
    /// Returns `Fetch` or `AuthExpired` when the scale provider call fails
    pub async fn fetch_measurements(&self, since: DateTime<Utc>) -> SyncResult<Vec<Measurement>> {
        let provider = self.measurements.name();
        let source = &self.measurements;
        let groups = self
            .credentials
            .call_with_refresh(provider, CallSite::Fetch, |token| async move {
                source
                    .measure_groups(&token, since, measure_types::BODY_COMPOSITION)
                    .await
            })
            .await?;

        let fetched = groups.len();
        let measurements = newer_than(measurements_from_groups(&groups), since);
        info!(
            provider,
            groups = fetched,
            records = measurements.len(),
            since = %since,
            "Fetched measurements"
        );
        Ok(measurements)
    }

    /// Every height the scale provider has on record, oldest first
    ///
    /// # Errors
    ///
    /// Returns `Fetch` or `AuthExpired` when the scale provider call fails
    pub async fn fetch_heights(&self) -> SyncResult<Vec<HeightSample>> {
        let provider = self.measurements.name();
        let source = &self.measurements;
        let groups = self
            .credentials
            .call_with_refresh(provider, CallSite::Fetch, |token| async move {
                source
                    .measure_groups(&token, DateTime::UNIX_EPOCH, &[measure_types::HEIGHT])
                    .await
            })
            .await?;

        let mut heights: Vec<HeightSample> = groups
            .iter()
            .flat_map(|group| {
                group
                    .measures
                    .iter()
                    .filter(|m| m.measure_type == measure_types::HEIGHT)
                    .map(|m| HeightSample {
                        timestamp: group.timestamp,
                        height_m: scaled_value(m.value, m.unit),
                    })
            })
            .collect();
        heights.sort_by_key(|h| h.timestamp);
        debug!(provider, heights = heights.len(), "Fetched height history");
        Ok(heights)
    }

    /// Activities started strictly after `since`, with their payloads
    ///
    /// # Errors
    ///
    /// Returns `Fetch` or `AuthExpired` when listing or any download fails
    pub async fn fetch_activities(&self, since: DateTime<Utc>) -> SyncResult<Vec<Activity>> {
        let provider = self.activities.name();
        let source = &self.activities;
        let mut summaries = self
            .credentials
            .call_with_refresh(provider, CallSite::Fetch, |token| async move {
                source.list_activities(&token, since).await
            })
            .await?;
        summaries.retain(|s| s.start_time > since);
        summaries.sort_by_key(|s| s.start_time);

        let mut activities = Vec::with_capacity(summaries.len());
        for summary in summaries {
            let id = summary.id.as_str();
            let payload = self
                .credentials
                .call_with_refresh(provider, CallSite::Fetch, |token| async move {
                    source.download_activity(&token, id).await
                })
                .await?;
            debug!(
                provider,
                activity_id = id,
                type_key = %summary.type_key,
                bytes = payload.len(),
                "Downloaded activity"
            );
            activities.push(Activity::new(
                summary.id,
                summary.start_time,
                summary.name,
                summary.type_key,
                payload,
            ));
        }

        info!(provider, records = activities.len(), since = %since, "Fetched activities");
        Ok(activities)
    }
}

/// Readings collected for one instant before the weight requirement is checked
#[derive(Debug, Default)]
struct Readings {
    weight_kg: Option<f64>,
    fat_ratio_pct: Option<f64>,
    hydration_kg: Option<f64>,
    bone_mass_kg: Option<f64>,
    muscle_mass_kg: Option<f64>,
}

impl Readings {
    fn record(&mut self, measure_type: i32, value: f64) {
        let slot = match measure_type {
            measure_types::WEIGHT => &mut self.weight_kg,
            measure_types::FAT_RATIO => &mut self.fat_ratio_pct,
            measure_types::HYDRATION => &mut self.hydration_kg,
            measure_types::BONE_MASS => &mut self.bone_mass_kg,
            measure_types::MUSCLE_MASS => &mut self.muscle_mass_kg,
            _ => return,
        };
        slot.get_or_insert(value);
    }

    fn into_measurement(self, timestamp: DateTime<Utc>) -> Option<Measurement> {
        let weight_kg = self.weight_kg?;
        let hydration_pct = self
            .hydration_kg
            .filter(|_| weight_kg > 0.0)
            .map(|kg| kg / weight_kg * 100.0);
        Some(Measurement {
            fat_ratio_pct: self.fat_ratio_pct,
            hydration_pct,
            bone_mass_kg: self.bone_mass_kg,
            muscle_mass_kg: self.muscle_mass_kg,
            ..Measurement::new(timestamp, weight_kg)
        })
    }
}

/// Map raw measure groups into measurements, one per instant
///
/// Groups sharing a timestamp are merged. An instant without a weight reading
/// is not dispatchable and is dropped.
#[must_use]
pub fn measurements_from_groups(groups: &[RawMeasureGroup]) -> Vec<Measurement> {
    let mut by_instant: BTreeMap<DateTime<Utc>, Readings> = BTreeMap::new();
    for group in groups {
        let readings = by_instant.entry(group.timestamp).or_default();
        for measure in &group.measures {
            readings.record(measure.measure_type, scaled_value(measure.value, measure.unit));
        }
    }

    by_instant
        .into_iter()
        .filter_map(|(timestamp, readings)| {
            let measurement = readings.into_measurement(timestamp);
            if measurement.is_none() {
                debug!(timestamp = %timestamp, "Dropping measure group without weight");
            }
            measurement
        })
        .collect()
}
