// ABOUTME: In-memory provider fakes recording every call the sync engine makes
// ABOUTME: Each fake can reject tokens, fail calls or refuse refreshes on demand
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sportsync::constants::{measure_types, providers};
use sportsync::errors::{ProviderError, ProviderResult};
use sportsync::fit::{EncodeError, WeightFileEncoder, WeightRecord};
use sportsync::models::{Activity, Credentials};
use sportsync_providers::{
    ActivitySource, ActivitySummary, ActivityUploader, FileUploader, MeasurementSource,
    ProfileWeightUpdater, RawMeasure, RawMeasureGroup, TokenRefresher, UploadReceipt,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Token refresh behavior shared by the fakes
#[derive(Default)]
pub struct RefreshBehavior {
    /// Access tokens the fake rejects with `Unauthorized`
    pub rejected_tokens: Mutex<Vec<String>>,
    /// When set, refresh fails with `ReauthorizationRequired`
    pub refresh_revoked: Mutex<bool>,
    /// Number of refreshes performed
    pub refreshes: AtomicUsize,
}

impl RefreshBehavior {
    pub fn reject(&self, token: &str) {
        self.rejected_tokens.lock().unwrap().push(token.to_owned());
    }

    fn check(&self, provider: &str, token: &str) -> ProviderResult<()> {
        if self.rejected_tokens.lock().unwrap().iter().any(|t| t == token) {
            return Err(ProviderError::unauthorized(provider, "invalid_token"));
        }
        Ok(())
    }

    fn refresh(&self, provider: &str, credentials: &Credentials) -> ProviderResult<Credentials> {
        if *self.refresh_revoked.lock().unwrap() {
            return Err(ProviderError::reauthorization_required(
                provider,
                "refresh token revoked",
            ));
        }
        let n = self.refreshes.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(credentials.refreshed(
            format!("{provider}-token-r{n}"),
            Some(format!("{provider}-refresh-r{n}")),
            None,
            None,
        ))
    }
}

/// Scale provider serving measure groups from memory
#[derive(Default)]
pub struct FakeScale {
    pub groups: Mutex<Vec<RawMeasureGroup>>,
    pub fail_fetch: Mutex<Option<ProviderError>>,
    pub auth: RefreshBehavior,
    pub fetches: Mutex<Vec<(DateTime<Utc>, Vec<i32>)>>,
}

impl FakeScale {
    /// Add a weight reading with optional fat ratio
    pub fn add_weight(&self, at: DateTime<Utc>, weight_grams: i64, fat_ratio_tenths: Option<i64>) {
        let mut measures = vec![RawMeasure {
            measure_type: measure_types::WEIGHT,
            value: weight_grams,
            unit: -3,
        }];
        if let Some(fat) = fat_ratio_tenths {
            measures.push(RawMeasure {
                measure_type: measure_types::FAT_RATIO,
                value: fat,
                unit: -1,
            });
        }
        self.push(at, measures);
    }

    /// Add a height reading in centimetres
    pub fn add_height(&self, at: DateTime<Utc>, height_cm: i64) {
        self.push(
            at,
            vec![RawMeasure {
                measure_type: measure_types::HEIGHT,
                value: height_cm,
                unit: -2,
            }],
        );
    }

    fn push(&self, timestamp: DateTime<Utc>, measures: Vec<RawMeasure>) {
        let mut groups = self.groups.lock().unwrap();
        let group_id = groups.len() as i64 + 1;
        groups.push(RawMeasureGroup {
            group_id,
            timestamp,
            category: 1,
            measures,
        });
    }
}

#[async_trait]
impl MeasurementSource for FakeScale {
    fn name(&self) -> &'static str {
        providers::WITHINGS
    }

    async fn measure_groups(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
        types: &[i32],
    ) -> ProviderResult<Vec<RawMeasureGroup>> {
        self.auth.check(providers::WITHINGS, access_token)?;
        if let Some(err) = self.fail_fetch.lock().unwrap().clone() {
            return Err(err);
        }
        self.fetches.lock().unwrap().push((since, types.to_vec()));

        // Like the real API, the lower bound is inclusive
        Ok(self
            .groups
            .lock()
            .unwrap()
            .iter()
            .filter(|g| g.timestamp >= since)
            .filter_map(|g| {
                let measures: Vec<_> = g
                    .measures
                    .iter()
                    .filter(|m| types.contains(&m.measure_type))
                    .copied()
                    .collect();
                (!measures.is_empty()).then(|| RawMeasureGroup {
                    measures,
                    ..g.clone()
                })
            })
            .collect())
    }
}

#[async_trait]
impl TokenRefresher for FakeScale {
    fn name(&self) -> &'static str {
        providers::WITHINGS
    }

    async fn refresh(&self, credentials: &Credentials) -> ProviderResult<Credentials> {
        self.auth.refresh(providers::WITHINGS, credentials)
    }
}

/// Tracker serving activities and accepting weight files
#[derive(Default)]
pub struct FakeTracker {
    pub activities: Mutex<Vec<(ActivitySummary, Vec<u8>)>>,
    pub uploads: Mutex<Vec<(String, Vec<u8>)>>,
    pub fail_uploads: Mutex<Option<ProviderError>>,
    pub fail_listing: Mutex<Option<ProviderError>>,
    pub auth: RefreshBehavior,
}

impl FakeTracker {
    pub fn add_activity(&self, id: &str, start_time: DateTime<Utc>, type_key: &str) {
        self.activities.lock().unwrap().push((
            ActivitySummary {
                id: id.to_owned(),
                start_time,
                name: format!("Activity {id}"),
                type_key: type_key.to_owned(),
            },
            format!("FIT-{id}").into_bytes(),
        ));
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.lock().unwrap().len()
    }
}

#[async_trait]
impl ActivitySource for FakeTracker {
    fn name(&self) -> &'static str {
        providers::GARMIN
    }

    async fn list_activities(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
    ) -> ProviderResult<Vec<ActivitySummary>> {
        self.auth.check(providers::GARMIN, access_token)?;
        if let Some(err) = self.fail_listing.lock().unwrap().clone() {
            return Err(err);
        }
        Ok(self
            .activities
            .lock()
            .unwrap()
            .iter()
            .filter(|(s, _)| s.start_time >= since)
            .map(|(s, _)| s.clone())
            .collect())
    }

    async fn download_activity(&self, access_token: &str, activity_id: &str) -> ProviderResult<Vec<u8>> {
        self.auth.check(providers::GARMIN, access_token)?;
        self.activities
            .lock()
            .unwrap()
            .iter()
            .find(|(s, _)| s.id == activity_id)
            .map(|(_, payload)| payload.clone())
            .ok_or_else(|| ProviderError::api(providers::GARMIN, 404, "no such activity"))
    }
}

#[async_trait]
impl FileUploader for FakeTracker {
    fn name(&self) -> &'static str {
        providers::GARMIN
    }

    async fn upload_file(&self, access_token: &str, file_name: &str, contents: Vec<u8>) -> ProviderResult<()> {
        self.auth.check(providers::GARMIN, access_token)?;
        if let Some(err) = self.fail_uploads.lock().unwrap().clone() {
            return Err(err);
        }
        self.uploads
            .lock()
            .unwrap()
            .push((file_name.to_owned(), contents));
        Ok(())
    }
}

#[async_trait]
impl TokenRefresher for FakeTracker {
    fn name(&self) -> &'static str {
        providers::GARMIN
    }

    async fn refresh(&self, credentials: &Credentials) -> ProviderResult<Credentials> {
        self.auth.refresh(providers::GARMIN, credentials)
    }
}

/// Social platform recording uploads and profile weights
#[derive(Default)]
pub struct FakeSocial {
    pub uploaded: Mutex<Vec<String>>,
    pub weights: Mutex<Vec<f64>>,
    pub fail_uploads: Mutex<Option<ProviderError>>,
    pub fail_weight: Mutex<Option<ProviderError>>,
    pub duplicates: Mutex<Vec<String>>,
    pub auth: RefreshBehavior,
}

impl FakeSocial {
    pub fn uploaded(&self) -> Vec<String> {
        self.uploaded.lock().unwrap().clone()
    }

    pub fn weights(&self) -> Vec<f64> {
        self.weights.lock().unwrap().clone()
    }
}

#[async_trait]
impl ActivityUploader for FakeSocial {
    fn name(&self) -> &'static str {
        providers::STRAVA
    }

    async fn upload_activity(&self, access_token: &str, activity: &Activity) -> ProviderResult<UploadReceipt> {
        self.auth.check(providers::STRAVA, access_token)?;
        if let Some(err) = self.fail_uploads.lock().unwrap().clone() {
            return Err(err);
        }
        let id = activity.provider_id().to_owned();
        if self.duplicates.lock().unwrap().contains(&id) {
            return Ok(UploadReceipt::Duplicate {
                message: format!("{id}.fit duplicate of activity 1"),
            });
        }
        self.uploaded.lock().unwrap().push(id.clone());
        Ok(UploadReceipt::Created { remote_id: id })
    }
}

#[async_trait]
impl ProfileWeightUpdater for FakeSocial {
    fn name(&self) -> &'static str {
        providers::STRAVA
    }

    async fn update_weight(&self, access_token: &str, weight_kg: f64) -> ProviderResult<()> {
        self.auth.check(providers::STRAVA, access_token)?;
        if let Some(err) = self.fail_weight.lock().unwrap().clone() {
            return Err(err);
        }
        self.weights.lock().unwrap().push(weight_kg);
        Ok(())
    }
}

#[async_trait]
impl TokenRefresher for FakeSocial {
    fn name(&self) -> &'static str {
        providers::STRAVA
    }

    async fn refresh(&self, credentials: &Credentials) -> ProviderResult<Credentials> {
        self.auth.refresh(providers::STRAVA, credentials)
    }
}

/// Encoder that always fails
pub struct BrokenEncoder;

impl WeightFileEncoder for BrokenEncoder {
    fn encode(&self, _records: &[WeightRecord], _created: DateTime<Utc>) -> Result<Vec<u8>, EncodeError> {
        Err(EncodeError::ValueOutOfRange {
            field: "weight",
            value: f64::NAN,
        })
    }
}
