// ABOUTME: Concrete destinations for measurement and activity batches
// ABOUTME: Garmin weight file upload, Strava profile weight update and Strava activity upload
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::credentials::{CallSite, CredentialStore};
use crate::dispatcher::{DeliveryOutcome, Destination};
use crate::errors::{SyncError, SyncResult};
use crate::fit::{WeightFileEncoder, WeightRecord};
use crate::metrics::TrailingMean;
use crate::models::{Activity, Measurement};
use async_trait::async_trait;
use chrono::Utc;
use sportsync_providers::{ActivityUploader, FileUploader, ProfileWeightUpdater, UploadReceipt};
use std::collections::BTreeSet;
use std::sync::Arc;
use tracing::{info, warn};

/// Destination names
pub mod names {
    /// Tracker weight history
    pub const GARMIN_WEIGHT: &str = "garmin_weight";
    /// Social platform profile weight
    pub const STRAVA_WEIGHT: &str = "strava_weight";
    /// Social platform activities
    pub const STRAVA_ACTIVITIES: &str = "strava_activities";
}

/// Measurements handed to measurement destinations
#[derive(Debug, Clone, PartialEq)]
pub struct MeasurementBatch {
    /// Measurements newer than the watermark, oldest first, heights attached
    pub records: Vec<Measurement>,
    /// Mean weight over the trailing window ending at process time
    pub trailing_mean: Option<TrailingMean>,
}

/// Uploads new measurements to the tracker as one weight file
pub struct GarminWeightDestination {
    provider: &'static str,
    uploader: Arc<dyn FileUploader>,
    encoder: Arc<dyn WeightFileEncoder>,
    credentials: Arc<CredentialStore>,
}

impl GarminWeightDestination {
    /// Create the destination
    #[must_use]
    pub fn new(
        uploader: Arc<dyn FileUploader>,
        encoder: Arc<dyn WeightFileEncoder>,
        credentials: Arc<CredentialStore>,
    ) -> Self {
        Self {
            provider: uploader.name(),
            uploader,
            encoder,
            credentials,
        }
    }
}

#[async_trait]
impl Destination<MeasurementBatch> for GarminWeightDestination {
    fn name(&self) -> &str {
        names::GARMIN_WEIGHT
    }

    async fn deliver(&self, batch: &MeasurementBatch) -> SyncResult<DeliveryOutcome> {
        if batch.records.is_empty() {
            return Ok(DeliveryOutcome::skipped("no new measurements"));
        }

        let records: Vec<WeightRecord> = batch.records.iter().map(WeightRecord::from).collect();
        let contents = self
            .encoder
            .encode(&records, Utc::now())
            .map_err(|e| SyncError::encoding(names::GARMIN_WEIGHT, e.to_string()))?;

        let file_name = format!(
            "sportsync-weight-{}.fit",
            batch
                .records
                .last()
                .map_or(0, |m| m.timestamp.timestamp())
        );
        let uploader = &self.uploader;
        let file_name = file_name.as_str();
        let contents = &contents;
        self.credentials
            .call_with_refresh(
                self.provider,
                CallSite::Dispatch {
                    destination: names::GARMIN_WEIGHT,
                },
                |token| async move {
                    uploader
                        .upload_file(&token, file_name, contents.clone())
                        .await
                },
            )
            .await?;

        info!(
            destination = names::GARMIN_WEIGHT,
            records = records.len(),
            bytes = contents.len(),
            "Uploaded weight file"
        );
        Ok(DeliveryOutcome::delivered(records.len()))
    }
}

/// Sets the social platform profile weight to the trailing mean
pub struct StravaWeightDestination {
    provider: &'static str,
    updater: Arc<dyn ProfileWeightUpdater>,
    credentials: Arc<CredentialStore>,
}

impl StravaWeightDestination {
    /// Create the destination
    #[must_use]
    pub fn new(updater: Arc<dyn ProfileWeightUpdater>, credentials: Arc<CredentialStore>) -> Self {
        Self {
            provider: updater.name(),
            updater,
            credentials,
        }
    }
}

#[async_trait]
impl Destination<MeasurementBatch> for StravaWeightDestination {
    fn name(&self) -> &str {
        names::STRAVA_WEIGHT
    }

    async fn deliver(&self, batch: &MeasurementBatch) -> SyncResult<DeliveryOutcome> {
        let Some(mean) = batch.trailing_mean else {
            return Ok(DeliveryOutcome::skipped(
                "no measurements in the trailing window",
            ));
        };

        let updater = &self.updater;
        self.credentials
            .call_with_refresh(
                self.provider,
                CallSite::Dispatch {
                    destination: names::STRAVA_WEIGHT,
                },
                |token| async move { updater.update_weight(&token, mean.mean_kg).await },
            )
            .await?;

        info!(
            destination = names::STRAVA_WEIGHT,
            weight_kg = mean.mean_kg,
            averaged = mean.count,
            "Updated profile weight"
        );
        Ok(DeliveryOutcome::delivered(1))
    }
}

/// Uploads activities whose type is on the allow-list
pub struct StravaActivityDestination {
    provider: &'static str,
    uploader: Arc<dyn ActivityUploader>,
    credentials: Arc<CredentialStore>,
    allowed_types: BTreeSet<String>,
}

impl StravaActivityDestination {
    /// Create the destination with an activity-type allow-list
    #[must_use]
    pub fn new(
        uploader: Arc<dyn ActivityUploader>,
        credentials: Arc<CredentialStore>,
        allowed_types: BTreeSet<String>,
    ) -> Self {
        Self {
            provider: uploader.name(),
            uploader,
            credentials,
            allowed_types,
        }
    }
}

#[async_trait]
impl Destination<[Activity]> for StravaActivityDestination {
    fn name(&self) -> &str {
        names::STRAVA_ACTIVITIES
    }

    async fn deliver(&self, batch: &[Activity]) -> SyncResult<DeliveryOutcome> {
        if batch.is_empty() {
            return Ok(DeliveryOutcome::skipped("no new activities"));
        }

        let mut delivered = 0;
        let uploader = &self.uploader;
        for activity in batch {
            if !self.allowed_types.contains(activity.type_key()) {
                info!(
                    destination = names::STRAVA_ACTIVITIES,
                    activity_id = activity.provider_id(),
                    type_key = activity.type_key(),
                    "Skipping activity type not on the upload list"
                );
                continue;
            }

            let receipt = self
                .credentials
                .call_with_refresh(
                    self.provider,
                    CallSite::Dispatch {
                        destination: names::STRAVA_ACTIVITIES,
                    },
                    |token| async move { uploader.upload_activity(&token, activity).await },
                )
                .await?;

            match receipt {
                UploadReceipt::Created { remote_id } => info!(
                    activity_id = activity.provider_id(),
                    remote_id = %remote_id,
                    name = activity.name(),
                    "Uploaded activity"
                ),
                UploadReceipt::Duplicate { message } => warn!(
                    activity_id = activity.provider_id(),
                    message = %message,
                    "Activity already present, counting as delivered"
                ),
            }
            delivered += 1;
        }

        if delivered == 0 {
            return Ok(DeliveryOutcome::skipped(format!(
                "none of {} activities has an allowed type",
                batch.len()
            )));
        }
        Ok(DeliveryOutcome::delivered(delivered))
    }
}
