// ABOUTME: Garmin Connect client for activity listing, FIT download and file upload
// ABOUTME: Unwraps zipped activity downloads and treats an already-present upload as success
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::archive::unwrap_first_entry;
use crate::core::{ActivitySource, ActivitySummary, FileUploader, ProviderConfig, TokenRefresher};
use crate::http_client::{check_status, shared_client, transport_error};
use crate::oauth::refresh_with_form;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDateTime, Utc};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sportsync_core::constants::providers;
use sportsync_core::errors::{ProviderError, ProviderResult};
use sportsync_core::models::Credentials;
use tracing::{debug, info};

/// Activities requested per listing page
const PAGE_SIZE: usize = 50;

/// Format of `startTimeGMT` in activity listings
const START_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Garmin API response for an activity listing entry
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminActivityResponse {
    activity_id: u64,
    #[serde(default)]
    activity_name: Option<String>,
    #[serde(rename = "startTimeGMT")]
    start_time_gmt: String,
    #[serde(default)]
    activity_type: Option<GarminActivityType>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GarminActivityType {
    type_key: String,
}

impl GarminActivityResponse {
    fn into_summary(self) -> ProviderResult<ActivitySummary> {
        let start_time = NaiveDateTime::parse_from_str(&self.start_time_gmt, START_TIME_FORMAT)
            .map(|naive| naive.and_utc())
            .map_err(|e| {
                ProviderError::parse(
                    providers::GARMIN,
                    format!(
                        "activity {} has unparseable startTimeGMT {:?}: {e}",
                        self.activity_id, self.start_time_gmt
                    ),
                )
            })?;

        Ok(ActivitySummary {
            id: self.activity_id.to_string(),
            start_time,
            name: self.activity_name.unwrap_or_default(),
            type_key: self
                .activity_type
                .map_or_else(|| "uncategorized".to_owned(), |t| t.type_key),
        })
    }
}

/// Garmin Connect provider implementation
pub struct GarminProvider {
    config: ProviderConfig,
    client: Client,
}

impl GarminProvider {
    /// Create a new Garmin provider with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ProviderConfig {
            name: providers::GARMIN.to_owned(),
            auth_url: "https://connect.garmin.com/oauthConfirm".to_owned(),
            token_url: "https://connectapi.garmin.com/oauth-service/oauth/exchange/user/2.0"
                .to_owned(),
            api_base_url: "https://connectapi.garmin.com".to_owned(),
        })
    }

    /// Create provider with custom configuration
    #[must_use]
    pub fn with_config(config: ProviderConfig) -> Self {
        Self {
            config,
            client: shared_client().clone(),
        }
    }

    async fn activity_page(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
        start: usize,
    ) -> ProviderResult<Vec<GarminActivityResponse>> {
        let url = format!(
            "{}/activitylist-service/activities/search/activities",
            self.config.api_base_url
        );
        let start_date = since.format("%Y-%m-%d").to_string();
        let query = [
            ("start", start.to_string()),
            ("limit", PAGE_SIZE.to_string()),
            ("startDate", start_date),
        ];

        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .query(&query)
            .send()
            .await
            .map_err(|e| transport_error(providers::GARMIN, &e))?;
        check_status(providers::GARMIN, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::parse(providers::GARMIN, e.to_string()))
    }
}

impl Default for GarminProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivitySource for GarminProvider {
    fn name(&self) -> &'static str {
        providers::GARMIN
    }

    async fn list_activities(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
    ) -> ProviderResult<Vec<ActivitySummary>> {
        let mut summaries = Vec::new();
        let mut start = 0;
        loop {
            let page = self.activity_page(access_token, since, start).await?;
            let page_len = page.len();
            debug!(start, page_len, "Fetched activity listing page");

            // One bad entry fails the whole listing so the watermark cannot pass it
            for entry in page {
                let summary = entry.into_summary()?;
                if summary.start_time >= since {
                    summaries.push(summary);
                }
            }

            if page_len < PAGE_SIZE {
                break;
            }
            start += page_len;
        }

        info!(
            provider = providers::GARMIN,
            activities = summaries.len(),
            since = %since,
            "Listed activities"
        );
        Ok(summaries)
    }

    async fn download_activity(
        &self,
        access_token: &str,
        activity_id: &str,
    ) -> ProviderResult<Vec<u8>> {
        let url = format!(
            "{}/download-service/files/activity/{activity_id}",
            self.config.api_base_url
        );
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport_error(providers::GARMIN, &e))?;
        let bytes = check_status(providers::GARMIN, response)
            .await?
            .bytes()
            .await
            .map_err(|e| transport_error(providers::GARMIN, &e))?;

        debug!(activity_id, bytes = bytes.len(), "Downloaded activity file");
        unwrap_first_entry(bytes.to_vec())
            .map_err(|e| ProviderError::parse(providers::GARMIN, e.to_string()))
    }
}

#[async_trait]
impl FileUploader for GarminProvider {
    fn name(&self) -> &'static str {
        providers::GARMIN
    }

    async fn upload_file(
        &self,
        access_token: &str,
        file_name: &str,
        contents: Vec<u8>,
    ) -> ProviderResult<()> {
        let url = format!("{}/upload-service/upload/.fit", self.config.api_base_url);
        let size = contents.len();
        let part = Part::bytes(contents)
            .file_name(file_name.to_owned())
            .mime_str("application/octet-stream")
            .map_err(|e| ProviderError::network(providers::GARMIN, e.to_string()))?;
        let form = Form::new().part("file", part);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(providers::GARMIN, &e))?;

        if response.status() == StatusCode::CONFLICT {
            info!(file_name, "File already present on Garmin Connect");
            return Ok(());
        }
        check_status(providers::GARMIN, response).await?;
        info!(file_name, bytes = size, "Uploaded file to Garmin Connect");
        Ok(())
    }
}

#[async_trait]
impl TokenRefresher for GarminProvider {
    fn name(&self) -> &'static str {
        providers::GARMIN
    }

    async fn refresh(&self, credentials: &Credentials) -> ProviderResult<Credentials> {
        refresh_with_form(
            &self.client,
            &self.config.token_url,
            providers::GARMIN,
            credentials,
        )
        .await
    }
}
