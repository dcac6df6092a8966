// ABOUTME: Strava API client for activity uploads, athlete weight and token refresh
// ABOUTME: Polls upload processing until Strava reports an activity, a duplicate or an error
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::core::{ActivityUploader, ProfileWeightUpdater, ProviderConfig, TokenRefresher, UploadReceipt};
use crate::http_client::{check_status, shared_client, transport_error};
use crate::oauth::refresh_with_form;
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::Deserialize;
use sportsync_core::constants::{defaults, providers};
use sportsync_core::errors::{ProviderError, ProviderResult};
use sportsync_core::models::{Activity, Credentials};
use std::time::Duration;
use tracing::{debug, info};

/// Strava upload status resource
#[derive(Debug, Deserialize)]
struct UploadStatus {
    id: u64,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    activity_id: Option<u64>,
}

impl UploadStatus {
    /// Terminal receipt, or `None` while Strava is still processing
    fn receipt(&self) -> Option<ProviderResult<UploadReceipt>> {
        if let Some(error) = self.error.as_deref().filter(|e| !e.is_empty()) {
            return Some(if is_duplicate(error) {
                Ok(UploadReceipt::Duplicate {
                    message: error.to_owned(),
                })
            } else {
                Err(ProviderError::UploadRejected {
                    provider: providers::STRAVA.to_owned(),
                    message: error.to_owned(),
                })
            });
        }
        self.activity_id.map(|id| {
            Ok(UploadReceipt::Created {
                remote_id: id.to_string(),
            })
        })
    }
}

/// Strava reports re-uploads as an error such as
/// "foo.fit duplicate of activity 123"
fn is_duplicate(error: &str) -> bool {
    error.to_ascii_lowercase().contains("duplicate")
}

/// Upload polling schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadPolling {
    /// Status checks before giving up
    pub attempts: u32,
    /// Delay between status checks
    pub interval: Duration,
}

impl Default for UploadPolling {
    fn default() -> Self {
        Self {
            attempts: defaults::UPLOAD_POLL_ATTEMPTS,
            interval: Duration::from_millis(defaults::UPLOAD_POLL_INTERVAL_MS),
        }
    }
}

/// Strava API provider
pub struct StravaProvider {
    config: ProviderConfig,
    client: Client,
    polling: UploadPolling,
}

impl StravaProvider {
    /// Create a new Strava provider with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ProviderConfig {
            name: providers::STRAVA.to_owned(),
            auth_url: "https://www.strava.com/oauth/authorize".to_owned(),
            token_url: "https://www.strava.com/oauth/token".to_owned(),
            api_base_url: "https://www.strava.com/api/v3".to_owned(),
        })
    }

    /// Create provider with custom configuration
    #[must_use]
    pub fn with_config(config: ProviderConfig) -> Self {
        Self {
            config,
            client: shared_client().clone(),
            polling: UploadPolling::default(),
        }
    }

    /// Override the upload polling schedule
    #[must_use]
    pub const fn with_upload_polling(mut self, polling: UploadPolling) -> Self {
        self.polling = polling;
        self
    }

    async fn upload_status(&self, access_token: &str, upload_id: u64) -> ProviderResult<UploadStatus> {
        let url = format!("{}/uploads/{upload_id}", self.config.api_base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| transport_error(providers::STRAVA, &e))?;
        check_status(providers::STRAVA, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::parse(providers::STRAVA, e.to_string()))
    }
}

impl Default for StravaProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ActivityUploader for StravaProvider {
    fn name(&self) -> &'static str {
        providers::STRAVA
    }

    async fn upload_activity(
        &self,
        access_token: &str,
        activity: &Activity,
    ) -> ProviderResult<UploadReceipt> {
        let url = format!("{}/uploads", self.config.api_base_url);
        let external_id = format!("sportsync-{}", activity.provider_id());
        let part = Part::bytes(activity.payload().to_vec())
            .file_name(format!("{}.fit", activity.provider_id()))
            .mime_str("application/octet-stream")
            .map_err(|e| ProviderError::network(providers::STRAVA, e.to_string()))?;
        let form = Form::new()
            .part("file", part)
            .text("data_type", "fit")
            .text("name", activity.name().to_owned())
            .text("external_id", external_id);

        let response = self
            .client
            .post(&url)
            .bearer_auth(access_token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| transport_error(providers::STRAVA, &e))?;
        let mut status: UploadStatus = check_status(providers::STRAVA, response)
            .await?
            .json()
            .await
            .map_err(|e| ProviderError::parse(providers::STRAVA, e.to_string()))?;
        info!(
            upload_id = status.id,
            activity_id = activity.provider_id(),
            "Activity upload accepted for processing"
        );

        for attempt in 0..=self.polling.attempts {
            if let Some(receipt) = status.receipt() {
                return receipt;
            }
            if attempt == self.polling.attempts {
                break;
            }
            debug!(
                upload_id = status.id,
                attempt,
                status = status.status.as_deref().unwrap_or_default(),
                "Upload still processing"
            );
            tokio::time::sleep(self.polling.interval).await;
            status = self.upload_status(access_token, status.id).await?;
        }

        Err(ProviderError::Timeout {
            provider: providers::STRAVA.to_owned(),
        })
    }
}

#[async_trait]
impl ProfileWeightUpdater for StravaProvider {
    fn name(&self) -> &'static str {
        providers::STRAVA
    }

    async fn update_weight(&self, access_token: &str, weight_kg: f64) -> ProviderResult<()> {
        let url = format!("{}/athlete", self.config.api_base_url);
        let response = self
            .client
            .put(&url)
            .bearer_auth(access_token)
            .form(&[("weight", format!("{weight_kg:.2}"))])
            .send()
            .await
            .map_err(|e| transport_error(providers::STRAVA, &e))?;
        check_status(providers::STRAVA, response).await?;
        info!(weight_kg, "Updated Strava athlete weight");
        Ok(())
    }
}

#[async_trait]
impl TokenRefresher for StravaProvider {
    fn name(&self) -> &'static str {
        providers::STRAVA
    }

    async fn refresh(&self, credentials: &Credentials) -> ProviderResult<Credentials> {
        refresh_with_form(
            &self.client,
            &self.config.token_url,
            providers::STRAVA,
            credentials,
        )
        .await
    }
}
