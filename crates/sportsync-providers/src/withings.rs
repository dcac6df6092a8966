// ABOUTME: Withings smart-scale API client for measure groups and token refresh
// ABOUTME: Decodes the status/body envelope and follows more/offset pagination
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::core::{MeasurementSource, ProviderConfig, RawMeasure, RawMeasureGroup, TokenRefresher};
use crate::http_client::{check_status, shared_client, transport_error};
use crate::oauth::TokenRefreshResponse;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use sportsync_core::constants::providers;
use sportsync_core::errors::{ProviderError, ProviderResult};
use sportsync_core::models::Credentials;
use tracing::{debug, info, warn};

/// Envelope status codes
mod status {
    pub const SUCCESS: i64 = 0;
    /// Invalid or missing access token
    pub const AUTH_FAILED: &[i64] = &[100, 101, 102, 200, 401, 214, 277, 2553, 2554, 2555];
    pub const TIMEOUT: i64 = 522;
    pub const TOO_MANY_REQUESTS: i64 = 601;
}

/// Measurement category for genuine readings (2 is a user objective)
const CATEGORY_REAL: i32 = 1;

/// `status`/`body` wrapper used by every Withings response
#[derive(Debug, Deserialize)]
struct Envelope<T> {
    status: i64,
    body: Option<T>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct MeasureBody {
    #[serde(default)]
    measuregrps: Vec<MeasureGroupResponse>,
    #[serde(default)]
    more: Option<serde_json::Value>,
    #[serde(default)]
    offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct MeasureGroupResponse {
    grpid: i64,
    date: i64,
    category: i32,
    measures: Vec<MeasureResponse>,
}

#[derive(Debug, Deserialize)]
struct MeasureResponse {
    value: i64,
    #[serde(rename = "type")]
    measure_type: i32,
    unit: i32,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    #[serde(flatten)]
    token: TokenRefreshResponse,
    #[serde(default)]
    userid: Option<serde_json::Value>,
}

fn is_truthy(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Bool(b)) => *b,
        Some(serde_json::Value::Number(n)) => n.as_i64().is_some_and(|n| n != 0),
        _ => false,
    }
}

/// Withings API client
pub struct WithingsProvider {
    config: ProviderConfig,
    client: Client,
}

impl WithingsProvider {
    /// Create a new Withings provider with default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ProviderConfig {
            name: providers::WITHINGS.to_owned(),
            auth_url: "https://account.withings.com/oauth2_user/authorize2".to_owned(),
            token_url: "https://wbsapi.withings.net/v2/oauth2".to_owned(),
            api_base_url: "https://wbsapi.withings.net".to_owned(),
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

    /// Provider configuration
    #[must_use]
    pub const fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Classify a non-zero envelope status
    fn status_error(status: i64, message: Option<String>) -> ProviderError {
        let message = message.unwrap_or_else(|| format!("status {status}"));
        if status::AUTH_FAILED.contains(&status) {
            ProviderError::unauthorized(providers::WITHINGS, message)
        } else if status == status::TOO_MANY_REQUESTS {
            ProviderError::RateLimited {
                provider: providers::WITHINGS.to_owned(),
                retry_after_secs: None,
            }
        } else if status == status::TIMEOUT {
            ProviderError::Timeout {
                provider: providers::WITHINGS.to_owned(),
            }
        } else {
            ProviderError::api(
                providers::WITHINGS,
                u32::try_from(status).unwrap_or(u32::MAX),
                message,
            )
        }
    }

    async fn post_envelope<T: DeserializeOwned>(
        &self,
        url: &str,
        access_token: Option<&str>,
        form: &[(&str, String)],
    ) -> ProviderResult<Envelope<T>> {
        let mut request = self.client.post(url).form(form);
        if let Some(token) = access_token {
            request = request.bearer_auth(token);
        }
        let response = request
            .send()
            .await
            .map_err(|e| transport_error(providers::WITHINGS, &e))?;
        let response = check_status(providers::WITHINGS, response).await?;
        response
            .json()
            .await
            .map_err(|e| ProviderError::parse(providers::WITHINGS, e.to_string()))
    }
}

impl Default for WithingsProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MeasurementSource for WithingsProvider {
    fn name(&self) -> &'static str {
        providers::WITHINGS
    }

    async fn measure_groups(
        &self,
        access_token: &str,
        since: DateTime<Utc>,
        measure_types: &[i32],
    ) -> ProviderResult<Vec<RawMeasureGroup>> {
        let url = format!("{}/measure", self.config.api_base_url);
        let meastypes = measure_types
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");

        let mut groups = Vec::new();
        let mut offset: Option<i64> = None;
        loop {
            let mut form = vec![
                ("action", "getmeas".to_owned()),
                ("meastypes", meastypes.clone()),
                ("category", CATEGORY_REAL.to_string()),
                ("lastupdate", since.timestamp().to_string()),
            ];
            if let Some(offset) = offset {
                form.push(("offset", offset.to_string()));
            }

            let envelope: Envelope<MeasureBody> =
                self.post_envelope(&url, Some(access_token), &form).await?;
            if envelope.status != status::SUCCESS {
                return Err(Self::status_error(envelope.status, envelope.error));
            }
            let body = envelope.body.ok_or_else(|| {
                ProviderError::parse(providers::WITHINGS, "successful response without body")
            })?;

            for group in body.measuregrps {
                let Some(timestamp) = DateTime::from_timestamp(group.date, 0) else {
                    warn!(group_id = group.grpid, date = group.date, "Skipping group with invalid date");
                    continue;
                };
                groups.push(RawMeasureGroup {
                    group_id: group.grpid,
                    timestamp,
                    category: group.category,
                    measures: group
                        .measures
                        .into_iter()
                        .map(|m| RawMeasure {
                            measure_type: m.measure_type,
                            value: m.value,
                            unit: m.unit,
                        })
                        .collect(),
                });
            }

            match body.offset {
                Some(next) if is_truthy(body.more.as_ref()) && Some(next) != offset => {
                    debug!(offset = next, "Fetching next page of measure groups");
                    offset = Some(next);
                }
                _ => break,
            }
        }

        info!(
            provider = providers::WITHINGS,
            groups = groups.len(),
            since = %since,
            "Received measure groups"
        );
        Ok(groups)
    }
}

#[async_trait]
impl TokenRefresher for WithingsProvider {
    fn name(&self) -> &'static str {
        providers::WITHINGS
    }

    async fn refresh(&self, credentials: &Credentials) -> ProviderResult<Credentials> {
        info!(provider = providers::WITHINGS, "Refreshing access token");
        let form = [
            ("action", "requesttoken".to_owned()),
            ("grant_type", "refresh_token".to_owned()),
            ("client_id", credentials.client_id.clone()),
            ("client_secret", credentials.client_secret.clone()),
            ("refresh_token", credentials.refresh_token.clone()),
        ];

        let envelope: Envelope<TokenBody> =
            self.post_envelope(&self.config.token_url, None, &form).await?;
        if envelope.status != status::SUCCESS {
            // Throttling and timeouts are transient; every other refusal means
            // the refresh token is no longer usable.
            return Err(match Self::status_error(envelope.status, envelope.error) {
                transient @ (ProviderError::RateLimited { .. } | ProviderError::Timeout { .. }) => {
                    transient
                }
                other => ProviderError::reauthorization_required(providers::WITHINGS, other.to_string()),
            });
        }
        let body = envelope.body.ok_or_else(|| {
            ProviderError::parse(providers::WITHINGS, "token response without body")
        })?;

        let mut refreshed = body.token.into_credentials(credentials);
        if let Some(userid) = body.userid {
            let userid = match userid {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            };
            refreshed.extra.insert("userid".to_owned(), userid);
        }
        Ok(refreshed)
    }
}
