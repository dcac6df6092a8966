// ABOUTME: OAuth2 refresh-token grant shared by form-based token endpoints
// ABOUTME: Separates rejected refresh tokens from transient token endpoint failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::http_client::transport_error;
use chrono::{DateTime, Duration, Utc};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use sportsync_core::errors::{ProviderError, ProviderResult};
use sportsync_core::models::Credentials;
use tracing::{debug, info};

/// Standard token refresh response structure
#[derive(Debug, Deserialize)]
pub struct TokenRefreshResponse {
    /// New access token
    pub access_token: String,
    /// Rotated refresh token, when the provider rotates
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Token type
    #[serde(default)]
    pub token_type: Option<String>,
    /// Lifetime in seconds
    #[serde(default)]
    pub expires_in: Option<i64>,
    /// Absolute expiry as a Unix timestamp
    #[serde(default)]
    pub expires_at: Option<i64>,
}

impl TokenRefreshResponse {
    /// Absolute expiry, preferring the provider's absolute timestamp
    #[must_use]
    pub fn expiry(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.expires_at
            .and_then(|ts| DateTime::from_timestamp(ts, 0))
            .or_else(|| self.expires_in.map(|secs| now + Duration::seconds(secs)))
    }

    /// Apply this response to the credentials it refreshed
    #[must_use]
    pub fn into_credentials(self, previous: &Credentials) -> Credentials {
        let expires_at = self.expiry(Utc::now());
        previous.refreshed(
            self.access_token,
            self.refresh_token,
            self.token_type,
            expires_at,
        )
    }
}

/// Refresh `OAuth2` credentials with a `refresh_token` grant
///
/// # Errors
///
/// - `ReauthorizationRequired` when the token endpoint answers 400 or 401
///   (invalid or revoked refresh token)
/// - `RateLimited`, `Api`, `Network`, `Timeout` for transient failures
pub async fn refresh_with_form(
    client: &Client,
    token_url: &str,
    provider: &str,
    credentials: &Credentials,
) -> ProviderResult<Credentials> {
    info!(provider, "Refreshing access token");

    let params = [
        ("client_id", credentials.client_id.as_str()),
        ("client_secret", credentials.client_secret.as_str()),
        ("grant_type", "refresh_token"),
        ("refresh_token", credentials.refresh_token.as_str()),
    ];

    let response = client
        .post(token_url)
        .form(&params)
        .send()
        .await
        .map_err(|e| transport_error(provider, &e))?;

    let status = response.status();
    if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::reauthorization_required(provider, body));
    }
    if status == StatusCode::TOO_MANY_REQUESTS {
        return Err(ProviderError::RateLimited {
            provider: provider.to_owned(),
            retry_after_secs: None,
        });
    }
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(ProviderError::api(provider, u32::from(status.as_u16()), body));
    }

    let token: TokenRefreshResponse = response
        .json()
        .await
        .map_err(|e| ProviderError::parse(provider, e.to_string()))?;
    debug!(provider, expires_at = ?token.expiry(Utc::now()), "Token refreshed");

    Ok(token.into_credentials(credentials))
}
