// ABOUTME: Shared HTTP client with connection pooling for provider API calls
// ABOUTME: Maps transport failures and HTTP statuses into ProviderError
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use reqwest::header::RETRY_AFTER;
use reqwest::{Client, ClientBuilder, Response, StatusCode};
use sportsync_core::constants::defaults;
use sportsync_core::errors::{ProviderError, ProviderResult};
use std::sync::OnceLock;
use std::time::Duration;

/// Configured timeout values for the shared client
static CLIENT_TIMEOUTS: OnceLock<(u64, u64)> = OnceLock::new();

/// Global shared HTTP client with configured timeouts
static SHARED_CLIENT: OnceLock<Client> = OnceLock::new();

/// Initialize the shared HTTP client timeout configuration
///
/// Must be called before any provider is constructed. If not called, the
/// defaults apply (30s timeout, 10s connect timeout).
pub fn initialize_shared_client(timeout_secs: u64, connect_timeout_secs: u64) {
    let _ = CLIENT_TIMEOUTS.set((timeout_secs, connect_timeout_secs));
}

/// Get the shared HTTP client for provider API calls
pub fn shared_client() -> &'static Client {
    SHARED_CLIENT.get_or_init(|| {
        let (timeout, connect_timeout) = CLIENT_TIMEOUTS.get().copied().unwrap_or((
            defaults::HTTP_TIMEOUT_SECS,
            defaults::HTTP_CONNECT_TIMEOUT_SECS,
        ));

        ClientBuilder::new()
            .timeout(Duration::from_secs(timeout))
            .connect_timeout(Duration::from_secs(connect_timeout))
            .user_agent(concat!("sportsync/", env!("CARGO_PKG_VERSION")))
            .build()
            .unwrap_or_else(|_| Client::new())
    })
}

/// Translate a reqwest transport error
#[must_use]
pub fn transport_error(provider: &str, error: &reqwest::Error) -> ProviderError {
    if error.is_timeout() {
        ProviderError::Timeout {
            provider: provider.to_owned(),
        }
    } else if error.is_decode() {
        ProviderError::parse(provider, error.to_string())
    } else {
        ProviderError::network(provider, error.to_string())
    }
}

/// Pass a successful response through, or classify the failure status
///
/// # Errors
///
/// `Unauthorized` for 401, `RateLimited` for 429, `Api` for any other
/// non-success status.
pub async fn check_status(provider: &str, response: Response) -> ProviderResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    if status == StatusCode::TOO_MANY_REQUESTS {
        let retry_after_secs = response
            .headers()
            .get(RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        return Err(ProviderError::RateLimited {
            provider: provider.to_owned(),
            retry_after_secs,
        });
    }

    let body = response.text().await.unwrap_or_default();
    if status == StatusCode::UNAUTHORIZED {
        return Err(ProviderError::unauthorized(provider, body));
    }
    Err(ProviderError::api(provider, u32::from(status.as_u16()), body))
}
