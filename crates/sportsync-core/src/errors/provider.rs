// ABOUTME: Transport-level error type returned by every provider API call
// ABOUTME: Maps into the sync taxonomy only at the fetch and dispatch boundaries
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! # Provider Errors
//!
//! `ProviderError` describes *how* a remote call failed (network, status code,
//! parse failure). It carries no opinion about what the failure
//! means for a sync run; that translation happens exactly once, through
//! [`ProviderError::into_fetch_error`] or [`ProviderError::into_dispatch_error`].

use super::SyncError;
use thiserror::Error;

/// Result alias for provider calls
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Failure of a single provider API call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProviderError {
    /// The request never produced a response (DNS, TLS, connection reset)
    #[error("{provider} network error: {message}")]
    Network {
        /// Provider name
        provider: String,
        /// Underlying transport message
        message: String,
    },

    /// The request exceeded its deadline
    #[error("{provider} request timed out")]
    Timeout {
        /// Provider name
        provider: String,
    },

    /// The access token was rejected; a refresh may fix this
    #[error("{provider} rejected the access token: {message}")]
    Unauthorized {
        /// Provider name
        provider: String,
        /// Provider-supplied reason
        message: String,
    },

    /// The refresh token itself was rejected; only a new consent can fix this
    #[error("{provider} requires re-authorization: {message}")]
    ReauthorizationRequired {
        /// Provider name
        provider: String,
        /// Provider-supplied reason
        message: String,
    },

    /// The provider throttled the request
    #[error("{provider} rate limit exceeded")]
    RateLimited {
        /// Provider name
        provider: String,
        /// Seconds until the provider accepts requests again, when known
        retry_after_secs: Option<u64>,
    },

    /// Non-success status from the provider API
    #[error("{provider} API error (status {status}): {message}")]
    Api {
        /// Provider name
        provider: String,
        /// HTTP status or provider status code
        status: u32,
        /// Response body or provider message
        message: String,
    },

    /// The response could not be decoded into the expected shape
    #[error("{provider} returned an unparseable response: {message}")]
    Parse {
        /// Provider name
        provider: String,
        /// Decoder message
        message: String,
    },

    /// An uploaded file was processed and refused by the provider
    #[error("{provider} rejected the upload: {message}")]
    UploadRejected {
        /// Provider name
        provider: String,
        /// Provider-supplied reason
        message: String,
    },
}

impl ProviderError {
    /// Create a network error
    #[must_use]
    pub fn network(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Network {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an API status error
    #[must_use]
    pub fn api(provider: impl Into<String>, status: u32, message: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a parse error
    #[must_use]
    pub fn parse(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Parse {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create an unauthorized error
    #[must_use]
    pub fn unauthorized(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Unauthorized {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Create a re-authorization error
    #[must_use]
    pub fn reauthorization_required(
        provider: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::ReauthorizationRequired {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Name of the provider that produced this error
    #[must_use]
    pub fn provider(&self) -> &str {
        match self {
            Self::Network { provider, .. }
            | Self::Timeout { provider }
            | Self::Unauthorized { provider, .. }
            | Self::ReauthorizationRequired { provider, .. }
            | Self::RateLimited { provider, .. }
            | Self::Api { provider, .. }
            | Self::Parse { provider, .. }
            | Self::UploadRejected { provider, .. } => provider,
        }
    }

    /// Whether refreshing the access token and retrying could succeed
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Map into the sync taxonomy at the fetch boundary
    #[must_use]
    pub fn into_fetch_error(self) -> SyncError {
        match self {
            Self::ReauthorizationRequired { provider, message } => SyncError::AuthExpired {
                provider,
                reason: message,
            },
            other => SyncError::Fetch {
                provider: other.provider().to_owned(),
                reason: other.to_string(),
            },
        }
    }

    /// Map into the sync taxonomy at the dispatch boundary
    #[must_use]
    pub fn into_dispatch_error(self, destination: &str) -> SyncError {
        match self {
            Self::ReauthorizationRequired { provider, message } => SyncError::AuthExpired {
                provider,
                reason: message,
            },
            other => SyncError::DispatchFailed {
                destination: destination.to_owned(),
                reason: other.to_string(),
            },
        }
    }
}
