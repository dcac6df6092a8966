// ABOUTME: Sync error taxonomy shared by the fetcher, dispatcher and orchestrator
// ABOUTME: Four canonical failure kinds plus state-file and configuration errors
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! # Unified Error Handling
//!
//! Every failure that crosses a component boundary is one of the variants of
//! [`SyncError`]. Provider-specific failures are first expressed as
//! [`provider::ProviderError`] and mapped into this taxonomy at the fetch or
//! dispatch boundary.
//!
//! | Variant          | Scope                       | Retry on next run |
//! |------------------|-----------------------------|-------------------|
//! | `AuthExpired`    | whole sync kind             | no (re-consent)   |
//! | `Fetch`          | whole sync kind             | yes               |
//! | `DispatchFailed` | one destination             | yes               |
//! | `EncodingFailed` | one destination             | yes               |
//! | `State`          | run (state file)            | yes               |
//! | `Config`         | process                     | no                |

/// Transport-level provider errors
pub mod provider;

use serde::Serialize;
use thiserror::Error;

pub use provider::{ProviderError, ProviderResult};

/// Result alias used throughout the sync engine
pub type SyncResult<T> = Result<T, SyncError>;

/// Canonical sync failure
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    /// The refresh token was rejected; a human must re-run the consent flow
    #[error("authorization for {provider} expired: {reason}")]
    AuthExpired {
        /// Provider whose refresh token is no longer valid
        provider: String,
        /// Provider-supplied reason
        reason: String,
    },

    /// Transient failure while retrieving records from a source provider
    #[error("fetch from {provider} failed: {reason}")]
    Fetch {
        /// Source provider
        provider: String,
        /// Failure detail
        reason: String,
    },

    /// A destination rejected or failed to accept a record batch
    #[error("dispatch to {destination} failed: {reason}")]
    DispatchFailed {
        /// Destination name
        destination: String,
        /// Failure detail
        reason: String,
    },

    /// The binary container for a destination could not be built
    #[error("encoding for {destination} failed: {reason}")]
    EncodingFailed {
        /// Destination name
        destination: String,
        /// Failure detail
        reason: String,
    },

    /// The persisted state file could not be read or written
    #[error("sync state error: {0}")]
    State(String),

    /// Invalid or missing configuration
    #[error("configuration error: {0}")]
    Config(String),
}

/// Stable machine-readable classification of a [`SyncError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    /// See [`SyncError::AuthExpired`]
    AuthExpired,
    /// See [`SyncError::Fetch`]
    Fetch,
    /// See [`SyncError::DispatchFailed`]
    DispatchFailed,
    /// See [`SyncError::EncodingFailed`]
    EncodingFailed,
    /// See [`SyncError::State`]
    State,
    /// See [`SyncError::Config`]
    Config,
}

impl SyncError {
    /// Create a state-file error
    #[must_use]
    pub fn state(message: impl Into<String>) -> Self {
        Self::State(message.into())
    }

    /// Create a configuration error
    #[must_use]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create an encoding error for a destination
    #[must_use]
    pub fn encoding(destination: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::EncodingFailed {
            destination: destination.into(),
            reason: reason.into(),
        }
    }

    /// Classification of this error
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::AuthExpired { .. } => ErrorKind::AuthExpired,
            Self::Fetch { .. } => ErrorKind::Fetch,
            Self::DispatchFailed { .. } => ErrorKind::DispatchFailed,
            Self::EncodingFailed { .. } => ErrorKind::EncodingFailed,
            Self::State(_) => ErrorKind::State,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    /// Whether re-running the sync without human intervention can succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        !matches!(self, Self::AuthExpired { .. } | Self::Config(_))
    }
}
