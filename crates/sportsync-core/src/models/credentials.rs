// ABOUTME: OAuth2 token material persisted per provider in the sync state file
// ABOUTME: Immutable values; a refresh produces a new Credentials instead of mutating
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Seconds before the recorded expiry at which a token is treated as expired
pub const EXPIRY_SKEW_SECS: i64 = 300;

fn default_token_type() -> String {
    "Bearer".to_owned()
}

/// `OAuth2` credentials for one provider
///
/// Created out-of-band by the consent flow and refreshed by the credential
/// store. Provider-specific identifiers (user id, redirect URI) live in `extra`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    /// Current access token
    pub access_token: String,
    /// Refresh token used to mint the next access token
    pub refresh_token: String,
    /// Token type, usually `Bearer`
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Expiry of the access token; `None` means unknown and treated as valid
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    /// OAuth client id
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Provider-specific identifiers
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl Credentials {
    /// Whether the access token is expired (or about to be) at `now`
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_some_and(|expires_at| now + Duration::seconds(EXPIRY_SKEW_SECS) >= expires_at)
    }

    /// Whether the access token is expired (or about to be) right now
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Derive the credentials issued by a refresh
    ///
    /// Providers that do not rotate refresh tokens omit one in the response;
    /// the previous refresh token is kept in that case.
    #[must_use]
    pub fn refreshed(
        &self,
        access_token: String,
        refresh_token: Option<String>,
        token_type: Option<String>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            access_token,
            refresh_token: refresh_token.unwrap_or_else(|| self.refresh_token.clone()),
            token_type: token_type.unwrap_or_else(|| self.token_type.clone()),
            expires_at,
            client_id: self.client_id.clone(),
            client_secret: self.client_secret.clone(),
            extra: self.extra.clone(),
        }
    }

    /// Look up a provider-specific identifier
    #[must_use]
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extra.get(key).map(String::as_str)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_token", &"[REDACTED]")
            .field("refresh_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_at", &self.expires_at)
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("extra", &self.extra)
            .finish()
    }
}
