// ABOUTME: Credential store holding per-provider OAuth2 tokens for the duration of a run
// ABOUTME: Refreshes expired or rejected tokens and persists every refresh before returning it
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! # Credential Store
//!
//! Tokens are immutable [`Credentials`] values; a refresh swaps the stored
//! value for a new one. Callbacks registered with
//! [`CredentialStore::on_refresh`] run with the new token before it is handed
//! to any caller, so a freshly minted token is on disk before it is used.
//!
//! Refreshes for one provider are serialized. When two callers see the same
//! rejected token, the second one picks up the token the first one minted
//! instead of spending the refresh token again.

use crate::errors::{ProviderError, ProviderResult, SyncError, SyncResult};
use crate::models::Credentials;
use sportsync_providers::TokenRefresher;
use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Callback invoked with the provider name and newly issued credentials
pub type RefreshCallback = Arc<dyn Fn(&str, &Credentials) -> SyncResult<()> + Send + Sync>;

/// Which boundary a provider call sits on, deciding how its errors are classified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallSite<'a> {
    /// Retrieving records from a source provider
    Fetch,
    /// Delivering records to a destination
    Dispatch {
        /// Destination name
        destination: &'a str,
    },
}

impl CallSite<'_> {
    /// Classify a provider error at this boundary
    #[must_use]
    pub fn classify(self, error: ProviderError) -> SyncError {
        match self {
            Self::Fetch => error.into_fetch_error(),
            Self::Dispatch { destination } => error.into_dispatch_error(destination),
        }
    }
}

/// In-memory credentials for every configured provider
pub struct CredentialStore {
    credentials: Mutex<BTreeMap<String, Credentials>>,
    refreshers: HashMap<&'static str, Arc<dyn TokenRefresher>>,
    callbacks: Vec<(String, RefreshCallback)>,
}

impl CredentialStore {
    /// Create a store seeded with persisted credentials
    #[must_use]
    pub fn new(credentials: BTreeMap<String, Credentials>) -> Self {
        Self {
            credentials: Mutex::new(credentials),
            refreshers: HashMap::new(),
            callbacks: Vec::new(),
        }
    }

    /// Register the token refresher for the provider it names
    #[must_use]
    pub fn with_refresher(mut self, refresher: Arc<dyn TokenRefresher>) -> Self {
        self.refreshers.insert(refresher.name(), refresher);
        self
    }

    /// Register a callback run after every refresh of `provider`
    pub fn on_refresh<F>(&mut self, provider: impl Into<String>, callback: F)
    where
        F: Fn(&str, &Credentials) -> SyncResult<()> + Send + Sync + 'static,
    {
        self.callbacks.push((provider.into(), Arc::new(callback)));
    }

    /// Current credentials for `provider`, without refreshing
    ///
    /// # Errors
    ///
    /// Returns `SyncError::AuthExpired` if the provider was never authorized
    pub async fn get(&self, provider: &str) -> SyncResult<Credentials> {
        self.credentials
            .lock()
            .await
            .get(provider)
            .cloned()
            .ok_or_else(|| not_authorized(provider))
    }

    /// Credentials for `provider`, refreshed first if the access token expired
    ///
    /// # Errors
    ///
    /// See [`CredentialStore::refresh`]
    pub async fn valid(&self, provider: &str, site: CallSite<'_>) -> SyncResult<Credentials> {
        let current = self.get(provider).await?;
        if current.is_expired() {
            debug!(provider, expires_at = ?current.expires_at, "Access token expired");
            return self
                .refresh_from(provider, Some(&current.access_token), site)
                .await;
        }
        Ok(current)
    }

    /// Force a refresh of `provider`'s credentials
    ///
    /// # Errors
    ///
    /// - `AuthExpired` when the refresh token itself is rejected
    /// - `Fetch` for transient token endpoint failures
    /// - `State` when the new token could not be persisted
    /// - `Config` when no refresher is registered for the provider
    pub async fn refresh(&self, provider: &str) -> SyncResult<Credentials> {
        self.refresh_from(provider, None, CallSite::Fetch).await
    }

    /// Run `call` with a valid access token, refreshing once and retrying if
    /// the provider rejects the token
    ///
    /// # Errors
    ///
    /// Returns the classified provider error at `site`, or a refresh failure
    pub async fn call_with_refresh<T, F, Fut>(
        &self,
        provider: &str,
        site: CallSite<'_>,
        mut call: F,
    ) -> SyncResult<T>
    where
        F: FnMut(String) -> Fut + Send,
        Fut: Future<Output = ProviderResult<T>> + Send,
    {
        let credentials = self.valid(provider, site).await?;
        let stale_token = credentials.access_token.clone();
        match call(credentials.access_token).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_unauthorized() => {
                warn!(provider, error = %e, "Access token rejected, refreshing and retrying once");
                let fresh = self.refresh_from(provider, Some(&stale_token), site).await?;
                call(fresh.access_token)
                    .await
                    .map_err(|e| site.classify(e))
            }
            Err(e) => Err(site.classify(e)),
        }
    }

    /// Copy of every provider's current credentials
    pub async fn snapshot(&self) -> BTreeMap<String, Credentials> {
        self.credentials.lock().await.clone()
    }

    /// Refresh `provider`, skipping the exchange if the stored token already
    /// differs from `stale_token`
    async fn refresh_from(
        &self,
        provider: &str,
        stale_token: Option<&str>,
        site: CallSite<'_>,
    ) -> SyncResult<Credentials> {
        let refresher = self.refreshers.get(provider).ok_or_else(|| {
            SyncError::config(format!("no token refresher registered for {provider}"))
        })?;

        let mut credentials = self.credentials.lock().await;
        let current = credentials
            .get(provider)
            .cloned()
            .ok_or_else(|| not_authorized(provider))?;

        if stale_token.is_some_and(|stale| stale != current.access_token) {
            debug!(provider, "Token already refreshed by a concurrent call");
            return Ok(current);
        }

        let fresh = refresher
            .refresh(&current)
            .await
            .map_err(|e| site.classify(e))?;
        credentials.insert(provider.to_owned(), fresh.clone());

        // Persist while still holding the lock so no caller sees an unsaved token
        for (_, callback) in self.callbacks.iter().filter(|(p, _)| p == provider) {
            callback(provider, &fresh)?;
        }
        drop(credentials);

        info!(provider, expires_at = ?fresh.expires_at, "Access token refreshed");
        Ok(fresh)
    }
}

fn not_authorized(provider: &str) -> SyncError {
    SyncError::AuthExpired {
        provider: provider.to_owned(),
        reason: "no stored credentials; run the authorization flow".to_owned(),
    }
}
