// ABOUTME: Wires the production providers, destinations and state file into an orchestrator
// ABOUTME: Registers credential persistence so every token refresh lands in the state file
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::config::SyncConfig;
use crate::credentials::CredentialStore;
use crate::destinations::{GarminWeightDestination, StravaActivityDestination, StravaWeightDestination};
use crate::errors::SyncResult;
use crate::fetcher::IncrementalFetcher;
use crate::fit::FitWeightEncoder;
use crate::notifications::{LogNotifier, Notifier};
use crate::orchestrator::Orchestrator;
use crate::state::StateManager;
use sportsync_core::constants::providers;
use sportsync_providers::{
    initialize_shared_client, GarminProvider, StravaProvider, UploadPolling, WithingsProvider,
};
use std::sync::Arc;
use tracing::debug;

/// Persist every refresh of `provider_names` through `state`
pub fn persist_refreshes(
    store: &mut CredentialStore,
    state: &Arc<StateManager>,
    provider_names: &[&str],
) {
    for &provider in provider_names {
        let state = Arc::clone(state);
        store.on_refresh(provider, move |name, credentials| {
            state
                .update(|s| {
                    s.credentials.insert(name.to_owned(), credentials.clone());
                })
                .map(|_| debug!(provider = name, "Persisted refreshed credentials"))
        });
    }
}

/// Build an orchestrator talking to Withings, Garmin Connect and Strava
///
/// # Errors
///
/// Returns `SyncError::State` if the state file cannot be read
pub fn build_orchestrator(config: &SyncConfig) -> SyncResult<Orchestrator> {
    build_orchestrator_with_notifier(config, Arc::new(LogNotifier))
}

/// Same as [`build_orchestrator`] with a custom notifier
///
/// # Errors
///
/// Returns `SyncError::State` if the state file cannot be read
pub fn build_orchestrator_with_notifier(
    config: &SyncConfig,
    notifier: Arc<dyn Notifier>,
) -> SyncResult<Orchestrator> {
    initialize_shared_client(config.http_timeout_secs, config.http_connect_timeout_secs);

    let state = Arc::new(StateManager::open(config.state_file.clone())?);
    let withings = Arc::new(WithingsProvider::new());
    let garmin = Arc::new(GarminProvider::new());
    let strava = Arc::new(StravaProvider::new().with_upload_polling(UploadPolling {
        attempts: config.upload_poll_attempts,
        interval: config.upload_poll_interval,
    }));

    let mut store = CredentialStore::new(state.load()?.credentials)
        .with_refresher(withings.clone())
        .with_refresher(garmin.clone())
        .with_refresher(strava.clone());
    persist_refreshes(
        &mut store,
        &state,
        &[providers::WITHINGS, providers::GARMIN, providers::STRAVA],
    );
    let credentials = Arc::new(store);

    let fetcher = IncrementalFetcher::new(Arc::clone(&credentials), withings, garmin.clone());

    Ok(Orchestrator::new(
        config,
        state,
        Arc::clone(&credentials),
        fetcher,
        notifier,
    )
    .with_activity_destination(Arc::new(StravaActivityDestination::new(
        strava.clone(),
        Arc::clone(&credentials),
        config.strava_upload_types.clone(),
    )))
    .with_measurement_destination(Arc::new(GarminWeightDestination::new(
        garmin,
        Arc::new(FitWeightEncoder::default()),
        Arc::clone(&credentials),
    )))
    .with_measurement_destination(Arc::new(StravaWeightDestination::new(strava, credentials))))
}
