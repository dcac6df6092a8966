// ABOUTME: Shared fakes and harness for sync engine integration tests
// ABOUTME: In-memory scale, tracker and social providers with failure switches
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(dead_code)]

pub mod fakes;

use chrono::{DateTime, Duration, Utc};
use fakes::{FakeScale, FakeSocial, FakeTracker};
use sportsync::bootstrap::persist_refreshes;
use sportsync::constants::providers;
use sportsync::credentials::CredentialStore;
use sportsync::destinations::{
    GarminWeightDestination, StravaActivityDestination, StravaWeightDestination,
};
use sportsync::fetcher::IncrementalFetcher;
use sportsync::fit::{FitWeightEncoder, WeightFileEncoder};
use sportsync::models::{Credentials, SyncKind, Watermarks};
use sportsync::notifications::RecordingNotifier;
use sportsync::{Orchestrator, RunOptions, RunReport, StateManager, SyncConfig, SyncState};
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Credentials that never expire, keyed by provider
pub fn credentials(access_token: &str) -> Credentials {
    Credentials {
        access_token: access_token.to_owned(),
        refresh_token: format!("{access_token}-refresh"),
        token_type: "Bearer".to_owned(),
        expires_at: None,
        client_id: "client".to_owned(),
        client_secret: "secret".to_owned(),
        extra: BTreeMap::new(),
    }
}

/// State with valid credentials for every provider and the given watermarks
pub fn seeded_state(watermarks: Watermarks) -> SyncState {
    SyncState {
        watermarks,
        credentials: [providers::WITHINGS, providers::GARMIN, providers::STRAVA]
            .into_iter()
            .map(|p| (p.to_owned(), credentials(&format!("{p}-token"))))
            .collect(),
    }
}

/// Instant `days` before now, truncated to whole seconds
pub fn days_ago(days: i64) -> DateTime<Utc> {
    let at = Utc::now() - Duration::days(days);
    DateTime::from_timestamp(at.timestamp(), 0).unwrap()
}

/// Instant `hours` before now, truncated to whole seconds
pub fn hours_ago(hours: i64) -> DateTime<Utc> {
    let at = Utc::now() - Duration::hours(hours);
    DateTime::from_timestamp(at.timestamp(), 0).unwrap()
}

/// Orchestrator over in-memory providers and a temporary state file
pub struct Harness {
    pub dir: TempDir,
    pub state_file: PathBuf,
    pub scale: Arc<FakeScale>,
    pub tracker: Arc<FakeTracker>,
    pub social: Arc<FakeSocial>,
    pub notifier: Arc<RecordingNotifier>,
    pub config: SyncConfig,
    encoder: Arc<dyn WeightFileEncoder>,
}

impl Harness {
    /// Harness whose state file starts as `initial`
    pub fn new(initial: SyncState) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let state_file = dir.path().join("sportsync.yml");
        StateManager::open(state_file.clone())
            .unwrap()
            .commit(initial)
            .unwrap();

        let config = SyncConfig {
            upload_poll_attempts: 0,
            destination_timeout: std::time::Duration::from_secs(5),
            ..SyncConfig::default()
        }
        .with_state_file(state_file.clone());

        Self {
            dir,
            state_file,
            scale: Arc::new(FakeScale::default()),
            tracker: Arc::new(FakeTracker::default()),
            social: Arc::new(FakeSocial::default()),
            notifier: Arc::new(RecordingNotifier::new()),
            config,
            encoder: Arc::new(FitWeightEncoder::default()),
        }
    }

    /// Harness with fresh credentials and epoch watermarks
    pub fn fresh() -> Self {
        Self::new(seeded_state(Watermarks::default()))
    }

    /// Replace the weight file encoder
    pub fn with_encoder(mut self, encoder: Arc<dyn WeightFileEncoder>) -> Self {
        self.encoder = encoder;
        self
    }

    /// Build an orchestrator reading the state file as it is now, the way a
    /// new process would
    pub fn orchestrator(&self) -> Orchestrator {
        let state = Arc::new(StateManager::open(self.state_file.clone()).unwrap());
        let mut store = CredentialStore::new(state.load().unwrap().credentials)
            .with_refresher(self.scale.clone())
            .with_refresher(self.tracker.clone())
            .with_refresher(self.social.clone());
        persist_refreshes(
            &mut store,
            &state,
            &[providers::WITHINGS, providers::GARMIN, providers::STRAVA],
        );
        let credentials = Arc::new(store);
        let fetcher = IncrementalFetcher::new(
            Arc::clone(&credentials),
            self.scale.clone(),
            self.tracker.clone(),
        );
        let upload_types: BTreeSet<String> = ["running", "cycling"]
            .into_iter()
            .map(str::to_owned)
            .collect();

        Orchestrator::new(
            &self.config,
            state,
            Arc::clone(&credentials),
            fetcher,
            self.notifier.clone(),
        )
        .with_activity_destination(Arc::new(StravaActivityDestination::new(
            self.social.clone(),
            Arc::clone(&credentials),
            upload_types,
        )))
        .with_measurement_destination(Arc::new(GarminWeightDestination::new(
            self.tracker.clone(),
            Arc::clone(&self.encoder),
            Arc::clone(&credentials),
        )))
        .with_measurement_destination(Arc::new(StravaWeightDestination::new(
            self.social.clone(),
            credentials,
        )))
    }

    /// Run every kind once in a new orchestrator
    pub async fn run(&self, force: bool) -> RunReport {
        self.orchestrator()
            .run(&RunOptions {
                force,
                kinds: SyncKind::ALL.to_vec(),
            })
            .await
    }

    /// State file contents as a new process would read them
    pub fn persisted(&self) -> SyncState {
        StateManager::open(self.state_file.clone())
            .unwrap()
            .load()
            .unwrap()
    }
}
