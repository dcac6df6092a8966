// ABOUTME: Run orchestrator sequencing fetch, transform, dispatch and commit per sync kind
// ABOUTME: Isolates the activity and measurement syncs and alerts on every aborted kind
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! # Run Orchestrator
//!
//! Each sync kind walks the same state machine:
//!
//! ```text
//! Idle -> Fetching -> Transforming -> Dispatching -> Committing -> Idle
//!            |                            |              |
//!            +----------> Aborted <-------+--------------+
//! ```
//!
//! The watermark moves only in `Committing`, and only when no destination
//! reported a failure. A kind that finds nothing newer than its watermark
//! returns to `Idle` straight from `Fetching` unless the run is forced.
//! Failures are caught per kind; the other kind runs regardless.

use crate::config::SyncConfig;
use crate::credentials::CredentialStore;
use crate::destinations::MeasurementBatch;
use crate::dispatcher::{Destination, DispatchReport, Dispatcher};
use crate::errors::SyncError;
use crate::fetcher::IncrementalFetcher;
use crate::metrics::{attach_heights, trailing_mean};
use crate::models::{latest_timestamp, Activity, SyncKind};
use crate::notifications::{Notification, Notifier};
use crate::state::StateManager;
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// States of one sync kind's run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncPhase {
    /// Not running
    Idle,
    /// Retrieving records newer than the watermark
    Fetching,
    /// Computing derived metrics
    Transforming,
    /// Delivering to destinations
    Dispatching,
    /// Persisting the advanced watermark
    Committing,
    /// Stopped on failure; the watermark was not touched
    Aborted,
}

impl fmt::Display for SyncPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Fetching => "fetching",
            Self::Transforming => "transforming",
            Self::Dispatching => "dispatching",
            Self::Committing => "committing",
            Self::Aborted => "aborted",
        };
        f.write_str(name)
    }
}

/// How one sync kind ended
#[derive(Debug, Clone, PartialEq)]
pub enum SyncOutcome {
    /// Nothing newer than the watermark
    UpToDate,
    /// Records were delivered and the state committed
    Committed {
        /// Records dispatched
        records: usize,
        /// Watermark after the commit
        watermark: DateTime<Utc>,
    },
    /// The kind stopped without moving its watermark
    Aborted {
        /// Phase in which the failure happened
        phase: SyncPhase,
        /// Every failure that caused the abort
        errors: Vec<SyncError>,
    },
}

impl SyncOutcome {
    /// Whether the kind failed
    #[must_use]
    pub const fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted { .. })
    }
}

/// Options for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunOptions {
    /// Ignore the watermark within the look-back window and skip the
    /// no-new-data short-circuit
    pub force: bool,
    /// Kinds to run, in order
    pub kinds: Vec<SyncKind>,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            force: false,
            kinds: SyncKind::ALL.to_vec(),
        }
    }
}

/// Outcomes of one invocation
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    /// Outcome per executed kind
    pub outcomes: Vec<(SyncKind, SyncOutcome)>,
}

impl RunReport {
    /// Outcome of `kind`, if it ran
    #[must_use]
    pub fn outcome(&self, kind: SyncKind) -> Option<&SyncOutcome> {
        self.outcomes
            .iter()
            .find(|(k, _)| *k == kind)
            .map(|(_, outcome)| outcome)
    }

    /// Whether every executed kind was aborted
    #[must_use]
    pub fn all_failed(&self) -> bool {
        !self.outcomes.is_empty() && self.outcomes.iter().all(|(_, o)| o.is_aborted())
    }

    /// Process exit code: non-zero only when every executed kind failed
    #[must_use]
    pub fn exit_code(&self) -> u8 {
        u8::from(self.all_failed())
    }
}

/// Tracks and logs phase transitions of one kind
struct PhaseTracker {
    kind: SyncKind,
    phase: SyncPhase,
}

impl PhaseTracker {
    const fn new(kind: SyncKind) -> Self {
        Self {
            kind,
            phase: SyncPhase::Idle,
        }
    }

    fn enter(&mut self, next: SyncPhase) {
        debug!(kind = %self.kind, from = %self.phase, to = %next, "Sync phase transition");
        self.phase = next;
    }

    fn abort(&mut self, errors: Vec<SyncError>) -> SyncOutcome {
        let phase = self.phase;
        for e in &errors {
            error!(kind = %self.kind, phase = %phase, error = %e, "Sync failed");
        }
        self.enter(SyncPhase::Aborted);
        SyncOutcome::Aborted { phase, errors }
    }
}

/// Sequences both sync kinds over shared state, credentials and destinations
pub struct Orchestrator {
    state: Arc<StateManager>,
    credentials: Arc<CredentialStore>,
    fetcher: IncrementalFetcher,
    dispatcher: Dispatcher,
    activity_destinations: Vec<Arc<dyn Destination<[Activity]>>>,
    measurement_destinations: Vec<Arc<dyn Destination<MeasurementBatch>>>,
    notifier: Arc<dyn Notifier>,
    lookback: Duration,
    weight_window: Duration,
    fallback_height_m: Option<f64>,
}

impl Orchestrator {
    /// Create an orchestrator with no destinations
    #[must_use]
    pub fn new(
        config: &SyncConfig,
        state: Arc<StateManager>,
        credentials: Arc<CredentialStore>,
        fetcher: IncrementalFetcher,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            state,
            credentials,
            fetcher,
            dispatcher: Dispatcher::new(config.destination_timeout),
            activity_destinations: Vec::new(),
            measurement_destinations: Vec::new(),
            notifier,
            lookback: config.lookback,
            weight_window: config.weight_window,
            fallback_height_m: config.fallback_height_m,
        }
    }

    /// Add a destination for activity batches
    #[must_use]
    pub fn with_activity_destination(mut self, destination: Arc<dyn Destination<[Activity]>>) -> Self {
        self.activity_destinations.push(destination);
        self
    }

    /// Add a destination for measurement batches
    #[must_use]
    pub fn with_measurement_destination(
        mut self,
        destination: Arc<dyn Destination<MeasurementBatch>>,
    ) -> Self {
        self.measurement_destinations.push(destination);
        self
    }

    /// Run the requested kinds once
    pub async fn run(&self, options: &RunOptions) -> RunReport {
        let mut report = RunReport::default();
        for &kind in &options.kinds {
            if report.outcome(kind).is_some() {
                continue;
            }
            let outcome = match kind {
                SyncKind::Activities => self.sync_activities(options.force).await,
                SyncKind::Measurements => self.sync_measurements(options.force).await,
            };
            if let SyncOutcome::Aborted { errors, .. } = &outcome {
                self.send(Notification::alert(kind, errors)).await;
            }
            report.outcomes.push((kind, outcome));
        }

        for (kind, outcome) in &report.outcomes {
            info!(kind = %kind, outcome = ?outcome, "Sync kind finished");
        }
        report
    }

    /// Fetch lower bound: the watermark, never older than the look-back window
    fn lower_bound(&self, watermark: DateTime<Utc>, now: DateTime<Utc>, force: bool) -> DateTime<Utc> {
        let floor = now - self.lookback;
        if force {
            floor
        } else {
            watermark.max(floor)
        }
    }

    async fn sync_activities(&self, force: bool) -> SyncOutcome {
        let kind = SyncKind::Activities;
        let mut phase = PhaseTracker::new(kind);

        phase.enter(SyncPhase::Fetching);
        let watermark = match self.state.load() {
            Ok(state) => state.watermarks.get(kind),
            Err(e) => return phase.abort(vec![e]),
        };
        let since = self.lower_bound(watermark, Utc::now(), force);
        let activities = match self.fetcher.fetch_activities(since).await {
            Ok(activities) => activities,
            Err(e) => return phase.abort(vec![e]),
        };
        if activities.is_empty() && !force {
            info!(kind = %kind, watermark = %watermark, "No new activities");
            phase.enter(SyncPhase::Idle);
            return SyncOutcome::UpToDate;
        }

        phase.enter(SyncPhase::Transforming);
        phase.enter(SyncPhase::Dispatching);
        let report = self
            .dispatcher
            .dispatch(activities.as_slice(), &self.activity_destinations)
            .await;
        if !report.all_succeeded() {
            return phase.abort(failures(&report));
        }

        self.commit(&mut phase, latest_timestamp(&activities), activities.len())
            .await
    }

    async fn sync_measurements(&self, force: bool) -> SyncOutcome {
        let kind = SyncKind::Measurements;
        let mut phase = PhaseTracker::new(kind);

        phase.enter(SyncPhase::Fetching);
        let watermark = match self.state.load() {
            Ok(state) => state.watermarks.get(kind),
            Err(e) => return phase.abort(vec![e]),
        };
        let now = Utc::now();
        let since = self.lower_bound(watermark, now, force);
        // One fetch covers both the new records and the trailing window
        let fetch_since = since.min(now - self.weight_window);
        let mut measurements = match self.fetcher.fetch_measurements(fetch_since).await {
            Ok(measurements) => measurements,
            Err(e) => return phase.abort(vec![e]),
        };
        let new_records = measurements.iter().filter(|m| m.timestamp > since).count();
        if new_records == 0 && !force {
            info!(kind = %kind, watermark = %watermark, "No new measurements");
            phase.enter(SyncPhase::Idle);
            return SyncOutcome::UpToDate;
        }
        let heights = match self.fetcher.fetch_heights().await {
            Ok(heights) => heights,
            Err(e) => return phase.abort(vec![e]),
        };

        phase.enter(SyncPhase::Transforming);
        attach_heights(&mut measurements, &heights, self.fallback_height_m);
        let mean = trailing_mean(&measurements, now, self.weight_window);
        if let Some(mean) = mean {
            debug!(mean_kg = mean.mean_kg, count = mean.count, "Trailing weight mean");
        }
        let batch = MeasurementBatch {
            records: measurements
                .into_iter()
                .filter(|m| m.timestamp > since)
                .collect(),
            trailing_mean: mean,
        };

        phase.enter(SyncPhase::Dispatching);
        let report = self
            .dispatcher
            .dispatch(&batch, &self.measurement_destinations)
            .await;
        if !report.all_succeeded() {
            return phase.abort(failures(&report));
        }

        let outcome = self
            .commit(&mut phase, latest_timestamp(&batch.records), batch.records.len())
            .await;
        if !outcome.is_aborted() && !batch.records.is_empty() {
            self.send(Notification::measurement_summary(&batch.records))
                .await;
        }
        outcome
    }

    /// Advance the watermark to `newest` and persist credentials in one write
    async fn commit(
        &self,
        phase: &mut PhaseTracker,
        newest: Option<DateTime<Utc>>,
        records: usize,
    ) -> SyncOutcome {
        let kind = phase.kind;
        phase.enter(SyncPhase::Committing);
        let credentials = self.credentials.snapshot().await;

        let committed = self.state.update(|state| {
            if let Some(newest) = newest {
                state.watermarks.advance(kind, newest);
            }
            state.credentials.extend(credentials);
        });
        match committed {
            Ok(state) => {
                let watermark = state.watermarks.get(kind);
                info!(kind = %kind, records, watermark = %watermark, "Sync committed");
                phase.enter(SyncPhase::Idle);
                SyncOutcome::Committed { records, watermark }
            }
            Err(e) => phase.abort(vec![e]),
        }
    }

    async fn send(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            warn!(subject = %notification.subject, error = %e, "Notification failed");
        }
    }
}

fn failures(report: &DispatchReport) -> Vec<SyncError> {
    report.failures().map(|(_, error)| error.clone()).collect()
}

