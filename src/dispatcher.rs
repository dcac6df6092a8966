// ABOUTME: Destination dispatcher delivering one record batch to every destination independently
// ABOUTME: Runs destinations concurrently under a deadline and collects one outcome per destination
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

//! # Destination Dispatch
//!
//! A [`Destination`] receives a borrowed batch and reports what it did with it.
//! [`Dispatcher::dispatch`] starts every destination at once, waits for all of
//! them, and returns a [`DispatchReport`]. A failure or timeout at one
//! destination never cancels or alters another destination's outcome.

use crate::errors::{SyncError, SyncResult};
use async_trait::async_trait;
use futures_util::future::join_all;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// What one destination did with a batch
#[derive(Debug, Clone, PartialEq)]
pub enum DeliveryOutcome {
    /// Records were durably accepted
    Delivered {
        /// Records accepted
        records: usize,
    },
    /// Nothing was sent, permanently and on purpose
    Skipped {
        /// Why the batch was skipped
        reason: String,
    },
    /// The destination did not accept the batch
    Failed {
        /// Failure detail
        error: SyncError,
    },
}

impl DeliveryOutcome {
    /// Delivered outcome
    #[must_use]
    pub const fn delivered(records: usize) -> Self {
        Self::Delivered { records }
    }

    /// Skipped outcome
    #[must_use]
    pub fn skipped(reason: impl Into<String>) -> Self {
        Self::Skipped {
            reason: reason.into(),
        }
    }

    /// Whether this outcome blocks the watermark
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

impl fmt::Display for DeliveryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Delivered { records } => write!(f, "delivered {records} record(s)"),
            Self::Skipped { reason } => write!(f, "skipped: {reason}"),
            Self::Failed { error } => write!(f, "failed: {error}"),
        }
    }
}

/// A platform that accepts batches of type `B`
///
/// Implementations return `Ok(Delivered | Skipped)` or an error; the
/// dispatcher records an error as [`DeliveryOutcome::Failed`].
#[async_trait]
pub trait Destination<B: ?Sized + Sync>: Send + Sync {
    /// Destination name used in logs and reports
    fn name(&self) -> &str;

    /// Deliver the whole batch
    async fn deliver(&self, batch: &B) -> SyncResult<DeliveryOutcome>;
}

/// Outcome of one destination
#[derive(Debug, Clone, PartialEq)]
pub struct DestinationResult {
    /// Destination name
    pub destination: String,
    /// What happened
    pub outcome: DeliveryOutcome,
}

/// Per-destination outcomes of one dispatch
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DispatchReport {
    /// One entry per destination, in configuration order
    pub results: Vec<DestinationResult>,
}

impl DispatchReport {
    /// Whether no destination failed
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        !self.results.iter().any(|r| r.outcome.is_failed())
    }

    /// Failed destinations and their errors
    pub fn failures(&self) -> impl Iterator<Item = (&str, &SyncError)> {
        self.results.iter().filter_map(|r| match &r.outcome {
            DeliveryOutcome::Failed { error } => Some((r.destination.as_str(), error)),
            _ => None,
        })
    }

    /// Outcome for a destination by name
    #[must_use]
    pub fn outcome(&self, destination: &str) -> Option<&DeliveryOutcome> {
        self.results
            .iter()
            .find(|r| r.destination == destination)
            .map(|r| &r.outcome)
    }
}

/// Delivers batches to destinations concurrently
#[derive(Debug, Clone, Copy)]
pub struct Dispatcher {
    timeout: Duration,
}

impl Dispatcher {
    /// Dispatcher giving each destination `timeout` to accept a batch
    #[must_use]
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    /// Deliver `batch` to every destination and wait for all of them
    pub async fn dispatch<B>(
        &self,
        batch: &B,
        destinations: &[Arc<dyn Destination<B>>],
    ) -> DispatchReport
    where
        B: ?Sized + Sync,
    {
        let deliveries = destinations.iter().map(|destination| async move {
            let name = destination.name().to_owned();
            let outcome = match tokio::time::timeout(self.timeout, destination.deliver(batch)).await
            {
                Ok(Ok(outcome)) => outcome,
                Ok(Err(error)) => DeliveryOutcome::Failed { error },
                Err(_) => DeliveryOutcome::Failed {
                    error: SyncError::DispatchFailed {
                        destination: name.clone(),
                        reason: format!("no result within {}s", self.timeout.as_secs()),
                    },
                },
            };

            if outcome.is_failed() {
                warn!(destination = %name, outcome = %outcome, "Destination failed");
            } else {
                info!(destination = %name, outcome = %outcome, "Destination finished");
            }
            DestinationResult {
                destination: name,
                outcome,
            }
        });

        DispatchReport {
            results: join_all(deliveries).await,
        }
    }
}
