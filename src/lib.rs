// ABOUTME: Incremental sync engine for scale measurements and tracker activities
// ABOUTME: Credential store, fetcher, metrics, FIT encoder, dispatcher, state manager and orchestrator
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

#![deny(unsafe_code)]

//! # SportSync
//!
//! Pushes new body-composition measurements from a smart scale to a fitness
//! tracker and a social fitness platform, and new tracker activities to the
//! social platform. Each run fetches only what is newer than the persisted
//! watermark, delivers it to every destination independently, and moves the
//! watermark only after every destination accepted the batch.
//!
//! ## Modules
//!
//! - **credentials**: token store with refresh-on-expiry and refresh persistence
//! - **fetcher**: canonical records newer than a bound
//! - **metrics**: height attachment, BMI and trailing-window mean weight
//! - **fit**: FIT weight file encoder
//! - **dispatcher** / **destinations**: independent per-destination delivery
//! - **state**: atomic state file
//! - **orchestrator**: per-kind state machine and fault isolation

// Re-export sportsync-core modules
pub use sportsync_core::constants;
pub use sportsync_core::errors;
pub use sportsync_core::models;

/// Production wiring
pub mod bootstrap;
/// Environment configuration
pub mod config;
/// Credential store
pub mod credentials;
/// Concrete destinations
pub mod destinations;
/// Concurrent per-destination dispatch
pub mod dispatcher;
/// Incremental fetcher
pub mod fetcher;
/// FIT weight file encoder
pub mod fit;
/// Logging setup
pub mod logging;
/// Derived metrics
pub mod metrics;
/// Operator notifications
pub mod notifications;
/// Run orchestrator
pub mod orchestrator;
/// Persisted sync state
pub mod state;

pub use config::SyncConfig;
pub use orchestrator::{Orchestrator, RunOptions, RunReport, SyncOutcome, SyncPhase};
pub use state::{StateManager, SyncState};
