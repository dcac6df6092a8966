// ABOUTME: End-to-end sync properties over in-memory providers and a real state file
// ABOUTME: Boundary exclusivity, idempotence, crash recovery and per-destination fault isolation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod helpers;

use helpers::fakes::BrokenEncoder;
use helpers::{days_ago, hours_ago, seeded_state, Harness};
use sportsync::errors::{ErrorKind, ProviderError};
use sportsync::models::{SyncKind, Watermarks};
use sportsync::notifications::Severity;
use sportsync::{SyncOutcome, SyncPhase};
use std::fs;
use std::sync::Arc;

fn committed_records(outcome: Option<&SyncOutcome>) -> usize {
    match outcome {
        Some(SyncOutcome::Committed { records, .. }) => *records,
        other => panic!("expected a committed outcome, got {other:?}"),
    }
}

#[tokio::test]
async fn test_record_at_watermark_is_not_redelivered() {
    let boundary = hours_ago(48);
    let after = hours_ago(47);
    let harness = Harness::new(seeded_state(Watermarks {
        last_activity_sync_ts: boundary,
        last_measurement_sync_ts: boundary,
    }));
    harness.scale.add_weight(boundary, 71_000, None);
    harness.scale.add_weight(after, 70_500, None);
    harness.tracker.add_activity("100", boundary, "running");
    harness.tracker.add_activity("101", after, "running");

    let report = harness.run(false).await;

    assert_eq!(committed_records(report.outcome(SyncKind::Measurements)), 1);
    assert_eq!(committed_records(report.outcome(SyncKind::Activities)), 1);
    assert_eq!(harness.social.uploaded(), vec!["101".to_owned()]);
    assert_eq!(harness.tracker.upload_count(), 1);

    let persisted = harness.persisted();
    assert_eq!(persisted.watermarks.last_measurement_sync_ts, after);
    assert_eq!(persisted.watermarks.last_activity_sync_ts, after);
}

#[tokio::test]
async fn test_second_run_without_new_data_changes_nothing() {
    let harness = Harness::fresh();
    harness.scale.add_weight(days_ago(2), 70_000, Some(200));
    harness.tracker.add_activity("7", days_ago(1), "cycling");

    let first = harness.run(false).await;
    assert_eq!(first.exit_code(), 0);
    let state_after_first = fs::read(&harness.state_file).unwrap();

    let second = harness.run(false).await;

    assert_eq!(
        second.outcome(SyncKind::Activities),
        Some(&SyncOutcome::UpToDate)
    );
    assert_eq!(
        second.outcome(SyncKind::Measurements),
        Some(&SyncOutcome::UpToDate)
    );
    assert_eq!(harness.social.uploaded().len(), 1);
    assert_eq!(harness.social.weights().len(), 1);
    assert_eq!(harness.tracker.upload_count(), 1);
    assert_eq!(fs::read(&harness.state_file).unwrap(), state_after_first);
}

#[tokio::test]
async fn test_crash_before_commit_redelivers_on_next_run() {
    let harness = Harness::fresh();
    let taken = days_ago(3);
    harness.scale.add_weight(taken, 72_000, None);
    harness.tracker.add_activity("55", taken, "running");
    let before = fs::read(&harness.state_file).unwrap();

    harness.run(false).await;
    // The process died after dispatching but before the state write landed
    fs::write(&harness.state_file, &before).unwrap();

    let report = harness.run(false).await;

    assert_eq!(committed_records(report.outcome(SyncKind::Activities)), 1);
    assert_eq!(committed_records(report.outcome(SyncKind::Measurements)), 1);
    assert_eq!(harness.social.uploaded(), vec!["55".to_owned(), "55".to_owned()]);
    assert_eq!(harness.tracker.upload_count(), 2);
    assert_eq!(harness.persisted().watermarks.last_measurement_sync_ts, taken);
}

#[tokio::test]
async fn test_failed_destination_blocks_watermark_and_both_retry() {
    let harness = Harness::fresh();
    let taken = days_ago(1);
    harness.scale.add_weight(taken, 80_000, None);
    *harness.social.fail_weight.lock().unwrap() =
        Some(ProviderError::api("strava", 503, "service unavailable"));

    let report = harness.run(false).await;

    match report.outcome(SyncKind::Measurements) {
        Some(SyncOutcome::Aborted { phase, errors }) => {
            assert_eq!(*phase, SyncPhase::Dispatching);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind(), ErrorKind::DispatchFailed);
        }
        other => panic!("expected abort, got {other:?}"),
    }
    // The other destination still received the batch
    assert_eq!(harness.tracker.upload_count(), 1);
    assert_eq!(
        harness.persisted().watermarks.last_measurement_sync_ts,
        Watermarks::default().last_measurement_sync_ts
    );
    assert_eq!(harness.notifier.alerts().len(), 1);

    *harness.social.fail_weight.lock().unwrap() = None;
    let retry = harness.run(false).await;

    assert_eq!(committed_records(retry.outcome(SyncKind::Measurements)), 1);
    assert_eq!(harness.tracker.upload_count(), 2);
    let weights = harness.social.weights();
    assert_eq!(weights.len(), 1);
    assert!((weights[0] - 80.0).abs() < 1e-9);
    assert_eq!(harness.persisted().watermarks.last_measurement_sync_ts, taken);
}

#[tokio::test]
async fn test_failed_activity_upload_blocks_activity_watermark_only() {
    let harness = Harness::fresh();
    let taken = days_ago(1);
    harness.tracker.add_activity("21", taken, "running");
    harness.scale.add_weight(taken, 80_000, None);
    *harness.social.fail_uploads.lock().unwrap() =
        Some(ProviderError::api("strava", 500, "upstream error"));

    let report = harness.run(false).await;

    match report.outcome(SyncKind::Activities) {
        Some(SyncOutcome::Aborted { phase, errors }) => {
            assert_eq!(*phase, SyncPhase::Dispatching);
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind(), ErrorKind::DispatchFailed);
        }
        other => panic!("expected abort, got {other:?}"),
    }
    assert_eq!(committed_records(report.outcome(SyncKind::Measurements)), 1);
    assert_eq!(report.exit_code(), 0);
    assert!(harness.social.uploaded().is_empty());

    let persisted = harness.persisted();
    assert_eq!(
        persisted.watermarks.last_activity_sync_ts,
        Watermarks::default().last_activity_sync_ts
    );
    assert_eq!(persisted.watermarks.last_measurement_sync_ts, taken);

    let alerts = harness.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, SyncKind::Activities);

    *harness.social.fail_uploads.lock().unwrap() = None;
    let retry = harness.run(false).await;

    assert_eq!(committed_records(retry.outcome(SyncKind::Activities)), 1);
    assert_eq!(harness.social.uploaded(), vec!["21".to_owned()]);
    assert_eq!(harness.persisted().watermarks.last_activity_sync_ts, taken);
    // Measurements were already committed and are not resent
    assert_eq!(harness.tracker.upload_count(), 1);
}

#[tokio::test]
async fn test_profile_weight_is_trailing_mean_of_window() {
    let harness = Harness::fresh();
    harness.scale.add_weight(days_ago(6), 70_000, None);
    harness.scale.add_weight(days_ago(4), 72_000, None);
    harness.scale.add_weight(days_ago(2), 68_000, None);
    // Outside the seven-day window: delivered to the tracker, not averaged
    harness.scale.add_weight(days_ago(10), 90_000, None);

    let report = harness.run(false).await;

    assert_eq!(committed_records(report.outcome(SyncKind::Measurements)), 4);
    let weights = harness.social.weights();
    assert_eq!(weights.len(), 1);
    assert!((weights[0] - 70.0).abs() < 1e-9);
}

#[tokio::test]
async fn test_empty_weight_window_skips_profile_update_and_commits() {
    let harness = Harness::fresh();
    harness.scale.add_weight(days_ago(12), 75_000, None);

    let report = harness.run(false).await;

    assert_eq!(committed_records(report.outcome(SyncKind::Measurements)), 1);
    assert!(harness.social.weights().is_empty());
    assert_eq!(harness.tracker.upload_count(), 1);
    assert!(harness.notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_encoding_failure_aborts_measurements_only() {
    let harness = Harness::fresh().with_encoder(Arc::new(BrokenEncoder));
    let taken = days_ago(1);
    harness.scale.add_weight(taken, 70_000, None);
    harness.tracker.add_activity("9", taken, "running");

    let report = harness.run(false).await;

    match report.outcome(SyncKind::Measurements) {
        Some(SyncOutcome::Aborted { errors, .. }) => {
            assert_eq!(errors.len(), 1);
            assert_eq!(errors[0].kind(), ErrorKind::EncodingFailed);
        }
        other => panic!("expected abort, got {other:?}"),
    }
    assert_eq!(committed_records(report.outcome(SyncKind::Activities)), 1);
    assert_eq!(report.exit_code(), 0);

    let alerts = harness.notifier.alerts();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].kind, SyncKind::Measurements);
    assert_eq!(alerts[0].retryable, Some(true));

    let persisted = harness.persisted();
    assert_eq!(persisted.watermarks.last_activity_sync_ts, taken);
    assert_eq!(
        persisted.watermarks.last_measurement_sync_ts,
        Watermarks::default().last_measurement_sync_ts
    );
}

#[tokio::test]
async fn test_activity_types_outside_allow_list_are_skipped() {
    let harness = Harness::fresh();
    harness.tracker.add_activity("1", days_ago(2), "running");
    let newest = days_ago(1);
    harness.tracker.add_activity("2", newest, "yoga");

    let report = harness.run(false).await;

    assert_eq!(committed_records(report.outcome(SyncKind::Activities)), 2);
    assert_eq!(harness.social.uploaded(), vec!["1".to_owned()]);
    // The skipped activity still moves the watermark
    assert_eq!(harness.persisted().watermarks.last_activity_sync_ts, newest);
}

#[tokio::test]
async fn test_duplicate_upload_counts_as_delivered() {
    let harness = Harness::fresh();
    harness.tracker.add_activity("42", days_ago(1), "running");
    harness.social.duplicates.lock().unwrap().push("42".to_owned());

    let report = harness.run(false).await;

    assert_eq!(committed_records(report.outcome(SyncKind::Activities)), 1);
    assert!(harness.notifier.alerts().is_empty());
}

#[tokio::test]
async fn test_fetch_failure_aborts_kind_and_exit_code_reflects_total_failure() {
    let harness = Harness::fresh();
    harness.scale.add_weight(days_ago(1), 70_000, None);
    harness.tracker.add_activity("3", days_ago(1), "running");
    *harness.scale.fail_fetch.lock().unwrap() = Some(ProviderError::Timeout {
        provider: "withings".to_owned(),
    });

    let partial = harness.run(false).await;
    assert!(partial.outcome(SyncKind::Measurements).unwrap().is_aborted());
    assert_eq!(partial.exit_code(), 0);

    *harness.tracker.fail_listing.lock().unwrap() =
        Some(ProviderError::network("garmin", "connection reset"));
    harness.tracker.add_activity("4", hours_ago(2), "running");
    let total = harness.run(false).await;

    assert!(total.all_failed());
    assert_eq!(total.exit_code(), 1);
    assert!(matches!(
        total.outcome(SyncKind::Activities),
        Some(SyncOutcome::Aborted { phase: SyncPhase::Fetching, .. })
    ));
}

#[tokio::test]
async fn test_forced_run_resends_records_within_lookback() {
    let harness = Harness::fresh();
    harness.scale.add_weight(days_ago(5), 70_000, None);
    harness.tracker.add_activity("11", days_ago(5), "running");
    // Outside the 21-day look-back even when forced
    harness.tracker.add_activity("10", days_ago(30), "running");

    harness.run(false).await;
    let forced = harness.run(true).await;

    assert_eq!(committed_records(forced.outcome(SyncKind::Activities)), 1);
    assert_eq!(committed_records(forced.outcome(SyncKind::Measurements)), 1);
    assert_eq!(
        harness.social.uploaded(),
        vec!["11".to_owned(), "11".to_owned()]
    );
    assert_eq!(harness.tracker.upload_count(), 2);
}

#[tokio::test]
async fn test_committed_measurements_send_info_summary() {
    let harness = Harness::fresh();
    harness.scale.add_weight(days_ago(1), 70_000, Some(215));

    harness.run(false).await;

    let sent = harness.notifier.notifications();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].severity, Severity::Info);
    assert_eq!(sent[0].kind, SyncKind::Measurements);
}
