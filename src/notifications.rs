// ABOUTME: Notification collaborator receiving run alerts and sync summaries
// ABOUTME: Log-backed notifier for production and a recording notifier for embedding and tests
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 SportSync Contributors

use crate::errors::SyncError;
use crate::models::{Measurement, SyncKind};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::fmt::Write as _;
use std::sync::Mutex;
use tracing::{error, info};

/// How urgent a notification is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Informational summary of a successful sync
    Info,
    /// A sync kind failed and needs attention
    Alert,
}

/// Human-readable message for the operator
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    /// Urgency
    pub severity: Severity,
    /// Sync kind the message is about
    pub kind: SyncKind,
    /// One-line subject
    pub subject: String,
    /// Detail
    pub body: String,
    /// For alerts, whether the next run can succeed without intervention
    pub retryable: Option<bool>,
}

impl Notification {
    /// Alert for a failed sync kind
    #[must_use]
    pub fn alert(kind: SyncKind, errors: &[SyncError]) -> Self {
        let retryable = errors.iter().all(SyncError::is_retryable);
        let mut body = String::new();
        for error in errors {
            let _ = writeln!(body, "- [{:?}] {error}", error.kind());
        }
        if !retryable {
            body.push_str("Re-authorize the affected provider before the next run.\n");
        }
        Self {
            severity: Severity::Alert,
            kind,
            subject: format!("SportSync {kind} sync failed"),
            body,
            retryable: Some(retryable),
        }
    }

    /// Summary of newly synchronized measurements
    #[must_use]
    pub fn measurement_summary(records: &[Measurement]) -> Self {
        let mut body = String::new();
        for m in records {
            let _ = writeln!(
                body,
                "{}: weight {:.2} kg, fat {} %, hydration {} %, bone {} kg, muscle {} kg, BMI {}",
                m.timestamp.format("%Y-%m-%d %H:%M UTC"),
                m.weight_kg,
                fmt_opt(m.fat_ratio_pct),
                fmt_opt(m.hydration_pct),
                fmt_opt(m.bone_mass_kg),
                fmt_opt(m.muscle_mass_kg),
                fmt_opt(m.bmi()),
            );
        }
        Self {
            severity: Severity::Info,
            kind: SyncKind::Measurements,
            subject: format!("SportSync synced {} new measurement(s)", records.len()),
            body,
            retryable: None,
        }
    }
}

fn fmt_opt(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_owned(), |v| format!("{v:.1}"))
}

/// Delivers notifications to the operator
///
/// The sync engine never depends on a notification succeeding; errors are
/// logged and dropped.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Send one notification
    async fn notify(&self, notification: &Notification) -> Result<()>;
}

/// Writes notifications to the tracing log
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        match notification.severity {
            Severity::Alert => error!(
                kind = %notification.kind,
                retryable = ?notification.retryable,
                subject = %notification.subject,
                "{}",
                notification.body
            ),
            Severity::Info => info!(
                kind = %notification.kind,
                subject = %notification.subject,
                "{}",
                notification.body
            ),
        }
        Ok(())
    }
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    sent: Mutex<Vec<Notification>>,
}

impl RecordingNotifier {
    /// Empty recorder
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far
    #[must_use]
    pub fn notifications(&self) -> Vec<Notification> {
        self.sent.lock().map(|sent| sent.clone()).unwrap_or_default()
    }

    /// Alerts sent so far
    #[must_use]
    pub fn alerts(&self) -> Vec<Notification> {
        self.notifications()
            .into_iter()
            .filter(|n| n.severity == Severity::Alert)
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, notification: &Notification) -> Result<()> {
        self.sent
            .lock()
            .map_err(|_| anyhow!("notification recorder lock poisoned"))?
            .push(notification.clone());
        Ok(())
    }
}
