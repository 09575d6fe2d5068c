// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Background delivery of alerts and log rotation.
//!
//! The write path only ever `try_send`s onto a bounded queue. A single
//! worker task drains it, so a slow or failing alert handler can neither
//! block nor fail the caller that produced the record. Jobs that do not fit
//! are dropped and counted.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use arc_swap::{ArcSwap, ArcSwapOption};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use credvault_core::{Clock, CredvaultError, Severity};
use futures::FutureExt;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::event::{actions, security_action, AuditEvent};
use crate::recording;
use crate::rotation::{rotate_if_needed, RetentionPolicy};
use crate::writer::LogWriter;

/// Which handler an alert is routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CriticalThreat,
    SuspiciousActivity,
}

impl AlertKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CriticalThreat => "critical_threat",
            Self::SuspiciousActivity => "suspicious_activity",
        }
    }
}

/// Payload handed to an [`AlertHandler`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// The record's `keyId`, which names the event for security records.
    pub event: String,
    pub action: String,
    pub severity: Severity,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Receives alerts derived from audit records.
///
/// Both methods default to doing nothing, so implementors only override the
/// alerts they care about. Errors are logged and counted, never surfaced to
/// the code that wrote the record.
#[async_trait]
pub trait AlertHandler: Send + Sync + 'static {
    async fn on_critical_threat(&self, _alert: &Alert) -> Result<(), CredvaultError> {
        Ok(())
    }

    async fn on_suspicious_activity(&self, _alert: &Alert) -> Result<(), CredvaultError> {
        Ok(())
    }
}

/// Decide whether a record raises an alert, and at which severity.
///
/// `SECURITY_CRITICAL` goes to the critical-threat handler. Any other failed
/// record is suspicious: HIGH for `SECURITY_HIGH` and the credential read
/// paths, MEDIUM otherwise.
pub fn classify(event: &AuditEvent) -> Option<(AlertKind, Severity)> {
    if event.action == security_action(Severity::Critical) {
        return Some((AlertKind::CriticalThreat, Severity::Critical));
    }
    if event.success {
        return None;
    }
    let severity = if event.action == security_action(Severity::High)
        || event.action == actions::DECRYPT_CREDENTIAL
        || event.action == actions::LOAD_CREDENTIALS
    {
        Severity::High
    } else {
        Severity::Medium
    };
    Some((AlertKind::SuspiciousActivity, severity))
}

pub(crate) fn build_alert(event: &AuditEvent, severity: Severity) -> Alert {
    Alert {
        event: event.key_id.clone(),
        action: event.action.clone(),
        severity,
        timestamp: event.timestamp,
        request_id: event.request_id.clone(),
        details: event.error.clone(),
    }
}

pub(crate) enum DispatchJob {
    Alert(AlertKind, Alert),
    Rotate,
    /// Completes once every job queued before it has been handled.
    Flush(oneshot::Sender<()>),
}

/// Holder for the configured handler; `ArcSwapOption` needs a sized type.
pub(crate) struct HandlerSlot(pub(crate) Arc<dyn AlertHandler>);

pub(crate) struct Worker {
    pub(crate) writer: Arc<LogWriter>,
    pub(crate) retention: Arc<ArcSwap<RetentionPolicy>>,
    pub(crate) handler: Arc<ArcSwapOption<HandlerSlot>>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Worker {
    /// Drain the queue until every sender is gone.
    pub(crate) async fn run(self, mut rx: mpsc::Receiver<DispatchJob>) {
        while let Some(job) = rx.recv().await {
            match job {
                DispatchJob::Alert(kind, alert) => self.deliver(kind, &alert).await,
                DispatchJob::Rotate => self.rotate().await,
                DispatchJob::Flush(done) => {
                    let _ = done.send(());
                }
            }
        }
        debug!("audit dispatch worker stopped");
    }

    async fn deliver(&self, kind: AlertKind, alert: &Alert) {
        let Some(slot) = self.handler.load_full() else {
            return;
        };
        let handler = Arc::clone(&slot.0);
        let call = async {
            match kind {
                AlertKind::CriticalThreat => handler.on_critical_threat(alert).await,
                AlertKind::SuspiciousActivity => handler.on_suspicious_activity(alert).await,
            }
        };

        match AssertUnwindSafe(call).catch_unwind().await {
            Ok(Ok(())) => recording::record_alert_dispatched(kind.as_str()),
            Ok(Err(e)) => {
                recording::record_alert_failed(kind.as_str());
                warn!(kind = kind.as_str(), action = %alert.action, error = %e, "alert handler failed");
            }
            Err(_) => {
                recording::record_alert_failed(kind.as_str());
                error!(kind = kind.as_str(), action = %alert.action, "alert handler panicked");
            }
        }
    }

    async fn rotate(&self) {
        let policy = self.retention.load_full();
        if let Err(e) = rotate_if_needed(&self.writer, &policy, self.clock.now()).await {
            error!(error = %e, "audit log rotation failed");
        }
    }
}
