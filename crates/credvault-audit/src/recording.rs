// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Metric registration and recording helpers.
//!
//! Uses the metrics-rs facade; no recorder is installed by the library, so
//! these calls are no-ops unless the host application installs one.

use metrics::describe_counter;

/// Register all credvault metric descriptions.
///
/// Called once at startup after the recorder is installed.
pub fn register_metrics() {
    describe_counter!(
        "credvault_audit_events_total",
        "Audit records appended, by action and outcome"
    );
    describe_counter!(
        "credvault_audit_write_failures_total",
        "Audit records that could not be written"
    );
    describe_counter!(
        "credvault_alerts_dispatched_total",
        "Alerts delivered to the configured handler"
    );
    describe_counter!(
        "credvault_alerts_failed_total",
        "Alerts whose handler returned an error or panicked"
    );
    describe_counter!(
        "credvault_alerts_dropped_total",
        "Alerts dropped because the dispatch queue was full"
    );
    describe_counter!(
        "credvault_subscriber_failures_total",
        "Security event subscriber callbacks that failed"
    );
    describe_counter!("credvault_cache_hits_total", "Credential cache hits");
    describe_counter!("credvault_cache_misses_total", "Credential cache misses");
    describe_counter!(
        "credvault_gpg_invocations_total",
        "OpenPGP subprocess invocations, by operation and outcome"
    );
}

/// Record an appended audit record.
pub fn record_audit_event(action: &str, success: bool) {
    metrics::counter!(
        "credvault_audit_events_total",
        "action" => action.to_string(),
        "success" => if success { "true" } else { "false" }
    )
    .increment(1);
}

/// Record an audit write that went to the fallback sink instead.
pub fn record_write_failure() {
    metrics::counter!("credvault_audit_write_failures_total").increment(1);
}

/// Record an alert delivered to its handler.
pub fn record_alert_dispatched(kind: &'static str) {
    metrics::counter!("credvault_alerts_dispatched_total", "kind" => kind).increment(1);
}

/// Record an alert handler failure.
pub fn record_alert_failed(kind: &'static str) {
    metrics::counter!("credvault_alerts_failed_total", "kind" => kind).increment(1);
}

/// Record an alert dropped on a full queue.
pub fn record_alert_dropped() {
    metrics::counter!("credvault_alerts_dropped_total").increment(1);
}

/// Record a failing subscriber callback.
pub fn record_subscriber_failure() {
    metrics::counter!("credvault_subscriber_failures_total").increment(1);
}

pub fn record_cache_hit() {
    metrics::counter!("credvault_cache_hits_total").increment(1);
}

pub fn record_cache_miss() {
    metrics::counter!("credvault_cache_misses_total").increment(1);
}

/// Record one OpenPGP subprocess invocation.
pub fn record_gpg_invocation(operation: &'static str, outcome: &'static str) {
    metrics::counter!(
        "credvault_gpg_invocations_total",
        "operation" => operation,
        "outcome" => outcome
    )
    .increment(1);
}
