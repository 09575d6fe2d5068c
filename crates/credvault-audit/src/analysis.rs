// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Derived views over a window of audit records: alerts, threat patterns,
//! and summary metrics. Nothing here is persisted or cached.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use credvault_core::Severity;
use serde::Serialize;

use crate::event::{actions, security_severity, AuditEvent};

/// Failed decrypts per key that constitute a brute-force pattern.
pub const BRUTE_FORCE_THRESHOLD: usize = 5;
/// Failed decrypts per key at which the pattern becomes HIGH severity.
pub const BRUTE_FORCE_HIGH_THRESHOLD: usize = 10;
/// Look-back window for alerts, patterns, and metrics.
pub const ANALYSIS_WINDOW_HOURS: u64 = 24;

pub const BRUTE_FORCE_ATTEMPT: &str = "BRUTE_FORCE_ATTEMPT";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

/// A threat signal derived from a window of records.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ThreatPattern {
    pub threat_type: String,
    pub severity: Severity,
    pub event_count: usize,
    pub time_range: TimeRange,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TopThreat {
    #[serde(rename = "type")]
    pub threat_type: String,
    pub count: usize,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityMetrics {
    pub total_events: usize,
    pub threat_count: usize,
    pub success_rate: f64,
    pub top_threats: Vec<TopThreat>,
    pub time_range: String,
}

const TOP_THREATS_LIMIT: usize = 10;

/// Failures, security events, and anything whose error contains `failed`
/// or `unauthorized` (case-sensitive).
pub fn is_security_alert(event: &AuditEvent) -> bool {
    if !event.success || event.is_security_event() {
        return true;
    }
    event
        .error
        .as_deref()
        .is_some_and(|e| e.contains("failed") || e.contains("unauthorized"))
}

/// Count failed decrypts per key id. Each key at or above the brute-force
/// threshold yields one pattern.
pub fn detect_brute_force(
    events: &[AuditEvent],
    window_start: DateTime<Utc>,
    window_end: DateTime<Utc>,
) -> Vec<ThreatPattern> {
    let mut failures: BTreeMap<&str, usize> = BTreeMap::new();
    for event in events {
        if event.action == actions::DECRYPT_CREDENTIAL && !event.success {
            *failures.entry(event.key_id.as_str()).or_default() += 1;
        }
    }

    let mut patterns: Vec<ThreatPattern> = failures
        .into_iter()
        .filter(|(_, count)| *count >= BRUTE_FORCE_THRESHOLD)
        .map(|(key_id, count)| ThreatPattern {
            threat_type: BRUTE_FORCE_ATTEMPT.to_string(),
            severity: if count >= BRUTE_FORCE_HIGH_THRESHOLD {
                Severity::High
            } else {
                Severity::Medium
            },
            event_count: count,
            time_range: TimeRange {
                start: window_start,
                end: window_end,
            },
            description: format!("{count} failed decryption attempts for key {key_id}"),
        })
        .collect();
    patterns.sort_by(|a, b| b.event_count.cmp(&a.event_count));
    patterns
}

/// Summarize a window of records.
///
/// Threats are `SECURITY_MEDIUM`, `SECURITY_HIGH`, and `SECURITY_CRITICAL`
/// records, ranked by how often each event name (the record's key id)
/// occurs.
pub fn summarize(events: &[AuditEvent], time_range: &str) -> SecurityMetrics {
    let total_events = events.len();
    let successes = events.iter().filter(|e| e.success).count();
    let success_rate = if total_events == 0 {
        0.0
    } else {
        successes as f64 / total_events as f64
    };

    let mut by_type: HashMap<&str, (usize, Severity)> = HashMap::new();
    let mut threat_count = 0;
    for event in events {
        let Some(severity) = security_severity(&event.action) else {
            continue;
        };
        if severity < Severity::Medium {
            continue;
        }
        threat_count += 1;
        let entry = by_type
            .entry(event.key_id.as_str())
            .or_insert((0, severity));
        entry.0 += 1;
        entry.1 = entry.1.max(severity);
    }

    let mut top_threats: Vec<TopThreat> = by_type
        .into_iter()
        .map(|(threat_type, (count, severity))| TopThreat {
            threat_type: threat_type.to_string(),
            count,
            severity,
        })
        .collect();
    top_threats.sort_by(|a, b| {
        b.count
            .cmp(&a.count)
            .then_with(|| a.threat_type.cmp(&b.threat_type))
    });
    top_threats.truncate(TOP_THREATS_LIMIT);

    SecurityMetrics {
        total_events,
        threat_count,
        success_rate,
        top_threats,
        time_range: time_range.to_string(),
    }
}
