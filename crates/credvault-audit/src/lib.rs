// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Tamper-evident audit trail for credential operations.
//!
//! Every record is one JSON line carrying an HMAC-SHA256 signature over its
//! canonical fields. Reads recompute the signature and mark each record
//! `verified`, so an edited line is visible without making the read fail.
//! The trail also derives operator views from the log (security alerts,
//! brute-force patterns, summary metrics), fans records out to in-process
//! subscribers, and hands alerts to a background worker so handlers never
//! sit on the write path.

pub mod analysis;
pub mod dispatch;
pub mod event;
pub mod recording;
pub mod rotation;
pub mod signing;
pub mod trail;
mod writer;

pub use analysis::{SecurityMetrics, ThreatPattern, TimeRange, TopThreat};
pub use dispatch::{Alert, AlertHandler, AlertKind};
pub use event::{actions, AuditEvent, SecurityContext};
pub use rotation::{RetentionPolicy, RetentionReport};
pub use signing::EventSigner;
pub use trail::{
    generate_request_id, AuditOptions, AuditTrail, EventDraft, SecurityEventCallback,
    Subscription, VerificationReport,
};
