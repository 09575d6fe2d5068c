// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The audit trail: signed writes, verified reads, and derived queries.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use arc_swap::{ArcSwap, ArcSwapOption};
use chrono::{DateTime, SubsecRound, Utc};
use credvault_config::AuditConfig;
use credvault_core::{Clock, CredvaultError, Severity, SystemClock};
use credvault_security::{redact, sanitize_log_text, truncate_chars};
use rand::RngCore;
use secrecy::SecretString;
use serde::Serialize;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, warn};

use crate::analysis::{self, SecurityMetrics, ThreatPattern, ANALYSIS_WINDOW_HOURS};
use crate::dispatch::{self, AlertHandler, DispatchJob, HandlerSlot, Worker};
use crate::event::{actions, security_action, AuditEvent, SecurityContext};
use crate::recording;
use crate::rotation::{self, RetentionPolicy, RetentionReport};
use crate::signing::EventSigner;
use crate::writer::{read_lines, LogWriter};

/// Longest `keyId` written for a credential access record.
const ACCESS_KEY_LIST_MAX_CHARS: usize = 100;

/// Callback invoked synchronously after every successful append.
pub type SecurityEventCallback = dyn Fn(&AuditEvent) -> Result<(), CredvaultError> + Send + Sync;

/// Construction parameters for [`AuditTrail`].
#[derive(Debug, Clone)]
pub struct AuditOptions {
    pub log_path: PathBuf,
    pub signing_key: SecretString,
    /// Label stamped on every record.
    pub environment: String,
    pub retention: RetentionPolicy,
    pub alert_queue_capacity: usize,
}

impl AuditOptions {
    pub fn new(log_path: impl Into<PathBuf>, signing_key: SecretString) -> Self {
        Self {
            log_path: log_path.into(),
            signing_key,
            environment: "unknown".to_string(),
            retention: RetentionPolicy::default(),
            alert_queue_capacity: 256,
        }
    }

    pub fn from_config(config: &AuditConfig) -> Result<Self, CredvaultError> {
        let signing_key = config
            .signing_key
            .as_ref()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| {
                CredvaultError::Config(
                    "audit signing key is required (set AUDIT_SIGNING_KEY)".to_string(),
                )
            })?;
        Ok(Self {
            log_path: config.log_path(),
            signing_key: SecretString::from(signing_key.clone()),
            environment: config.environment.clone(),
            retention: RetentionPolicy {
                max_log_bytes: config.max_log_bytes,
                max_backups: config.max_backups,
                max_age: config
                    .max_age_days
                    .map(|days| Duration::from_secs(days * 24 * 60 * 60)),
            },
            alert_queue_capacity: config.alert_queue_capacity,
        })
    }
}

/// A record about to be written. Timestamp, pid, environment, and
/// signature are filled in by the trail.
#[derive(Debug, Clone, PartialEq)]
pub struct EventDraft {
    action: String,
    key_id: String,
    success: bool,
    error: Option<String>,
    request_id: Option<String>,
    security_context: Option<SecurityContext>,
}

impl EventDraft {
    pub fn new(action: impl Into<String>, key_id: impl Into<String>, success: bool) -> Self {
        Self {
            action: action.into(),
            key_id: key_id.into(),
            success,
            error: None,
            request_id: None,
            security_context: None,
        }
    }

    pub fn error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    /// Use a caller-supplied request id instead of a fresh random one.
    pub fn request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn security_context(mut self, context: SecurityContext) -> Self {
        self.security_context = Some(context);
        self
    }
}

/// Per-line outcome of [`AuditTrail::verify_log`]. Line numbers are 1-based.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub total: usize,
    pub verified: usize,
    pub tampered_lines: Vec<usize>,
    pub malformed_lines: Vec<usize>,
}

impl VerificationReport {
    pub fn is_intact(&self) -> bool {
        self.tampered_lines.is_empty()
    }
}

type SubscriberList = Mutex<Vec<(u64, Arc<SecurityEventCallback>)>>;

struct Subscribers {
    next_id: AtomicU64,
    list: SubscriberList,
}

/// Keeps a subscriber registered. Dropping it unsubscribes.
#[must_use = "dropping the subscription unsubscribes immediately"]
pub struct Subscription {
    id: u64,
    subscribers: Weak<Subscribers>,
}

impl Subscription {
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(subscribers) = self.subscribers.upgrade() {
            let mut list = subscribers
                .list
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            list.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

struct Inner {
    writer: Arc<LogWriter>,
    signer: EventSigner,
    clock: Arc<dyn Clock>,
    environment: String,
    pid: u32,
    retention: Arc<ArcSwap<RetentionPolicy>>,
    handler: Arc<ArcSwapOption<HandlerSlot>>,
    subscribers: Arc<Subscribers>,
    jobs: mpsc::Sender<DispatchJob>,
}

/// Tamper-evident audit trail.
///
/// Cheap to clone; clones share the log, subscribers, and dispatch worker.
/// The worker stops once every clone is dropped.
///
/// The `log_*` methods never fail: an audit write that cannot be completed
/// is reported through `tracing` and a metric, so a broken audit sink can
/// not fail a credential operation. [`try_record`](Self::try_record) is the
/// fallible form.
#[derive(Clone)]
pub struct AuditTrail {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for AuditTrail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuditTrail")
            .field("log_path", &self.inner.writer.path())
            .field("environment", &self.inner.environment)
            .finish_non_exhaustive()
    }
}

impl AuditTrail {
    /// Build a trail and start its dispatch worker. Must be called from
    /// within a tokio runtime.
    pub fn new(options: AuditOptions, clock: Arc<dyn Clock>) -> Result<Self, CredvaultError> {
        let signer = EventSigner::new(&options.signing_key)?;
        options.retention.validate()?;
        if options.alert_queue_capacity == 0 {
            return Err(CredvaultError::Config(
                "alert queue capacity must be greater than zero".to_string(),
            ));
        }
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| {
            CredvaultError::Internal("audit trail must be created inside a tokio runtime".into())
        })?;

        let writer = Arc::new(LogWriter::new(options.log_path));
        let retention = Arc::new(ArcSwap::from_pointee(options.retention));
        let handler = Arc::new(ArcSwapOption::empty());
        let (jobs, rx) = mpsc::channel(options.alert_queue_capacity);

        let worker = Worker {
            writer: Arc::clone(&writer),
            retention: Arc::clone(&retention),
            handler: Arc::clone(&handler),
            clock: Arc::clone(&clock),
        };
        runtime.spawn(worker.run(rx));

        debug!(log_path = %writer.path().display(), "audit trail initialized");

        Ok(Self {
            inner: Arc::new(Inner {
                writer,
                signer,
                clock,
                environment: sanitize_log_text(&options.environment),
                pid: std::process::id(),
                retention,
                handler,
                subscribers: Arc::new(Subscribers {
                    next_id: AtomicU64::new(1),
                    list: Mutex::new(Vec::new()),
                }),
                jobs,
            }),
        })
    }

    /// Build a trail from the `[audit]` config section using the system clock.
    pub fn from_config(config: &AuditConfig) -> Result<Self, CredvaultError> {
        Self::new(AuditOptions::from_config(config)?, Arc::new(SystemClock))
    }

    pub fn log_path(&self) -> &Path {
        self.inner.writer.path()
    }

    pub fn environment(&self) -> &str {
        &self.inner.environment
    }

    /// Sign, append, and fan out one record.
    ///
    /// Every free-text field is sanitized first so no value can break the
    /// one-record-per-line framing. Subscribers run synchronously after the
    /// append; alerts and rotation are queued for the background worker.
    pub async fn try_record(&self, draft: EventDraft) -> Result<AuditEvent, CredvaultError> {
        let inner = &self.inner;
        let now = inner.clock.now();

        let mut event = AuditEvent {
            timestamp: now.trunc_subsecs(3),
            action: sanitize_log_text(&draft.action),
            key_id: sanitize_log_text(&draft.key_id),
            success: draft.success,
            error: draft
                .error
                .map(|e| sanitize_log_text(&redact(&e, &[])))
                .filter(|e| !e.is_empty()),
            request_id: draft
                .request_id
                .map(|r| sanitize_log_text(&r))
                .unwrap_or_else(generate_request_id),
            pid: inner.pid,
            environment: inner.environment.clone(),
            signature: String::new(),
            verified: None,
            security_context: draft.security_context.map(sanitize_context),
        };
        event.signature = inner.signer.sign(&event);

        let line = serde_json::to_string(&event)?;
        let size = inner.writer.append(&line).await?;
        recording::record_audit_event(&event.action, event.success);

        self.notify_subscribers(&event);
        self.enqueue_alert(&event);

        if size > inner.retention.load().max_log_bytes {
            if let Err(e) = inner.jobs.try_send(DispatchJob::Rotate) {
                debug!(error = %e, "rotation already pending or worker busy");
            }
        }

        Ok(event)
    }

    /// Infallible form of [`try_record`](Self::try_record).
    pub async fn record(&self, draft: EventDraft) {
        let action = draft.action.clone();
        if let Err(e) = self.try_record(draft).await {
            recording::record_write_failure();
            error!(action = %action, error = %e, "failed to write audit record");
        }
    }

    fn notify_subscribers(&self, event: &AuditEvent) {
        let snapshot: Vec<Arc<SecurityEventCallback>> = {
            let list = self
                .inner
                .subscribers
                .list
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            list.iter().map(|(_, cb)| Arc::clone(cb)).collect()
        };

        for callback in snapshot {
            match std::panic::catch_unwind(AssertUnwindSafe(|| callback(event))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    recording::record_subscriber_failure();
                    warn!(action = %event.action, error = %e, "security event subscriber failed");
                }
                Err(_) => {
                    recording::record_subscriber_failure();
                    error!(action = %event.action, "security event subscriber panicked");
                }
            }
        }
    }

    fn enqueue_alert(&self, event: &AuditEvent) {
        let Some((kind, severity)) = dispatch::classify(event) else {
            return;
        };
        if self.inner.handler.load().is_none() {
            return;
        }
        let alert = dispatch::build_alert(event, severity);
        if let Err(e) = self.inner.jobs.try_send(DispatchJob::Alert(kind, alert)) {
            recording::record_alert_dropped();
            warn!(kind = kind.as_str(), error = %e, "alert dropped");
        }
    }

    /// Wait until every alert and rotation queued so far has been handled.
    pub async fn flush(&self) {
        let (tx, rx) = oneshot::channel();
        if self.inner.jobs.send(DispatchJob::Flush(tx)).await.is_ok() {
            let _ = rx.await;
        }
    }

    // --- Credential operation records ---

    pub async fn log_encryption(&self, key_id: &str) {
        self.record(EventDraft::new(actions::ENCRYPT_CREDENTIAL, key_id, true))
            .await;
    }

    pub async fn log_encryption_failure(&self, key_id: &str, error: &str) {
        self.record(EventDraft::new(actions::ENCRYPT_CREDENTIAL, key_id, false).error(error))
            .await;
    }

    pub async fn log_decryption(&self, key_id: &str) {
        self.record(EventDraft::new(actions::DECRYPT_CREDENTIAL, key_id, true))
            .await;
    }

    pub async fn log_decryption_failure(&self, key_id: &str, error: &str) {
        self.record(EventDraft::new(actions::DECRYPT_CREDENTIAL, key_id, false).error(error))
            .await;
    }

    pub async fn log_load_success(&self, key_id: &str) {
        self.record(EventDraft::new(actions::LOAD_CREDENTIALS, key_id, true))
            .await;
    }

    /// Load failures are recorded against `"unknown"`: the failure may
    /// precede knowing which key was involved.
    pub async fn log_load_failure(&self, error: &str) {
        self.record(EventDraft::new(actions::LOAD_CREDENTIALS, "unknown", false).error(error))
            .await;
    }

    pub async fn log_store_success(&self, key_id: &str) {
        self.record(EventDraft::new(actions::STORE_CREDENTIALS, key_id, true))
            .await;
    }

    pub async fn log_store_failure(&self, key_id: &str, error: &str) {
        self.record(EventDraft::new(actions::STORE_CREDENTIALS, key_id, false).error(error))
            .await;
    }

    pub async fn log_rotation(&self, credential_type: &str, success: bool, error: Option<&str>) {
        let mut draft = EventDraft::new(actions::ROTATE_CREDENTIAL, credential_type, success);
        if let Some(error) = error {
            draft = draft.error(error);
        }
        self.record(draft).await;
    }

    // --- Security events ---

    /// Record a `SECURITY_<SEVERITY>` event. Only LOW severity counts as a
    /// success.
    pub async fn log_security_event(&self, event: &str, severity: Severity, details: &str) {
        self.record(security_draft(event, severity, details)).await;
    }

    pub async fn log_security_event_with_context(
        &self,
        event: &str,
        severity: Severity,
        details: &str,
        context: SecurityContext,
    ) {
        self.record(security_draft(event, severity, details).security_context(context))
            .await;
    }

    // --- Caller-facing wrappers ---

    pub async fn log_credential_error(&self, error: &str, request_id: &str) {
        self.record(
            EventDraft::new(actions::CREDENTIAL_ERROR, "unknown", false)
                .error(error)
                .request_id(request_id),
        )
        .await;
    }

    pub async fn log_credential_access(&self, request_id: &str, keys: &[&str]) {
        let key_list = truncate_chars(&keys.join(","), ACCESS_KEY_LIST_MAX_CHARS);
        self.record(
            EventDraft::new(actions::ACCESS_CREDENTIALS, key_list, true).request_id(request_id),
        )
        .await;
    }

    pub async fn log_credential_store(&self, request_id: &str, environment: &str) {
        self.record(
            EventDraft::new(actions::STORE_CREDENTIAL, environment, true).request_id(request_id),
        )
        .await;
    }

    pub async fn log_credential_test(&self, request_id: &str, passed: bool) {
        let mut draft = EventDraft::new(actions::TEST_CREDENTIAL_ENCRYPTION, "test", passed)
            .request_id(request_id);
        if !passed {
            draft = draft.error("Encryption/decryption test failed");
        }
        self.record(draft).await;
    }

    // --- Reads ---

    /// Parse the active log, verify each record, and return those inside
    /// the window, newest first. Unparseable lines are skipped, and a log
    /// that cannot be read yields no events.
    pub async fn get_recent_events(&self, hours: u64) -> Result<Vec<AuditEvent>, CredvaultError> {
        let since = window_start(self.inner.clock.now(), hours);
        let parsed = match self.read_events().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(error = %e, "audit log unreadable, returning no events");
                return Ok(Vec::new());
            }
        };
        let mut events: Vec<AuditEvent> = parsed
            .into_iter()
            .filter_map(|(_, parsed)| parsed)
            .filter(|e| e.timestamp >= since)
            .collect();
        // Reverse first so records sharing a timestamp keep newest-first order.
        events.reverse();
        events.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(events)
    }

    /// Records from the last 24 hours that deserve an operator's attention.
    pub async fn get_security_alerts(&self) -> Result<Vec<AuditEvent>, CredvaultError> {
        Ok(self
            .get_recent_events(ANALYSIS_WINDOW_HOURS)
            .await?
            .into_iter()
            .filter(analysis::is_security_alert)
            .collect())
    }

    /// Brute-force patterns over the last 24 hours.
    pub async fn analyze_threat_patterns(&self) -> Result<Vec<ThreatPattern>, CredvaultError> {
        let now = self.inner.clock.now();
        let events = self.get_recent_events(ANALYSIS_WINDOW_HOURS).await?;
        Ok(analysis::detect_brute_force(
            &events,
            window_start(now, ANALYSIS_WINDOW_HOURS),
            now,
        ))
    }

    pub async fn get_security_metrics(&self) -> Result<SecurityMetrics, CredvaultError> {
        let events = self.get_recent_events(ANALYSIS_WINDOW_HOURS).await?;
        Ok(analysis::summarize(
            &events,
            &format!("{ANALYSIS_WINDOW_HOURS}h"),
        ))
    }

    /// Check every line of the active log.
    pub async fn verify_log(&self) -> Result<VerificationReport, CredvaultError> {
        let mut report = VerificationReport::default();
        for (line_no, parsed) in self.read_events().await? {
            report.total += 1;
            match parsed {
                Some(event) if event.is_verified() => report.verified += 1,
                Some(_) => report.tampered_lines.push(line_no),
                None => report.malformed_lines.push(line_no),
            }
        }
        Ok(report)
    }

    /// Like [`verify_log`](Self::verify_log), but any tampered record is an
    /// error.
    pub async fn ensure_log_intact(&self) -> Result<VerificationReport, CredvaultError> {
        let report = self.verify_log().await?;
        if !report.is_intact() {
            return Err(CredvaultError::Signature(format!(
                "{} audit record(s) failed signature verification (lines {:?})",
                report.tampered_lines.len(),
                report.tampered_lines
            )));
        }
        Ok(report)
    }

    async fn read_events(&self) -> Result<Vec<(usize, Option<AuditEvent>)>, CredvaultError> {
        let lines = read_lines(self.inner.writer.path()).await?;
        Ok(lines
            .iter()
            .enumerate()
            .map(|(idx, line)| {
                let parsed = match serde_json::from_str::<AuditEvent>(line) {
                    Ok(mut event) => {
                        event.verified = Some(self.inner.signer.verify(&event));
                        Some(event)
                    }
                    Err(e) => {
                        debug!(line = idx + 1, error = %e, "skipping malformed audit line");
                        None
                    }
                };
                (idx + 1, parsed)
            })
            .collect())
    }

    // --- Maintenance and configuration ---

    /// Rotate now if the active log exceeds the configured size.
    pub async fn rotate_logs(&self) -> Result<Option<PathBuf>, CredvaultError> {
        let policy = self.inner.retention.load_full();
        rotation::rotate_if_needed(&self.inner.writer, &policy, self.inner.clock.now()).await
    }

    /// Prune expired records and backups according to the retention policy.
    pub async fn apply_retention_policy(&self) -> Result<RetentionReport, CredvaultError> {
        let policy = self.inner.retention.load_full();
        rotation::apply_retention(&self.inner.writer, &policy, self.inner.clock.now()).await
    }

    pub fn configure_retention(&self, policy: RetentionPolicy) -> Result<(), CredvaultError> {
        policy.validate()?;
        self.inner.retention.store(Arc::new(policy));
        Ok(())
    }

    pub fn retention_policy(&self) -> RetentionPolicy {
        self.inner.retention.load().as_ref().clone()
    }

    /// Replace the alert handler. Alerts raised while no handler is set are
    /// not queued.
    pub fn configure_alert_handlers(&self, handler: Arc<dyn AlertHandler>) {
        self.inner.handler.store(Some(Arc::new(HandlerSlot(handler))));
    }

    pub fn clear_alert_handlers(&self) {
        self.inner.handler.store(None);
    }

    /// Register a callback run after every successful append. The callback
    /// stays registered until the returned handle is dropped.
    pub fn subscribe_to_security_events<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&AuditEvent) -> Result<(), CredvaultError> + Send + Sync + 'static,
    {
        let callback: Arc<SecurityEventCallback> = Arc::new(callback);
        let subscribers = &self.inner.subscribers;
        let id = subscribers.next_id.fetch_add(1, Ordering::Relaxed);
        subscribers
            .list
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push((id, callback));
        Subscription {
            id,
            subscribers: Arc::downgrade(subscribers),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner
            .subscribers
            .list
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }
}

fn security_draft(event: &str, severity: Severity, details: &str) -> EventDraft {
    let draft = EventDraft::new(security_action(severity), event, severity == Severity::Low);
    if details.is_empty() {
        draft
    } else {
        draft.error(details)
    }
}

fn sanitize_context(context: SecurityContext) -> SecurityContext {
    let clean = |v: Option<String>| v.map(|s| sanitize_log_text(&s));
    SecurityContext {
        session_id: clean(context.session_id),
        user_agent: clean(context.user_agent),
        ip_address: clean(context.ip_address),
        geolocation: clean(context.geolocation),
    }
}

fn window_start(now: DateTime<Utc>, hours: u64) -> DateTime<Utc> {
    let hours = i64::try_from(hours).unwrap_or(i64::MAX);
    chrono::Duration::try_hours(hours)
        .and_then(|window| now.checked_sub_signed(window))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// Eight random bytes, lowercase hex.
pub fn generate_request_id() -> String {
    let mut bytes = [0u8; 8];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_ids_are_sixteen_hex_chars() {
        let id = generate_request_id();
        assert_eq!(id.len(), 16);
        assert!(id.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(id, generate_request_id());
    }

    #[test]
    fn window_start_saturates_for_huge_windows() {
        let now = Utc::now();
        assert_eq!(window_start(now, u64::MAX), DateTime::<Utc>::MIN_UTC);
        assert_eq!(window_start(now, 1), now - chrono::Duration::hours(1));
    }

    #[test]
    fn security_draft_success_only_for_low() {
        assert!(security_draft("probe", Severity::Low, "").success);
        assert!(!security_draft("probe", Severity::Medium, "x").success);
        assert_eq!(security_draft("probe", Severity::High, "").error, None);
    }

    #[test]
    fn options_from_config_require_signing_key() {
        let config = AuditConfig::default();
        let err = AuditOptions::from_config(&config).unwrap_err();
        assert_eq!(err.kind(), credvault_core::ErrorKind::Config);

        let config = AuditConfig {
            signing_key: Some("0123456789abcdef0123".to_string()),
            max_age_days: Some(2),
            ..AuditConfig::default()
        };
        let options = AuditOptions::from_config(&config).unwrap();
        assert_eq!(
            options.retention.max_age,
            Some(Duration::from_secs(2 * 86_400))
        );
        assert_eq!(options.log_path, config.log_path());
    }

    #[test]
    fn construction_outside_runtime_is_an_error() {
        let options = AuditOptions::new(
            "/tmp/never-written.log",
            SecretString::from("0123456789abcdef0123".to_string()),
        );
        let err = AuditTrail::new(options, Arc::new(SystemClock)).unwrap_err();
        assert_eq!(err.kind(), credvault_core::ErrorKind::Internal);
    }

    #[tokio::test]
    #[tracing_test::traced_test]
    async fn write_failure_goes_to_the_fallback_log() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "x").unwrap();
        let options = AuditOptions::new(
            blocker.join("audit.log"),
            SecretString::from("0123456789abcdef0123".to_string()),
        );
        let trail = AuditTrail::new(options, Arc::new(SystemClock)).unwrap();

        trail.log_decryption("ABCDEF0123456789").await;

        assert!(logs_contain("failed to write audit record"));
        assert!(logs_contain("DECRYPT_CREDENTIAL"));
    }
}
