// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! End-to-end behavior of the audit trail against a real log file.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use credvault_audit::{
    actions, Alert, AlertHandler, AuditOptions, AuditTrail, RetentionPolicy, SecurityContext,
};
use credvault_core::{CredvaultError, Severity};
use credvault_test_utils::ManualClock;
use secrecy::SecretString;
use tempfile::TempDir;

const SIGNING_KEY: &str = "integration-signing-key-0123456789";

struct Fixture {
    trail: AuditTrail,
    clock: Arc<ManualClock>,
    dir: TempDir,
}

impl Fixture {
    fn log_path(&self) -> std::path::PathBuf {
        self.dir.path().join("credential-access.log")
    }

    fn lines(&self) -> Vec<String> {
        std::fs::read_to_string(self.log_path())
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }

    fn backups(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().into_owned())
            .filter(|n| n.starts_with("credential-access.log."))
            .collect();
        names.sort();
        names
    }
}

fn fixture_with(retention: RetentionPolicy) -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let clock = Arc::new(ManualClock::starting_now());
    let mut options = AuditOptions::new(
        dir.path().join("credential-access.log"),
        SecretString::from(SIGNING_KEY.to_string()),
    );
    options.environment = "production".to_string();
    options.retention = retention;
    let trail = AuditTrail::new(options, clock.clone()).unwrap();
    Fixture { trail, clock, dir }
}

fn fixture() -> Fixture {
    fixture_with(RetentionPolicy::default())
}

#[derive(Default)]
struct RecordingHandler {
    critical: Mutex<Vec<Alert>>,
    suspicious: Mutex<Vec<Alert>>,
}

#[async_trait]
impl AlertHandler for RecordingHandler {
    async fn on_critical_threat(&self, alert: &Alert) -> Result<(), CredvaultError> {
        self.critical.lock().unwrap().push(alert.clone());
        Ok(())
    }

    async fn on_suspicious_activity(&self, alert: &Alert) -> Result<(), CredvaultError> {
        self.suspicious.lock().unwrap().push(alert.clone());
        Ok(())
    }
}

struct FailingHandler;

#[async_trait]
impl AlertHandler for FailingHandler {
    async fn on_critical_threat(&self, _alert: &Alert) -> Result<(), CredvaultError> {
        Err(CredvaultError::Internal("pager offline".to_string()))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writes_produce_one_valid_line_each() {
    let f = fixture();
    let tasks: Vec<_> = (0..20)
        .map(|i| {
            let trail = f.trail.clone();
            tokio::spawn(async move {
                trail
                    .log_decryption_failure("ABCDEF0123456789", &format!("attempt {i} failed"))
                    .await;
            })
        })
        .collect();
    for task in tasks {
        task.await.unwrap();
    }

    let lines = f.lines();
    assert_eq!(lines.len(), 20);
    for line in &lines {
        let value: serde_json::Value = serde_json::from_str(line).unwrap();
        assert_eq!(value["action"], actions::DECRYPT_CREDENTIAL);
    }
    let report = f.trail.verify_log().await.unwrap();
    assert_eq!(report.verified, 20);
}

#[tokio::test]
async fn records_carry_process_metadata_and_signature() {
    let f = fixture();
    let event = f
        .trail
        .try_record(credvault_audit::EventDraft::new(
            actions::LOAD_CREDENTIALS,
            "ABCDEF0123456789",
            true,
        ))
        .await
        .unwrap();

    assert_eq!(event.pid, std::process::id());
    assert_eq!(event.environment, "production");
    assert_eq!(event.request_id.len(), 16);
    assert_eq!(event.signature.len(), 64);
    assert_eq!(event.timestamp.timestamp_subsec_nanos() % 1_000_000, 0);

    let events = f.trail.get_recent_events(1).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].verified, Some(true));
    assert_eq!(events[0].signature, event.signature);
}

#[tokio::test]
async fn edited_line_fails_verification_and_others_stay_verified() {
    let f = fixture();
    f.trail.log_load_success("ABCDEF0123456789").await;
    f.trail.log_decryption_failure("ABCDEF0123456789", "bad").await;
    f.trail.log_store_success("ABCDEF0123456789").await;

    let mut lines = f.lines();
    lines[1] = lines[1].replace("\"success\":false", "\"success\":true");
    std::fs::write(f.log_path(), lines.join("\n") + "\n").unwrap();

    let events = f.trail.get_recent_events(1).await.unwrap();
    let tampered: Vec<_> = events.iter().filter(|e| !e.is_verified()).collect();
    assert_eq!(tampered.len(), 1);
    assert_eq!(tampered[0].action, actions::DECRYPT_CREDENTIAL);
    assert_eq!(events.iter().filter(|e| e.is_verified()).count(), 2);

    let report = f.trail.verify_log().await.unwrap();
    assert_eq!(report.tampered_lines, vec![2]);
    let err = f.trail.ensure_log_intact().await.unwrap_err();
    assert_eq!(err.kind(), credvault_core::ErrorKind::Signature);
}

#[tokio::test]
async fn malformed_lines_are_skipped_not_fatal() {
    let f = fixture();
    f.trail.log_load_success("ABCDEF0123456789").await;
    let mut content = std::fs::read_to_string(f.log_path()).unwrap();
    content.push_str("{not json\n");
    std::fs::write(f.log_path(), content).unwrap();
    f.trail.log_store_success("ABCDEF0123456789").await;

    let events = f.trail.get_recent_events(1).await.unwrap();
    assert_eq!(events.len(), 2);
    let report = f.trail.verify_log().await.unwrap();
    assert_eq!(report.total, 3);
    assert_eq!(report.malformed_lines, vec![2]);
    assert!(report.is_intact());
}

#[tokio::test]
async fn recent_events_are_newest_first_and_windowed() {
    let f = fixture();
    f.trail.log_encryption("ABCDEF0123456789").await;
    f.clock.advance(Duration::from_secs(2 * 3600));
    f.trail.log_decryption("ABCDEF0123456789").await;
    f.clock.advance(Duration::from_secs(60));
    f.trail.log_load_success("ABCDEF0123456789").await;

    let last_hour = f.trail.get_recent_events(1).await.unwrap();
    let actions: Vec<_> = last_hour.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(
        actions,
        vec![actions::LOAD_CREDENTIALS, actions::DECRYPT_CREDENTIAL]
    );

    let day = f.trail.get_recent_events(24).await.unwrap();
    assert_eq!(day.len(), 3);
    assert_eq!(day[2].action, actions::ENCRYPT_CREDENTIAL);
}

#[tokio::test]
async fn missing_log_reads_as_empty() {
    let f = fixture();
    assert!(f.trail.get_recent_events(24).await.unwrap().is_empty());
    let metrics = f.trail.get_security_metrics().await.unwrap();
    assert_eq!(metrics.total_events, 0);
    assert_eq!(metrics.success_rate, 0.0);
}

#[tokio::test]
async fn injection_through_error_text_cannot_forge_a_record() {
    let f = fixture();
    let crafted = "oops\n{\"action\":\"STORE_CREDENTIALS\",\"success\":true}\r\nmore\u{0007}";
    f.trail.log_load_failure(crafted).await;

    let lines = f.lines();
    assert_eq!(lines.len(), 1);
    let event: serde_json::Value = serde_json::from_str(&lines[0]).unwrap();
    let error = event["error"].as_str().unwrap();
    assert!(!error.contains('\n'));
    assert!(!error.contains('\r'));
    assert!(!error.contains('\u{0007}'));
    assert_eq!(event["keyId"], "unknown");
    assert_eq!(event["action"], actions::LOAD_CREDENTIALS);
}

#[tokio::test]
async fn long_error_text_is_truncated() {
    let f = fixture();
    f.trail
        .log_decryption_failure("ABCDEF0123456789", &"e".repeat(2_000))
        .await;
    let events = f.trail.get_recent_events(1).await.unwrap();
    assert_eq!(events[0].error.as_ref().unwrap().chars().count(), 500);
}

#[cfg(unix)]
#[tokio::test]
async fn log_file_is_owner_only() {
    use std::os::unix::fs::PermissionsExt;

    let f = fixture();
    f.trail.log_encryption("ABCDEF0123456789").await;
    let mode = std::fs::metadata(f.log_path()).unwrap().permissions().mode() & 0o777;
    assert_eq!(mode, 0o600);
}

#[tokio::test]
async fn brute_force_patterns_follow_thresholds() {
    let f = fixture();
    for _ in 0..4 {
        f.trail.log_decryption_failure("KEY_A_0001", "bad key").await;
    }
    assert!(f.trail.analyze_threat_patterns().await.unwrap().is_empty());

    f.trail.log_decryption_failure("KEY_A_0001", "bad key").await;
    let patterns = f.trail.analyze_threat_patterns().await.unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].threat_type, "BRUTE_FORCE_ATTEMPT");
    assert_eq!(patterns[0].severity, Severity::Medium);
    assert_eq!(patterns[0].event_count, 5);

    for _ in 0..5 {
        f.trail.log_decryption_failure("KEY_A_0001", "bad key").await;
    }
    let patterns = f.trail.analyze_threat_patterns().await.unwrap();
    assert_eq!(patterns.len(), 1);
    assert_eq!(patterns[0].severity, Severity::High);
    assert_eq!(patterns[0].event_count, 10);
}

#[tokio::test]
async fn old_failures_fall_out_of_the_analysis_window() {
    let f = fixture();
    for _ in 0..6 {
        f.trail.log_decryption_failure("KEY_A_0001", "bad key").await;
    }
    f.clock.advance(Duration::from_secs(25 * 3600));
    assert!(f.trail.analyze_threat_patterns().await.unwrap().is_empty());
}

#[tokio::test]
async fn metrics_over_four_events() {
    let f = fixture();
    f.trail.log_load_success("ABCDEF0123456789").await;
    f.trail
        .log_security_event("tamper_detected", Severity::High, "hash mismatch")
        .await;
    f.trail
        .log_security_event("tamper_detected", Severity::Critical, "repeated mismatch")
        .await;
    f.trail.log_decryption_failure("ABCDEF0123456789", "bad").await;

    let metrics = f.trail.get_security_metrics().await.unwrap();
    assert_eq!(metrics.total_events, 4);
    assert_eq!(metrics.threat_count, 2);
    assert!((metrics.success_rate - 0.25).abs() < 1e-9);
    assert_eq!(metrics.time_range, "24h");
    assert_eq!(metrics.top_threats.len(), 1);
    assert_eq!(metrics.top_threats[0].threat_type, "tamper_detected");
    assert_eq!(metrics.top_threats[0].count, 2);
    assert_eq!(metrics.top_threats[0].severity, Severity::Critical);
}

#[tokio::test]
async fn security_alerts_select_failures_and_security_events() {
    let f = fixture();
    f.trail.log_load_success("ABCDEF0123456789").await;
    f.trail
        .log_security_event("port_scan", Severity::Low, "")
        .await;
    f.trail.log_store_failure("ABCDEF0123456789", "disk full").await;

    let alerts = f.trail.get_security_alerts().await.unwrap();
    let actions: Vec<_> = alerts.iter().map(|e| e.action.as_str()).collect();
    assert_eq!(actions, vec![actions::STORE_CREDENTIALS, "SECURITY_LOW"]);
}

#[tokio::test]
async fn critical_events_reach_the_critical_handler() {
    let f = fixture();
    let handler = Arc::new(RecordingHandler::default());
    f.trail.configure_alert_handlers(handler.clone());

    f.trail
        .log_security_event("vault_breach", Severity::Critical, "integrity lost")
        .await;
    f.trail.log_decryption_failure("ABCDEF0123456789", "bad").await;
    f.trail.log_rotation("resend", false, Some("rotation failed")).await;
    f.trail.log_load_success("ABCDEF0123456789").await;
    f.trail.flush().await;

    let critical = handler.critical.lock().unwrap().clone();
    assert_eq!(critical.len(), 1);
    assert_eq!(critical[0].event, "vault_breach");
    assert_eq!(critical[0].severity, Severity::Critical);
    assert_eq!(critical[0].details.as_deref(), Some("integrity lost"));

    let suspicious = handler.suspicious.lock().unwrap().clone();
    assert_eq!(suspicious.len(), 2);
    assert_eq!(suspicious[0].severity, Severity::High);
    assert_eq!(suspicious[1].action, actions::ROTATE_CREDENTIAL);
    assert_eq!(suspicious[1].severity, Severity::Medium);
}

#[tokio::test]
async fn failing_alert_handler_does_not_affect_writes() {
    let f = fixture();
    f.trail.configure_alert_handlers(Arc::new(FailingHandler));
    f.trail
        .log_security_event("vault_breach", Severity::Critical, "x")
        .await;
    f.trail.flush().await;
    f.trail.log_load_success("ABCDEF0123456789").await;
    assert_eq!(f.lines().len(), 2);
}

#[tokio::test]
async fn subscribers_see_every_record_until_dropped() {
    let f = fixture();
    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    let subscription = f.trail.subscribe_to_security_events(move |event| {
        assert!(!event.signature.is_empty());
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });
    assert_eq!(f.trail.subscriber_count(), 1);

    f.trail.log_encryption("ABCDEF0123456789").await;
    f.trail.log_decryption("ABCDEF0123456789").await;
    assert_eq!(seen.load(Ordering::SeqCst), 2);

    drop(subscription);
    assert_eq!(f.trail.subscriber_count(), 0);
    f.trail.log_load_success("ABCDEF0123456789").await;
    assert_eq!(seen.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failing_and_panicking_subscribers_are_contained() {
    let f = fixture();
    let reached = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&reached);

    let _failing = f
        .trail
        .subscribe_to_security_events(|_| Err(CredvaultError::Internal("nope".to_string())));
    let _panicking = f
        .trail
        .subscribe_to_security_events(|_| panic!("subscriber bug"));
    let _healthy = f.trail.subscribe_to_security_events(move |_| {
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(())
    });

    f.trail.log_encryption("ABCDEF0123456789").await;
    assert_eq!(reached.load(Ordering::SeqCst), 1);
    assert_eq!(f.lines().len(), 1);
}

#[tokio::test]
async fn oversized_log_rotates_and_keeps_bounded_backups() {
    let f = fixture_with(RetentionPolicy {
        max_log_bytes: 256,
        max_backups: 2,
        max_age: None,
    });

    for _ in 0..8 {
        f.trail.log_encryption("ABCDEF0123456789").await;
        f.trail.flush().await;
        f.clock.advance(Duration::from_millis(5));
    }

    let backups = f.backups();
    assert!(!backups.is_empty());
    assert!(backups.len() <= 2, "{backups:?}");
}

#[tokio::test]
async fn retention_prunes_expired_records_and_backups() {
    let f = fixture();
    f.trail.log_encryption("ABCDEF0123456789").await;
    f.trail.log_decryption("ABCDEF0123456789").await;

    f.trail
        .configure_retention(RetentionPolicy {
            max_log_bytes: 1,
            max_backups: 5,
            max_age: Some(Duration::from_secs(3600)),
        })
        .unwrap();
    let backup = f.trail.rotate_logs().await.unwrap();
    assert!(backup.is_some());

    // Raise the threshold again so the next record stays in the active log.
    f.trail
        .configure_retention(RetentionPolicy {
            max_log_bytes: 10 * 1024 * 1024,
            max_backups: 5,
            max_age: Some(Duration::from_secs(3600)),
        })
        .unwrap();
    f.clock.advance(Duration::from_secs(2 * 3600));
    f.trail.log_load_success("ABCDEF0123456789").await;
    f.trail.flush().await;

    let mut content = std::fs::read_to_string(f.log_path()).unwrap_or_default();
    let stale = std::fs::read_to_string(backup.as_ref().unwrap()).unwrap();
    content.insert_str(0, &stale);
    std::fs::write(f.log_path(), content).unwrap();

    let report = f.trail.apply_retention_policy().await.unwrap();
    assert_eq!(report.removed_records, 2);
    assert_eq!(report.retained_records, 1);
    assert_eq!(report.deleted_backups.len(), 1);
    assert!(f.backups().is_empty());

    let events = f.trail.get_recent_events(24).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].action, actions::LOAD_CREDENTIALS);
}

#[tokio::test]
async fn zero_retention_limits_are_rejected() {
    let f = fixture();
    let err = f
        .trail
        .configure_retention(RetentionPolicy {
            max_log_bytes: 0,
            ..RetentionPolicy::default()
        })
        .unwrap_err();
    assert_eq!(err.kind(), credvault_core::ErrorKind::Validation);
    assert_eq!(f.trail.retention_policy(), RetentionPolicy::default());
}

#[tokio::test]
async fn convenience_wrappers_shape_their_records() {
    let f = fixture();
    f.trail.log_credential_error("vault locked", "req-0001").await;
    f.trail
        .log_credential_access("req-0002", &["RESEND_API_KEY", "OTHER_KEY"])
        .await;
    f.trail.log_credential_store("req-0003", "staging").await;
    f.trail.log_credential_test("req-0004", false).await;
    f.trail
        .log_security_event_with_context(
            "login_anomaly",
            Severity::Medium,
            "new device",
            SecurityContext {
                session_id: Some("sess\n42".to_string()),
                ip_address: Some("203.0.113.9".to_string()),
                ..SecurityContext::default()
            },
        )
        .await;

    let events: Vec<credvault_audit::AuditEvent> = f
        .lines()
        .iter()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();

    assert_eq!(events[0].action, actions::CREDENTIAL_ERROR);
    assert_eq!(events[0].request_id, "req-0001");
    assert!(!events[0].success);

    assert_eq!(events[1].action, actions::ACCESS_CREDENTIALS);
    assert_eq!(events[1].key_id, "RESEND_API_KEY,OTHER_KEY");

    assert_eq!(events[2].action, actions::STORE_CREDENTIAL);
    assert_eq!(events[2].key_id, "staging");

    assert_eq!(events[3].action, actions::TEST_CREDENTIAL_ENCRYPTION);
    assert_eq!(events[3].key_id, "test");
    assert_eq!(
        events[3].error.as_deref(),
        Some("Encryption/decryption test failed")
    );

    assert_eq!(events[4].action, "SECURITY_MEDIUM");
    assert!(!events[4].success);
    let context = events[4].security_context.as_ref().unwrap();
    assert_eq!(context.session_id.as_deref(), Some("sess42"));

    let report = f.trail.verify_log().await.unwrap();
    assert_eq!(report.verified, 5);
}

#[tokio::test]
async fn access_key_list_is_truncated() {
    let f = fixture();
    let keys: Vec<String> = (0..30).map(|i| format!("KEY_{i:02}")).collect();
    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    f.trail.log_credential_access("req", &refs).await;
    let events = f.trail.get_recent_events(1).await.unwrap();
    assert_eq!(events[0].key_id.chars().count(), 100);
}

#[tokio::test]
async fn unwritable_log_is_swallowed_by_log_methods() {
    let dir = tempfile::tempdir().unwrap();
    // A regular file where the log directory should be.
    let blocker = dir.path().join("blocked");
    std::fs::write(&blocker, "x").unwrap();
    let options = AuditOptions::new(
        blocker.join("audit.log"),
        SecretString::from(SIGNING_KEY.to_string()),
    );
    let trail = AuditTrail::new(options, Arc::new(ManualClock::starting_now())).unwrap();

    trail.log_encryption("ABCDEF0123456789").await;
    let err = trail
        .try_record(credvault_audit::EventDraft::new(
            actions::ENCRYPT_CREDENTIAL,
            "ABCDEF0123456789",
            true,
        ))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), credvault_core::ErrorKind::Io);
}

#[tokio::test]
async fn unreadable_log_yields_empty_queries_but_fails_verification() {
    let dir = tempfile::tempdir().unwrap();
    // A directory where the log file should be: reads fail with something
    // other than NotFound.
    let log_path = dir.path().join("audit.log");
    std::fs::create_dir(&log_path).unwrap();
    let options = AuditOptions::new(&log_path, SecretString::from(SIGNING_KEY.to_string()));
    let trail = AuditTrail::new(options, Arc::new(ManualClock::starting_now())).unwrap();

    assert!(trail.get_recent_events(24).await.unwrap().is_empty());
    assert!(trail.get_security_alerts().await.unwrap().is_empty());
    assert!(trail.analyze_threat_patterns().await.unwrap().is_empty());
    let metrics = trail.get_security_metrics().await.unwrap();
    assert_eq!(metrics.total_events, 0);

    let err = trail.verify_log().await.unwrap_err();
    assert_eq!(err.kind(), credvault_core::ErrorKind::Io);
}

#[tokio::test]
async fn different_signing_key_sees_every_record_as_tampered() {
    let f = fixture();
    f.trail.log_encryption("ABCDEF0123456789").await;

    let options = AuditOptions::new(
        f.log_path(),
        SecretString::from("another-signing-key-abcdefghijkl".to_string()),
    );
    let other = AuditTrail::new(options, f.clock.clone()).unwrap();
    let report = other.verify_log().await.unwrap();
    assert_eq!(report.total, 1);
    assert_eq!(report.tampered_lines, vec![1]);
}
