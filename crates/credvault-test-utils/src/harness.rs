// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end integration testing.
//!
//! `TestHarness` assembles a vault and an audit trail in a fresh temp dir,
//! backed by [`FakeGpg`] and a [`ManualClock`]. Must be built inside a tokio
//! runtime because the audit trail starts its dispatch worker.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use credvault_audit::{AuditEvent, AuditOptions, AuditTrail, RetentionPolicy};
use credvault_core::{CredvaultError, Environment};
use credvault_vault::{CredentialCache, CredentialVault, NewCredentials};
use secrecy::SecretString;
use tempfile::TempDir;

use crate::clock::ManualClock;
use crate::fake_gpg::FakeGpg;

pub const TEST_KEY_ID: &str = "ABCDEF0123456789";
pub const TEST_SIGNING_KEY: &str = "test-signing-key-0123456789abcdef";
pub const TEST_API_KEY: &str = "re_Test_Api_Key_0123456789";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    key_id: String,
    signing_key: String,
    environment: String,
    retention: RetentionPolicy,
    alert_queue_capacity: usize,
    cache_ttl: Option<Duration>,
    gpg: Option<Arc<FakeGpg>>,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            key_id: TEST_KEY_ID.to_string(),
            signing_key: TEST_SIGNING_KEY.to_string(),
            environment: "test".to_string(),
            retention: RetentionPolicy::default(),
            alert_queue_capacity: 64,
            cache_ttl: None,
            gpg: None,
        }
    }

    pub fn with_key_id(mut self, key_id: impl Into<String>) -> Self {
        self.key_id = key_id.into();
        self
    }

    pub fn with_signing_key(mut self, key: impl Into<String>) -> Self {
        self.signing_key = key.into();
        self
    }

    pub fn with_environment(mut self, environment: impl Into<String>) -> Self {
        self.environment = environment.into();
        self
    }

    pub fn with_retention(mut self, policy: RetentionPolicy) -> Self {
        self.retention = policy;
        self
    }

    pub fn with_alert_queue_capacity(mut self, capacity: usize) -> Self {
        self.alert_queue_capacity = capacity;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = Some(ttl);
        self
    }

    /// Use a pre-configured fake instead of one that accepts every key.
    pub fn with_gpg(mut self, gpg: FakeGpg) -> Self {
        self.gpg = Some(Arc::new(gpg));
        self
    }

    pub fn build(self) -> Result<TestHarness, CredvaultError> {
        let dir = tempfile::tempdir().map_err(|e| CredvaultError::io("creating temp dir", e))?;
        let clock = Arc::new(ManualClock::starting_now());
        let gpg = self.gpg.unwrap_or_else(|| Arc::new(FakeGpg::new()));

        let log_path = dir.path().join("logs").join("credential-access.log");
        let mut options = AuditOptions::new(&log_path, SecretString::from(self.signing_key));
        options.environment = self.environment;
        options.retention = self.retention;
        options.alert_queue_capacity = self.alert_queue_capacity;
        let audit = AuditTrail::new(options, clock.clone())?;

        let credential_path = dir.path().join("credentials").join("encrypted.gpg");
        let credential_str = credential_path.to_str().ok_or_else(|| {
            CredvaultError::Internal("temp dir path is not valid UTF-8".to_string())
        })?;
        let cache = Arc::new(CredentialCache::new(clock.clone()));
        let mut vault = CredentialVault::new(
            &self.key_id,
            credential_str,
            gpg.clone(),
            Arc::clone(&cache),
            audit.clone(),
        )?;
        if let Some(ttl) = self.cache_ttl {
            vault = vault.with_cache_ttl(ttl);
        }

        Ok(TestHarness {
            vault,
            audit,
            gpg,
            clock,
            cache,
            credential_path,
            log_path,
            tempdir: dir,
        })
    }
}

/// A wired vault and audit trail over a temp dir.
pub struct TestHarness {
    pub vault: CredentialVault,
    pub audit: AuditTrail,
    pub gpg: Arc<FakeGpg>,
    pub clock: Arc<ManualClock>,
    pub cache: Arc<CredentialCache>,
    pub credential_path: PathBuf,
    pub log_path: PathBuf,
    tempdir: TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn dir(&self) -> &Path {
        self.tempdir.path()
    }

    /// A valid credential set using [`TEST_API_KEY`].
    pub fn sample_credentials(&self) -> NewCredentials {
        NewCredentials {
            api_key: SecretString::from(TEST_API_KEY.to_string()),
            environment: Environment::Production,
            rotation_schedule: "monthly".to_string(),
            last_rotated: Utc::now(),
        }
    }

    /// Every record currently in the active log, oldest first, unverified.
    pub fn raw_events(&self) -> Vec<AuditEvent> {
        std::fs::read_to_string(&self.log_path)
            .unwrap_or_default()
            .lines()
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect()
    }

    /// Raw lines of the active log.
    pub fn raw_lines(&self) -> Vec<String> {
        std::fs::read_to_string(&self.log_path)
            .unwrap_or_default()
            .lines()
            .map(str::to_string)
            .collect()
    }
}
