// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential vault lifecycle: encrypt, decrypt, load, store, and health
//! checks.
//!
//! Every operation is an independent transaction against the credential
//! file. The only state shared between calls is the [`CredentialCache`],
//! which a successful load populates and a store clears. Each outcome is
//! written to the audit trail; audit failures never fail the operation.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use credvault_audit::recording;
use credvault_audit::AuditTrail;
use credvault_config::CredvaultConfig;
use credvault_core::{CredvaultError, ProcessOutput, ProcessRunner, SystemClock};
use credvault_security::{
    redact, sanitize_log_text, validate_api_key, validate_credential_path, validate_key_id,
    validate_rotation_schedule,
};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use crate::cache::CredentialCache;
use crate::process::{decrypt_args, encrypt_args, list_keys_args, GpgRunner};
use crate::record::{CredentialRecord, LoadedCredentials, NewCredentials};

/// Cache lifetime used when neither the caller nor the config sets one.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// Options for [`CredentialVault::load_credentials`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Serve from and populate the cache. When false the cache is neither
    /// read nor written.
    pub use_cache: bool,
    /// Cache lifetime for this load; `None` uses the vault's configured TTL.
    pub cache_ttl: Option<Duration>,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            cache_ttl: None,
        }
    }
}

impl LoadOptions {
    pub fn no_cache() -> Self {
        Self {
            use_cache: false,
            cache_ttl: None,
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            use_cache: true,
            cache_ttl: Some(ttl),
        }
    }
}

/// Operator-facing summary from [`CredentialVault::credential_status`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialStatus {
    pub key_id: String,
    pub key_valid: bool,
    pub credential_file_present: bool,
    pub cached: bool,
    pub errors: Vec<String>,
}

/// Encrypts and decrypts the credential record through the OpenPGP utility.
pub struct CredentialVault {
    key_id: String,
    credential_path: PathBuf,
    runner: Arc<dyn ProcessRunner>,
    cache: Arc<CredentialCache>,
    audit: AuditTrail,
    cache_ttl: Duration,
}

impl std::fmt::Debug for CredentialVault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialVault")
            .field("key_id", &self.key_id)
            .field("credential_path", &self.credential_path)
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

impl CredentialVault {
    /// Validate the key id and credential path, then build the vault.
    ///
    /// Performs no I/O. The key id check is what keeps caller input out of
    /// the subprocess argument vector, so nothing is spawned for a vault that
    /// fails here.
    pub fn new(
        key_id: &str,
        credential_path: &str,
        runner: Arc<dyn ProcessRunner>,
        cache: Arc<CredentialCache>,
        audit: AuditTrail,
    ) -> Result<Self, CredvaultError> {
        validate_key_id(key_id)?;
        validate_credential_path(credential_path)?;
        Ok(Self {
            key_id: key_id.to_string(),
            credential_path: PathBuf::from(credential_path),
            runner,
            cache,
            audit,
            cache_ttl: DEFAULT_CACHE_TTL,
        })
    }

    /// Build a vault backed by the real `gpg` binary and the system clock.
    pub fn from_config(config: &CredvaultConfig, audit: AuditTrail) -> Result<Self, CredvaultError> {
        let key_id = config.vault.key_id.as_deref().ok_or_else(|| {
            CredvaultError::Config("GPG key id is required (set GPG_KEY_ID)".to_string())
        })?;
        let runner = GpgRunner::new(&config.vault.gpg_binary)
            .with_timeout(config.vault.process_timeout_secs.map(Duration::from_secs));
        let cache = Arc::new(CredentialCache::new(Arc::new(SystemClock)));
        Ok(Self::new(
            key_id,
            &config.vault.credential_path,
            Arc::new(runner),
            cache,
            audit,
        )?
        .with_cache_ttl(Duration::from_millis(config.vault.cache_ttl_ms)))
    }

    /// Default cache lifetime for loads that do not set one.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn credential_path(&self) -> &Path {
        &self.credential_path
    }

    pub fn audit(&self) -> &AuditTrail {
        &self.audit
    }

    /// Encrypt `plaintext` to the configured recipient, returning armored
    /// ciphertext.
    pub async fn encrypt_credential(&self, plaintext: &str) -> Result<String, CredvaultError> {
        let result = self
            .invoke("encrypt", &encrypt_args(&self.key_id), Some(plaintext.as_bytes()))
            .await
            .and_then(|output| {
                String::from_utf8(output.stdout).map_err(|_| {
                    CredvaultError::Serialization("gpg produced non UTF-8 armor".to_string())
                })
            });

        match result {
            Ok(ciphertext) => {
                self.audit.log_encryption(&self.key_id).await;
                Ok(ciphertext)
            }
            Err(e) => {
                self.audit
                    .log_encryption_failure(&self.key_id, &self.audit_text(&e, &[plaintext]))
                    .await;
                Err(e)
            }
        }
    }

    /// Decrypt armored ciphertext. Surrounding whitespace is trimmed from
    /// the plaintext.
    pub async fn decrypt_credential(&self, ciphertext: &str) -> Result<SecretString, CredvaultError> {
        let result = self
            .invoke("decrypt", &decrypt_args(), Some(ciphertext.as_bytes()))
            .await
            .and_then(|output| {
                let stdout = Zeroizing::new(output.stdout);
                let text = std::str::from_utf8(&stdout).map_err(|_| {
                    CredvaultError::Integrity("decrypted payload is not valid UTF-8".to_string())
                })?;
                Ok(SecretString::from(text.trim().to_string()))
            });

        match result {
            Ok(plaintext) => {
                self.audit.log_decryption(&self.key_id).await;
                Ok(plaintext)
            }
            Err(e) => {
                self.audit
                    .log_decryption_failure(&self.key_id, &self.audit_text(&e, &[]))
                    .await;
                Err(e)
            }
        }
    }

    /// Return the decrypted credential set, from the cache when allowed.
    ///
    /// A fresh load reads the file, decrypts it, and checks the integrity
    /// hash before anything is returned or cached; a mismatching record is
    /// discarded.
    pub async fn load_credentials(
        &self,
        options: LoadOptions,
    ) -> Result<Arc<LoadedCredentials>, CredvaultError> {
        if options.use_cache {
            if let Some(hit) = self.cache.get() {
                recording::record_cache_hit();
                debug!(key_id = %self.key_id, "credentials served from cache");
                return Ok(hit);
            }
            recording::record_cache_miss();
        }

        let generation = self.cache.generation();
        match self.load_verified_record().await {
            Ok(record) => {
                let loaded = Arc::new(record.project());
                if options.use_cache {
                    let ttl = options.cache_ttl.unwrap_or(self.cache_ttl);
                    if !self.cache.put_if_generation(generation, Arc::clone(&loaded), ttl) {
                        debug!(key_id = %self.key_id, "credentials superseded during load; not cached");
                    }
                }
                self.audit.log_load_success(&self.key_id).await;
                info!(key_id = %self.key_id, "credentials loaded");
                Ok(loaded)
            }
            Err(e) => {
                warn!(key_id = %self.key_id, error = %e, "credential load failed");
                self.audit.log_load_failure(&self.audit_text(&e, &[])).await;
                Err(e)
            }
        }
    }

    async fn load_verified_record(&self) -> Result<CredentialRecord, CredvaultError> {
        let ciphertext = tokio::fs::read_to_string(&self.credential_path)
            .await
            .map_err(|e| CredvaultError::io("reading credential file", e))?;

        let plaintext = self.decrypt_credential(&ciphertext).await?;
        let record: CredentialRecord = serde_json::from_str(plaintext.expose_secret())
            .map_err(|e| {
                CredvaultError::Integrity(format!("stored credential record is malformed: {e}"))
            })?;
        record.verify_integrity()?;
        Ok(record)
    }

    /// Validate, seal, encrypt, and persist a credential set, then clear the
    /// cache so the next load re-verifies from disk.
    pub async fn store_credentials(&self, new: NewCredentials) -> Result<(), CredvaultError> {
        match self.store_inner(&new).await {
            Ok(()) => {
                self.cache.clear();
                self.audit.log_store_success(&self.key_id).await;
                info!(
                    key_id = %self.key_id,
                    environment = %new.environment,
                    "credentials stored"
                );
                Ok(())
            }
            Err(e) => {
                let text = self.audit_text(&e, &[new.api_key.expose_secret()]);
                self.audit.log_store_failure(&self.key_id, &text).await;
                Err(e)
            }
        }
    }

    async fn store_inner(&self, new: &NewCredentials) -> Result<(), CredvaultError> {
        validate_api_key(new.api_key.expose_secret())?;
        validate_rotation_schedule(&new.rotation_schedule)?;
        validate_timestamp(&new.last_rotated)?;

        let record = CredentialRecord::seal(new);
        let payload = Zeroizing::new(serde_json::to_string(&record)?);
        let ciphertext = self.encrypt_credential(&payload).await?;
        write_private_file(&self.credential_path, ciphertext.as_bytes()).await
    }

    /// Whether the keyring knows the configured key. Never fails.
    pub async fn validate_gpg_key(&self) -> bool {
        match self.invoke("list_keys", &list_keys_args(&self.key_id), None).await {
            Ok(_) => true,
            Err(e) => {
                debug!(key_id = %self.key_id, error = %e, "gpg key lookup failed");
                false
            }
        }
    }

    /// Round-trip a random string through encrypt and decrypt. Never fails.
    pub async fn test_encryption_decryption(&self) -> bool {
        let probe = generate_secure_random(16);
        let ciphertext = match self.encrypt_credential(&probe).await {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "encryption self-test failed");
                return false;
            }
        };
        match self.decrypt_credential(&ciphertext).await {
            Ok(plaintext) => plaintext.expose_secret() == probe,
            Err(e) => {
                warn!(error = %e, "decryption self-test failed");
                false
            }
        }
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
        debug!("credential cache cleared");
    }

    /// Key presence, file presence, and cache state, with any problems
    /// collected as text.
    pub async fn credential_status(&self) -> CredentialStatus {
        let mut errors = Vec::new();

        let key_valid = self.validate_gpg_key().await;
        if !key_valid {
            errors.push(format!("GPG key {} not found in keyring", self.key_id));
        }

        let credential_file_present = match tokio::fs::try_exists(&self.credential_path).await {
            Ok(true) => true,
            Ok(false) => {
                errors.push(format!(
                    "credential file {} does not exist",
                    self.credential_path.display()
                ));
                false
            }
            Err(e) => {
                errors.push(format!("cannot access credential file: {e}"));
                false
            }
        };

        CredentialStatus {
            key_id: self.key_id.clone(),
            key_valid,
            credential_file_present,
            cached: self.cache.is_populated(),
            errors,
        }
    }

    /// Run one gpg invocation, turning a non-zero exit into a process error
    /// with sanitized stderr.
    async fn invoke(
        &self,
        operation: &'static str,
        args: &[String],
        stdin: Option<&[u8]>,
    ) -> Result<ProcessOutput, CredvaultError> {
        let output = match self.runner.run(args, stdin).await {
            Ok(output) => output,
            Err(e) => {
                recording::record_gpg_invocation(operation, "error");
                return Err(e);
            }
        };
        if output.success() {
            recording::record_gpg_invocation(operation, "success");
            return Ok(output);
        }

        recording::record_gpg_invocation(operation, "failure");
        let stderr = sanitize_log_text(&redact(&output.stderr_lossy(), &[]));
        let code = output
            .status
            .map_or_else(|| "signal".to_string(), |c| c.to_string());
        Err(CredvaultError::Process {
            message: format!("gpg {operation} exited with status {code}: {stderr}"),
            stderr,
        })
    }

    /// Error text as it may appear in an audit record.
    fn audit_text(&self, error: &CredvaultError, secrets: &[&str]) -> String {
        sanitize_log_text(&redact(&error.to_string(), secrets))
    }
}

fn validate_timestamp(ts: &DateTime<Utc>) -> Result<(), CredvaultError> {
    if ts.timestamp_millis() < 0 {
        return Err(CredvaultError::Validation(
            "Invalid lastRotated timestamp: before 1970-01-01".to_string(),
        ));
    }
    Ok(())
}

/// Write `contents` next to `path` and rename it into place, owner-only.
async fn write_private_file(path: &Path, contents: &[u8]) -> Result<(), CredvaultError> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| CredvaultError::io("creating credential directory", e))?;
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    tokio::fs::write(&tmp, contents)
        .await
        .map_err(|e| CredvaultError::io("writing credential file", e))?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        tokio::fs::set_permissions(&tmp, std::fs::Permissions::from_mode(0o600))
            .await
            .map_err(|e| CredvaultError::io("restricting credential file permissions", e))?;
    }
    tokio::fs::rename(&tmp, path)
        .await
        .map_err(|e| CredvaultError::io("replacing credential file", e))
}

/// `len` random bytes as lowercase hex.
pub fn generate_secure_random(len: usize) -> String {
    let mut bytes = Zeroizing::new(vec![0u8; len]);
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(&*bytes)
}

/// Mask a secret value for display (first 4 and last 4 characters).
pub fn mask_secret(value: &str) -> String {
    let chars: Vec<char> = value.chars().collect();
    if chars.len() < 10 {
        return "****".to_string();
    }
    let prefix: String = chars[..4].iter().collect();
    let suffix: String = chars[chars.len() - 4..].iter().collect();
    format!("{prefix}...{suffix}")
}
