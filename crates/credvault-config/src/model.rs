// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level credvault configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CredvaultConfig {
    /// Credential vault and OpenPGP invocation settings.
    #[serde(default)]
    pub vault: VaultConfig,

    /// Audit trail settings.
    #[serde(default)]
    pub audit: AuditConfig,

    /// Log output settings for the binary.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Credential vault configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// OpenPGP key id used as the encryption recipient. Required for any
    /// vault operation; usually supplied through `GPG_KEY_ID`.
    #[serde(default)]
    pub key_id: Option<String>,

    /// Location of the armored credential file.
    #[serde(default = "default_credential_path")]
    pub credential_path: String,

    /// OpenPGP executable, resolved through `PATH` when not absolute.
    #[serde(default = "default_gpg_binary")]
    pub gpg_binary: String,

    /// How long a decrypted credential set stays cached, in milliseconds.
    #[serde(default = "default_cache_ttl_ms")]
    pub cache_ttl_ms: u64,

    /// Optional deadline for each subprocess. Unset means no deadline.
    #[serde(default)]
    pub process_timeout_secs: Option<u64>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            key_id: None,
            credential_path: default_credential_path(),
            gpg_binary: default_gpg_binary(),
            cache_ttl_ms: default_cache_ttl_ms(),
            process_timeout_secs: None,
        }
    }
}

fn default_credential_path() -> String {
    "./credentials/encrypted.gpg".to_string()
}

fn default_gpg_binary() -> String {
    "gpg".to_string()
}

fn default_cache_ttl_ms() -> u64 {
    5 * 60 * 1000
}

/// Audit trail configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct AuditConfig {
    /// Directory holding the active log and its rotated backups.
    #[serde(default = "default_log_dir")]
    pub log_dir: String,

    /// File name of the active log inside `log_dir`.
    #[serde(default = "default_log_file")]
    pub log_file: String,

    /// HMAC key for audit record signatures. There is no default: an audit
    /// trail cannot be constructed without one.
    #[serde(default)]
    pub signing_key: Option<String>,

    /// Environment label stamped on every record. Never used for branching.
    #[serde(default = "default_environment_label")]
    pub environment: String,

    /// Active log size that triggers rotation, in bytes.
    #[serde(default = "default_max_log_bytes")]
    pub max_log_bytes: u64,

    /// Number of rotated backups kept.
    #[serde(default = "default_max_backups")]
    pub max_backups: usize,

    /// Records older than this many days are pruned by the retention pass.
    #[serde(default)]
    pub max_age_days: Option<u64>,

    /// Capacity of the background alert queue.
    #[serde(default = "default_alert_queue_capacity")]
    pub alert_queue_capacity: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            log_dir: default_log_dir(),
            log_file: default_log_file(),
            signing_key: None,
            environment: default_environment_label(),
            max_log_bytes: default_max_log_bytes(),
            max_backups: default_max_backups(),
            max_age_days: None,
            alert_queue_capacity: default_alert_queue_capacity(),
        }
    }
}

impl AuditConfig {
    /// Full path of the active audit log.
    pub fn log_path(&self) -> PathBuf {
        PathBuf::from(&self.log_dir).join(&self.log_file)
    }
}

fn default_log_dir() -> String {
    "./logs".to_string()
}

fn default_log_file() -> String {
    "credential-access.log".to_string()
}

fn default_environment_label() -> String {
    "unknown".to_string()
}

fn default_max_log_bytes() -> u64 {
    10 * 1024 * 1024
}

fn default_max_backups() -> usize {
    5
}

fn default_alert_queue_capacity() -> usize {
    256
}

/// Log output configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
