// SPDX-FileCopyrightText: 2026 Credvault Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Collects every problem instead of stopping at the first one.

use credvault_security::{validate_credential_path, validate_key_id};

use crate::diagnostic::ConfigError;
use crate::model::CredvaultConfig;

/// Shortest accepted audit signing key, in bytes.
pub const MIN_SIGNING_KEY_BYTES: usize = 16;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &CredvaultConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();

    if let Some(Err(e)) = config.vault.key_id.as_deref().map(validate_key_id) {
        errors.push(ConfigError::Validation {
            message: format!("vault.key_id: {e}"),
        });
    }

    if let Err(e) = validate_credential_path(&config.vault.credential_path) {
        errors.push(ConfigError::Validation {
            message: format!("vault.credential_path: {e}"),
        });
    }

    if config.vault.gpg_binary.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "vault.gpg_binary must not be empty".to_string(),
        });
    }

    if config.vault.process_timeout_secs == Some(0) {
        errors.push(ConfigError::Validation {
            message: "vault.process_timeout_secs must be at least 1 when set".to_string(),
        });
    }

    match config.audit.signing_key.as_deref() {
        None | Some("") => errors.push(ConfigError::MissingKey {
            key: "audit.signing_key".to_string(),
            env_hint: "the AUDIT_SIGNING_KEY environment variable".to_string(),
        }),
        Some(key) if key.len() < MIN_SIGNING_KEY_BYTES => {
            errors.push(ConfigError::Validation {
                message: format!(
                    "audit.signing_key must be at least {MIN_SIGNING_KEY_BYTES} bytes, got {}",
                    key.len()
                ),
            });
        }
        Some(_) => {}
    }

    if config.audit.log_dir.trim().is_empty() {
        errors.push(ConfigError::Validation {
            message: "audit.log_dir must not be empty".to_string(),
        });
    }

    let log_file = config.audit.log_file.trim();
    if log_file.is_empty() || log_file.contains('/') || log_file.contains('\\') {
        errors.push(ConfigError::Validation {
            message: "audit.log_file must be a bare file name".to_string(),
        });
    }

    if config.audit.max_log_bytes == 0 {
        errors.push(ConfigError::Validation {
            message: "audit.max_log_bytes must be greater than zero".to_string(),
        });
    }

    if config.audit.max_backups == 0 {
        errors.push(ConfigError::Validation {
            message: "audit.max_backups must be at least 1".to_string(),
        });
    }

    if config.audit.alert_queue_capacity == 0 {
        errors.push(ConfigError::Validation {
            message: "audit.alert_queue_capacity must be at least 1".to_string(),
        });
    }

    if !LOG_LEVELS.contains(&config.logging.level.as_str()) {
        errors.push(ConfigError::Validation {
            message: format!(
                "logging.level `{}` is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
